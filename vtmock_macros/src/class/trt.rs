use proc_macro2::Ident;
use quote::{format_ident, quote};
use syn::{ItemTrait, TraitItemFn};

use crate::parse::ItemClass;

/// Generates the virtuals trait a concrete class implements. The destructor
/// is not part of it; the generated `VTBL` fills that slot with a no-op.
pub fn gen_trait(class: &ItemClass) -> ItemTrait {
    let vis = &class.vis;
    let virtuals_ident = make_virtuals(&class.ident);

    let trait_functions = collect_functions(class);

    syn::parse(
        quote! {
            #vis trait #virtuals_ident {
                #(#trait_functions)*
            }
        }
        .into(),
    )
    .expect("failed to generate trait")
}

/// Makes a class identifier refer to its virtuals trait.
pub fn make_virtuals(ident: &Ident) -> Ident {
    format_ident!("{}Virtuals", ident)
}

/// Collects all virtual methods as trait item functions.
fn collect_functions(class: &ItemClass) -> Vec<TraitItemFn> {
    class
        .body
        .virtuals
        .iter()
        .filter_map(|virt| virt.sig())
        .map(|sig| TraitItemFn {
            attrs: vec![],
            sig: sig.clone(),
            default: None,
            semi_token: None,
        })
        .collect()
}
