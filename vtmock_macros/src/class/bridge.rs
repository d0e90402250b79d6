use proc_macro2::Ident;
use quote::{format_ident, quote};
use syn::{parse_quote, FnArg, ItemFn, ItemImpl, Pat};

use crate::class::vtable::make_vtable_ident;
use crate::parse::{ItemClass, VirtualKind};

/// Generates the typed dispatch bridge: one inherent method per virtual that
/// reads the instance's `vfptr`, views it as the class's VTable struct, and
/// calls through the slot. Every call on a mocked or spied instance funnels
/// through here.
pub fn gen_bridge(class: &ItemClass) -> ItemImpl {
    let ident = &class.ident;
    let vtable_ident = make_vtable_ident(&class.ident);

    let mut fns: Vec<ItemFn> = Vec::new();
    for virt in class.body.virtuals.iter() {
        let attrs = &virt.attrs;
        let vis = &virt.vis;

        let sig = match &virt.kind {
            VirtualKind::Destructor(_) => {
                // the destructor slot consumes the object; running it twice
                // or touching the instance afterwards is on the caller
                fns.push(parse_quote! {
                    #(#attrs)*
                    #vis unsafe fn destruct(&mut self) {
                        let vtbl = &*(self.vfptr as *const #vtable_ident);
                        (vtbl.destruct)(self)
                    }
                });
                continue;
            }
            VirtualKind::Method(sig) => sig,
        };

        let arg_names: Vec<Ident> = sig
            .inputs
            .iter()
            .map(|arg| match arg {
                FnArg::Receiver(_) => format_ident!("self"),
                FnArg::Typed(ty) => {
                    if let Pat::Ident(ident) = &*ty.pat {
                        ident.ident.clone()
                    } else {
                        panic!("virtual args must have identifiers")
                    }
                }
            })
            .collect();

        let unsafety = &sig.unsafety;
        let fn_ident = &sig.ident;
        let args = &sig.inputs;
        let output = &sig.output;

        fns.push(parse_quote! {
            #(#attrs)*
            #vis #unsafety fn #fn_ident (#args) #output {
                let vtbl = unsafe { &*(self.vfptr as *const #vtable_ident) };
                (vtbl.#fn_ident)(#(#arg_names),*)
            }
        });
    }

    syn::parse(
        quote! {
            impl #ident {
                #(#fns)*
            }
        }
        .into(),
    )
    .expect("failed to generate bridges")
}
