use std::collections::BTreeMap;

use proc_macro2::Ident;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{parse_quote, Expr, Field, FieldMutability, FieldValue, File, ItemStruct, Visibility};

use crate::class::concrete::Concrete;
use crate::class::trt::make_virtuals;
use crate::parse::{ItemClass, Virtual};

/// Generates the VTable struct for the class, plus the `VTBL` constant for a
/// concrete class.
pub fn gen_vtable(
    class: &ItemClass,
    virtuals: &BTreeMap<usize, Virtual>,
    concrete: Option<&Concrete>,
) -> File {
    let vtable = gen_vtable_struct(class, virtuals);
    let stc = concrete.map(|concrete| gen_vtable_const(class, virtuals, concrete));

    syn::parse(
        quote! {
            #vtable
            #stc
        }
        .into(),
    )
    .expect("failed to generate vtable")
}

/// Make the VTable struct identifier.
pub fn make_vtable_ident(ident: &Ident) -> Ident {
    format_ident!("{}VTable", ident)
}

/// Generates the default VTable constant for a concrete class. Method slots
/// point at the class's `<Name>Virtuals` impl, the destructor slot at a
/// generated no-op (dropping is the caller's business on the Rust side), and
/// gaps at panicking (or, under `no_unimpl`, empty) functions.
fn gen_vtable_const(
    class: &ItemClass,
    virtuals: &BTreeMap<usize, Virtual>,
    concrete: &Concrete,
) -> File {
    let class_ident = &class.ident;
    let vis = &class.vis;
    let virtuals_ident = make_virtuals(class_ident);
    let mut body = Punctuated::<FieldValue, Comma>::new();

    if let Some((high_idx, _)) = virtuals.last_key_value() {
        for idx in 0..=*high_idx {
            let (ident, expr): (Ident, Expr) = match virtuals.get(&idx) {
                Some(virt) if virt.is_destructor() => {
                    let expr = parse_quote!({
                        extern "C-unwind" fn destruct(_this: &mut #class_ident) {}
                        destruct
                    });
                    (format_ident!("destruct"), expr)
                }
                Some(virt) => {
                    let ident = virt.sig().expect("non-destructor virtual").ident.clone();
                    let expr = parse_quote!(<#class_ident as #virtuals_ident>::#ident);
                    (ident, expr)
                }
                None => {
                    let expr: Expr = if concrete.no_unimpl {
                        parse_quote!(|| ())
                    } else {
                        parse_quote!(|| unimplemented!())
                    };
                    (format_ident!("unimpl_{idx}"), expr)
                }
            };

            body.push(parse_quote! { #ident: #expr });
        }
    }

    let vtable_ident = make_vtable_ident(class_ident);
    syn::parse(
        quote! {
            impl #class_ident {
                #vis const VTBL: #vtable_ident = #vtable_ident {
                    #body
                };
            }
        }
        .into(),
    )
    .expect("failed to generate vtable constant")
}

/// Generates the VTable struct for the class.
fn gen_vtable_struct(class: &ItemClass, virtuals: &BTreeMap<usize, Virtual>) -> ItemStruct {
    let vis = &class.vis;
    let class_ident = &class.ident;
    let vtable_ident = make_vtable_ident(class_ident);
    let mut body = Punctuated::<Field, Comma>::new();

    if let Some((high_idx, _)) = virtuals.last_key_value() {
        for idx in 0..=*high_idx {
            let (virt_ident, virt_ty, attrs) = match virtuals.get(&idx) {
                Some(virt) if virt.is_destructor() => (
                    format_ident!("destruct"),
                    parse_quote!(extern "C-unwind" fn(this: &mut #class_ident)),
                    virt.attrs.clone(),
                ),
                Some(virt) => {
                    let sig = virt.sig().expect("non-destructor virtual");
                    let ident = sig.ident.clone();

                    let unsafety = &sig.unsafety;
                    let abi = sig.abi.clone().expect("virtuals are standardized");
                    let args = sig.inputs.clone();
                    let output = &sig.output;

                    // we need to generate the type from the signature
                    let ty = parse_quote!(#unsafety #abi fn(#args) #output);

                    (ident, ty, virt.attrs.clone())
                }
                None => {
                    let ident = format_ident!("unimpl_{idx}");
                    let ty = parse_quote!(fn());
                    (ident, ty, vec![])
                }
            };

            body.push(Field {
                attrs,
                vis: Visibility::Inherited,
                mutability: FieldMutability::None,
                ident: Some(virt_ident),
                colon_token: Some(Default::default()),
                ty: virt_ty,
            });
        }
    }

    syn::parse(
        quote! {
            #[repr(C)]
            #vis struct #vtable_ident {
                #body
            }
        }
        .into(),
    )
    .expect("failed to generate vtable struct")
}

/// Organizes the virtuals in slot order. Unindexed virtuals follow their
/// predecessor; an explicit `virtual(idx)` restarts the numbering there.
pub fn sort_virtuals(class: &ItemClass) -> BTreeMap<usize, Virtual> {
    let mut virtuals = BTreeMap::new();
    let mut last_idx = None;
    for virt in class.body.virtuals.iter() {
        let idx = match (&virt.index.idx, &last_idx) {
            (Some(idx), _) => idx.base10_parse().expect("virtual index must be base-10"),
            (None, Some(last_idx)) => *last_idx + 1,
            (None, None) => 0,
        };

        // try to insert the virtual
        if let Some(last_virt) = virtuals.insert(idx, virt.clone()) {
            panic!("virtual {} already occupies slot {idx}", last_virt.name());
        }

        last_idx = Some(idx);
    }

    virtuals
}
