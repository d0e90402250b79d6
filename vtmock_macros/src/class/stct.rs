use itertools::Itertools;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{parse_quote, Attribute, Field, FieldValue, File, Meta, Token};

use crate::class::vtable::make_vtable_ident;
use crate::parse::ItemClass;

/// Generates the base structure: `#[repr(C)]`, the `vfptr` word first, then
/// the declared data fields.
pub fn gen_struct(class: &ItemClass, concrete: bool) -> File {
    let mut attrs = class.attrs.clone();

    let default_impl = intercept_default(class, &mut attrs, concrete);

    let vis = &class.vis;
    let ident = &class.ident;

    // the vtable pointer is held as a plain word: mocking writes foreign
    // table addresses through it, so a typed reference would be a lie
    let mut fields: Vec<Field> = vec![parse_quote!(pub vfptr: usize)];
    fields.extend(class.body.fields.iter().cloned());

    // if there's no `#[repr(C)]`, add it
    if !has_repr_c(&attrs) {
        attrs.push(parse_quote!(#[repr(C)]));
    }

    syn::parse(
        quote! {
            #(#attrs)*
            #vis struct #ident {
                #(#fields),*
            }

            #default_impl
        }
        .into(),
    )
    .expect("failed to generate base struct")
}

/// Checks an attribute list for `repr(C)`
fn has_repr_c(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        if !attr.path().is_ident("repr") {
            return false;
        }

        let nested = attr
            .parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
            .expect("failed to parse repr");

        nested.iter().any(|meta| meta.path().is_ident("C"))
    })
}

/// Intercepts `#[derive(Default)]` and implements it ourselves, wiring the
/// `vfptr` to the class's `VTBL` constant.
fn intercept_default(class: &ItemClass, attrs: &mut [Attribute], concrete: bool) -> Option<File> {
    // see if there's a `derive` attribute
    let derive_attr = attrs
        .iter_mut()
        .find(|attr| attr.path().is_ident("derive"))?;

    // find `Default`
    let meta = derive_attr
        .parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
        .expect("failed to parse derive");
    let default_idx = meta
        .iter()
        .position(|meta| meta.path().is_ident("Default"))?;

    if !concrete {
        panic!("deriving `Default` requires `#[concrete]`; a default instance needs a vtable");
    }

    // remove `Default` from the derive list; its impl is generated below
    let new_meta: Punctuated<Meta, Token![,]> = meta
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| *idx != default_idx)
        .map(|(_, meta)| meta)
        .collect();
    derive_attr.meta = parse_quote!(derive(#new_meta));

    let ident = &class.ident;
    let vtable_ident = make_vtable_ident(ident);
    let fields: Vec<FieldValue> = class
        .body
        .fields
        .iter()
        .filter_map(|field| field.ident.as_ref())
        .map(|field_name| parse_quote!(#field_name: Default::default()))
        .collect_vec();

    let output = quote! {
        impl Default for #ident {
            fn default() -> Self {
                Self {
                    vfptr: &#ident::VTBL as *const #vtable_ident as usize,
                    #(#fields),*
                }
            }
        }
    };
    Some(syn::parse(output.into()).expect("failed to generate default implementation"))
}
