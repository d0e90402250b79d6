use std::collections::BTreeMap;

use convert_case::{Case, Casing};
use itertools::Itertools;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_quote, File, FnArg, ReturnType, Type};

use crate::class::runtime_path;
use crate::parse::{ItemClass, Virtual};

/// Generates the mocking metadata for a class: the layout-contract trait
/// impl and one method-descriptor constant per virtual, named after the
/// method in upper snake case (`Animal::LEGS` for `fn legs`).
///
/// Each descriptor carries its slot index and a trampoline monomorphized for
/// exactly that slot and signature, so stubbing is a plain slot write with
/// no per-call type recovery.
pub fn gen_mockable(class: &ItemClass, virtuals: &BTreeMap<usize, Virtual>) -> File {
    let rt = runtime_path();
    let ident = &class.ident;
    let name = ident.to_string();

    let slot_count = virtuals
        .last_key_value()
        .map(|(high_idx, _)| *high_idx + 1)
        .unwrap_or_default();

    let method_names: Vec<TokenStream> = (0..slot_count)
        .map(|idx| match virtuals.get(&idx) {
            Some(virt) => {
                let name = virt.name();
                quote!(Some(#name))
            }
            None => quote!(None),
        })
        .collect_vec();

    let dtor: TokenStream = match virtuals.iter().find(|(_, virt)| virt.is_destructor()) {
        Some(_) => quote!(Some(#ident::DESTRUCTOR)),
        None => quote!(None),
    };

    let descriptors: Vec<TokenStream> = virtuals
        .iter()
        .map(|(idx, virt)| gen_descriptor(class, *idx, virt))
        .collect_vec();

    syn::parse(
        quote! {
            unsafe impl #rt::MockableClass for #ident {
                const NAME: &'static str = #name;
                const VIRTUAL_SLOTS: usize = #slot_count;
                const DTOR: Option<#rt::VirtualMethod<Self, (), ()>> = #dtor;
                const METHOD_NAMES: &'static [Option<&'static str>] = &[#(#method_names),*];
            }

            impl #ident {
                #(#descriptors)*
            }
        }
        .into(),
    )
    .expect("failed to generate mockable metadata")
}

fn gen_descriptor(class: &ItemClass, slot: usize, virt: &Virtual) -> TokenStream {
    let rt = runtime_path();
    let ident = &class.ident;
    let vis = &class.vis;
    let method_name = virt.name();
    let const_ident = format_ident!("{}", method_name.to_case(Case::UpperSnake));

    // the destructor is described as a nullary virtual returning unit
    let (arg_tys, ret): (Vec<Type>, Type) = match virt.sig() {
        Some(sig) => {
            let args = sig
                .inputs
                .iter()
                .skip(1)
                .map(|arg| match arg {
                    FnArg::Typed(ty) => (*ty.ty).clone(),
                    FnArg::Receiver(_) => panic!("virtuals are standardized"),
                })
                .collect_vec();
            let ret = match &sig.output {
                ReturnType::Default => parse_quote!(()),
                ReturnType::Type(_, ty) => (**ty).clone(),
            };
            (args, ret)
        }
        None => (Vec::new(), parse_quote!(())),
    };

    let trampoline = format_ident!("call{}", arg_tys.len());
    quote! {
        #vis const #const_ident: #rt::VirtualMethod<#ident, (#(#arg_tys,)*), #ret> =
            #rt::VirtualMethod::new(
                #slot,
                #method_name,
                #rt::proxy::#trampoline::<#ident, #(#arg_tys,)* #ret, #slot> as #rt::RawSlot,
            );
    }
}
