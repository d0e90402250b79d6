use darling::FromMeta;
use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use syn::{parse_macro_input, parse_quote, FnArg, File, Path, PatType};

use crate::class::concrete::Concrete;
use crate::class::extractor::AttributeExtractor;
use crate::parse::{ItemClass, MockDef};

mod bridge;
mod concrete;
mod extractor;
mod imp;
mod mockable;
mod stct;
mod trt;
mod vtable;

/// Virtual methods are forwarded through argument tuples of at most this
/// arity; the runtime's trampoline set stops there too.
const MAX_ARGS: usize = 4;

const RUNTIME_CRATE: Option<&str> = option_env!("VTMOCK_CRATE");

/// The path the generated code uses to reach the runtime crate. Overridable
/// for builds that re-export it under another name.
pub fn runtime_path() -> TokenStream {
    if let Some(path) = RUNTIME_CRATE
        .map(Path::from_string)
        .transpose()
        .expect("failed to parse runtime crate path")
    {
        quote!(#path)
    } else {
        quote!(::vtmock)
    }
}

/// Generates the Rust struct, VTable struct, dispatch bridges, and mocking
/// metadata for one class declaration.
pub fn mock_class_impl(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let def = parse_macro_input!(input as MockDef);
    generate_class(def).into_token_stream().into()
}

fn generate_class(mut def: MockDef) -> File {
    // extract `#[concrete]`
    let concrete = Concrete::extract(&mut def.class);

    validate(&def.class);

    // generate the base rust structure
    let stct = stct::gen_struct(&def.class, concrete.is_some());

    // generate the bridge between the class and its vtable before
    // standardizing the ABI
    let bridge = bridge::gen_bridge(&def.class);

    // standardize the ABI and signatures for virtuals before passing on the
    // class
    standardize_virtuals(&mut def.class);

    let slots = vtable::sort_virtuals(&def.class);

    // generate the trait implementors of a concrete class fill in
    let trt = concrete.as_ref().map(|_| trt::gen_trait(&def.class));

    // generate the VTable structure (and, for a concrete class, its static)
    let vtable = vtable::gen_vtable(&def.class, &slots, concrete.as_ref());

    // generate constructor hooks
    let impl_hooks = imp::gen_hooks(&def, concrete.is_some());

    // generate the mocking metadata and method descriptors
    let mockable = mockable::gen_mockable(&def.class, &slots);

    let output = quote! {
        #stct
        #impl_hooks
        #trt
        #vtable
        #bridge
        #mockable
    };
    syn::parse(output.into()).expect("failed to generate class")
}

fn validate(class: &ItemClass) {
    if !class.bases.is_empty() {
        let bases: Vec<String> = class.bases.idents().map(|ident| ident.to_string()).collect();
        panic!(
            "base classes are not supported ({}); redeclare inherited virtuals \
             with explicit `virtual(idx)` slot indices",
            bases.join(", ")
        );
    }

    if !class.generics.params.is_empty() {
        panic!("generic classes are not supported");
    }

    if class.body.virtuals.is_empty() {
        panic!("a class must declare at least one virtual method");
    }

    for virt in &class.body.virtuals {
        let Some(sig) = virt.sig() else { continue };
        if !sig.generics.params.is_empty() {
            panic!("virtual `{}` must not be generic", sig.ident);
        }

        let args = sig.inputs.len().saturating_sub(1);
        if args > MAX_ARGS {
            panic!(
                "virtual `{}` takes {args} arguments; at most {MAX_ARGS} are supported",
                sig.ident
            );
        }
    }
}

/// Standardizes the ABI and signatures for virtuals: every slot dispatches
/// `extern "C-unwind"` (stubbed slots panic through the table), and the
/// receiver becomes an explicit `this` parameter.
fn standardize_virtuals(class: &mut ItemClass) {
    let class_ident = class.ident.clone();
    for virt in class.body.virtuals.iter_mut() {
        let Some(sig) = virt.sig_mut() else { continue };
        sig.abi = parse_quote!(extern "C-unwind");

        // if the first arg is `self`, replace it with the type
        let args = &mut sig.inputs;
        if let Some(FnArg::Receiver(receiver)) = args.first().cloned() {
            let mutability = receiver.mutability;
            *args.first_mut().expect("receiver checked above") = FnArg::Typed(PatType {
                attrs: vec![],
                pat: Box::new(parse_quote!(this)),
                colon_token: Default::default(),
                ty: Box::new(parse_quote!(&#mutability #class_ident)),
            });
        } else {
            panic!("virtuals must take `&self` or `&mut self`")
        }
    }
}
