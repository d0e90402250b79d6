use darling::FromAttributes;
use proc_macro2::Span;
use syn::Attribute;

use crate::class::extractor::AttributeExtractor;

/// `#[concrete]` marks a class that is also instantiated for real (usually
/// as a spy target): it gets a `<Name>Virtuals` trait, a `VTBL` constant,
/// and constructor hooks. Without it only the mockable shell is generated.
#[derive(FromAttributes)]
#[darling(attributes(concrete))]
pub struct Concrete {
    /// Fill slot gaps with no-op functions instead of panicking ones.
    #[darling(default)]
    pub no_unimpl: bool,
}

impl AttributeExtractor for Concrete {
    type Output = Self;

    fn attr() -> &'static str {
        "concrete"
    }

    fn parse_attr(attr: Attribute) -> syn::Result<Self::Output> {
        Self::from_attributes(&[attr]).map_err(|err| syn::Error::new(Span::call_site(), err))
    }
}
