use syn::Attribute;

use crate::parse::ItemClass;

/// Pulls one of our marker attributes off a class declaration so the
/// remaining attributes pass through to the generated struct untouched.
pub trait AttributeExtractor {
    type Output;

    /// Extracts an attribute out of a class.
    fn extract(class: &mut ItemClass) -> Option<Self::Output> {
        let idx = class
            .attrs
            .iter()
            .position(|attr| attr.path().is_ident(Self::attr()))?;
        let attr = class.attrs.remove(idx);

        Some(
            Self::parse_attr(attr)
                .unwrap_or_else(|e| panic!("parse `{}` error: {e}", Self::attr())),
        )
    }

    /// Returns the attribute name.
    fn attr() -> &'static str;
    /// Parses the attribute itself.
    fn parse_attr(attr: Attribute) -> syn::Result<Self::Output>;
}
