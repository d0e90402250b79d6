use proc_macro2::Ident;
use syn::parse::{Parse, ParseStream};
use syn::{
    braced, parenthesized, token, Attribute, Field, Generics, ItemImpl, LitInt, Path, Signature,
    Token, Visibility,
};

use crate::util::last_segment;

pub mod kw {
    syn::custom_keyword!(class);
    syn::custom_keyword!(destructor);
}

/// Base classes.
///
/// Parsed only to reject them with a pointed message; inherited virtuals are
/// declared directly on the class with explicit slot indices instead.
#[derive(Debug, Default, Clone)]
pub struct BaseClasses {
    pub colon_token: Option<Token![:]>,
    pub bases: Vec<(Path, Option<Token![,]>)>,
}

impl BaseClasses {
    /// Returns an iterator over all identifiers.
    pub fn idents(&self) -> impl Iterator<Item = &Ident> {
        self.bases
            .iter()
            .map(|(path, _)| &last_segment(path).ident)
    }

    /// Returns true if there are no base classes.
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

impl Parse for BaseClasses {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if !input.peek(Token![:]) {
            return Ok(BaseClasses::default());
        }

        let colon_token = input.parse()?;
        let mut bases = Vec::new();
        // keep parsing types until we hit the open brace
        loop {
            if input.is_empty() {
                break;
            }

            let ty = input.parse()?;
            let comma_token = input.parse()?;
            bases.push((ty, comma_token));

            if input.peek(token::Brace) {
                break;
            }
        }

        Ok(Self { colon_token, bases })
    }
}

/// The body of a class: plain data fields first, then virtuals, all
/// semicolon-terminated.
#[derive(Debug, Clone)]
pub struct ClassBody {
    pub fields: Vec<Field>,
    pub virtuals: Vec<Virtual>,
}

impl Parse for ClassBody {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let content;
        braced!(content in input);

        let mut fields = Vec::new();
        loop {
            if content.is_empty() || content.peek(Token![virtual]) {
                break;
            }

            fields.push(content.call(Field::parse_named)?);
            content.parse::<Token![;]>()?;
        }

        let mut virtuals = Vec::new();
        while !content.is_empty() {
            virtuals.push(content.parse()?);
            content.parse::<Token![;]>()?;
        }

        Ok(Self { fields, virtuals })
    }
}

/// A total class definition.
#[derive(Debug, Clone)]
pub struct ItemClass {
    pub attrs: Vec<Attribute>,
    pub vis: Visibility,
    pub class_token: kw::class,
    pub ident: Ident,
    pub generics: Generics,
    pub bases: BaseClasses,
    pub body: ClassBody,
}

impl Parse for ItemClass {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(Self {
            attrs: input.call(Attribute::parse_outer)?,
            vis: input.parse()?,
            class_token: input.parse()?,
            ident: input.parse()?,
            generics: input.parse()?,
            bases: input.parse()?,
            body: input.parse()?,
        })
    }
}

/// A class definition plus an optional constructor impl block.
#[derive(Debug, Clone)]
pub struct MockDef {
    pub class: ItemClass,
    pub new_impl: Option<ItemImpl>,
}

impl Parse for MockDef {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(Self {
            class: input.parse()?,
            new_impl: if !input.is_empty() {
                Some(input.parse()?)
            } else {
                None
            },
        })
    }
}

/// One virtual slot declaration: an ordinary method or the destructor.
#[derive(Debug, Clone)]
pub struct Virtual {
    pub virtual_token: Token![virtual],
    pub index: VirtualIndex,
    pub attrs: Vec<Attribute>,
    pub vis: Visibility,
    pub kind: VirtualKind,
}

#[derive(Debug, Clone)]
pub enum VirtualKind {
    Method(Signature),
    Destructor(kw::destructor),
}

impl Virtual {
    pub fn sig(&self) -> Option<&Signature> {
        match &self.kind {
            VirtualKind::Method(sig) => Some(sig),
            VirtualKind::Destructor(_) => None,
        }
    }

    pub fn sig_mut(&mut self) -> Option<&mut Signature> {
        match &mut self.kind {
            VirtualKind::Method(sig) => Some(sig),
            VirtualKind::Destructor(_) => None,
        }
    }

    pub fn is_destructor(&self) -> bool {
        matches!(self.kind, VirtualKind::Destructor(_))
    }

    /// The name the slot is reported under in diagnostics and metadata.
    pub fn name(&self) -> String {
        match &self.kind {
            VirtualKind::Method(sig) => sig.ident.to_string(),
            VirtualKind::Destructor(_) => "destructor".to_owned(),
        }
    }
}

impl Parse for Virtual {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let virtual_token = input.parse()?;
        let index = input.parse()?;
        let attrs = input.call(Attribute::parse_outer)?;
        let vis = input.parse()?;
        let kind = if input.peek(kw::destructor) {
            VirtualKind::Destructor(input.parse()?)
        } else {
            VirtualKind::Method(input.parse()?)
        };

        Ok(Self {
            virtual_token,
            index,
            attrs,
            vis,
            kind,
        })
    }
}

/// The explicit slot index of a virtual method, e.g. `virtual(3)`.
#[derive(Debug, Default, Clone)]
pub struct VirtualIndex {
    pub paren_token: Option<token::Paren>,
    pub idx: Option<LitInt>,
}

impl Parse for VirtualIndex {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if !input.peek(token::Paren) {
            return Ok(Self::default());
        }

        let content;
        Ok(Self {
            paren_token: Some(parenthesized!(content in input)),
            idx: Some(content.parse()?),
        })
    }
}
