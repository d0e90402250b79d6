use syn::{parse_quote, Expr, ExprStruct, ImplItem, ImplItemFn, ItemImpl, Stmt, Type};

use crate::class::vtable::make_vtable_ident;
use crate::parse::{ItemClass, MockDef};

/// Generates hooked versions of all implemented methods that construct
/// instances, wiring the `vfptr` field into every instantiation.
pub fn gen_hooks(def: &MockDef, concrete: bool) -> Option<ItemImpl> {
    let mut imp = def.new_impl.clone()?;

    if !concrete {
        panic!("constructor impls require `#[concrete]`; a real instance needs a vtable");
    }

    // make sure the impl is for us
    let Type::Path(ty) = &*imp.self_ty else {
        panic!("implementation of a non-type found")
    };
    assert_eq!(
        ty.path.get_ident(),
        Some(&def.class.ident),
        "only implementations of the class type are allowed"
    );

    imp.items = gen_impl_items(&def.class, imp.items);

    Some(imp)
}

/// Generates all implementation items.
fn gen_impl_items(class: &ItemClass, items: Vec<ImplItem>) -> Vec<ImplItem> {
    items
        .into_iter()
        .map(|item| match item {
            ImplItem::Fn(item_fn) => ImplItem::Fn(process_fn(class, item_fn)),
            item => item,
        })
        .collect()
}

/// Filters instantiations, only returning those that instantiate `self`.
fn filter_instantiations<'a>(
    class: &'a ItemClass,
    expr: &'a mut ExprStruct,
) -> Option<&'a mut ExprStruct> {
    if expr.path == parse_quote!(Self)
        || expr
            .path
            .segments
            .last()
            .expect("expected path segments")
            .ident
            == class.ident
    {
        Some(expr)
    } else {
        None
    }
}

/// Processes a constructor function, inserting the `vfptr` initializer into
/// each instantiation of the class.
fn process_fn(class: &ItemClass, mut item: ImplItemFn) -> ImplItemFn {
    // look for all struct instantiations. this is a simple approach that
    // only looks for local declarations and raw expressions
    let instantiations: Vec<&mut ExprStruct> = item
        .block
        .stmts
        .iter_mut()
        .filter_map(|stmt| match stmt {
            Stmt::Local(local) => {
                if let Expr::Struct(stct) = &mut *local.init.as_mut()?.expr {
                    filter_instantiations(class, stct)
                } else {
                    None
                }
            }
            Stmt::Expr(Expr::Struct(stct), _) => filter_instantiations(class, stct),
            _ => None,
        })
        .collect();

    // if you see this, it's likely because the search for instantiation
    // expressions above is very naive
    if instantiations.is_empty() {
        panic!("only impls that instantiate the target are allowed")
    }

    // add the vtable instantiation
    let ident = &class.ident;
    let vtable_ident = make_vtable_ident(ident);
    for expr in instantiations {
        expr.fields.insert(
            0,
            parse_quote! { vfptr: &#ident::VTBL as *const #vtable_ident as usize },
        )
    }

    item
}
