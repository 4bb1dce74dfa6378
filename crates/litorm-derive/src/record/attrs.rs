//! Attribute parsing for the Record derive macro.
//!
//! Handles struct-level `#[orm(table = "...")]` and field-level `#[orm(...)]`
//! attributes.

use proc_macro2::TokenStream;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{DeriveInput, LitStr, Result};

/// `ON CONFLICT` policy named in an attribute.
fn conflict_tokens(meta: &ParseNestedMeta<'_>, policy: &LitStr) -> Result<TokenStream> {
    Ok(match policy.value().to_ascii_lowercase().as_str() {
        "abort" => quote!(::litorm::Conflict::Abort),
        "replace" => quote!(::litorm::Conflict::Replace),
        "ignore" => quote!(::litorm::Conflict::Ignore),
        "fail" => quote!(::litorm::Conflict::Fail),
        "rollback" => quote!(::litorm::Conflict::Rollback),
        _ => {
            return Err(meta.error(
                "conflict must be one of: abort, replace, ignore, fail, rollback",
            ))
        }
    })
}

/// Foreign key action named in an attribute.
fn action_tokens(meta: &ParseNestedMeta<'_>, action: &LitStr) -> Result<TokenStream> {
    let value = action.value().to_ascii_lowercase().replace(' ', "_");
    Ok(match value.as_str() {
        "cascade" => quote!(::litorm::Action::Cascade),
        "restrict" => quote!(::litorm::Action::Restrict),
        "set_null" => quote!(::litorm::Action::SetNull),
        "set_default" => quote!(::litorm::Action::SetDefault),
        "no_action" => quote!(::litorm::Action::NoAction),
        _ => {
            return Err(meta.error(
                "action must be one of: cascade, restrict, set_null, set_default, no_action",
            ))
        }
    })
}

/// Parsed field-level attributes.
#[derive(Default)]
pub(super) struct FieldAttr {
    pub column: Option<String>,
    pub skip: bool,
    pub get: Option<syn::Ident>,
    pub set: Option<syn::Ident>,
    /// Constraint constructors in declaration order.
    pub constraints: Vec<TokenStream>,
}

impl FieldAttr {
    pub(super) fn from_field(field: &syn::Field) -> Result<Self> {
        let mut attr = FieldAttr::default();
        for a in &field.attrs {
            if !a.path().is_ident("orm") {
                continue;
            }
            a.parse_nested_meta(|meta| attr.parse_item(meta))?;
        }
        if attr.get.is_some() != attr.set.is_some() {
            return Err(syn::Error::new_spanned(
                field,
                "accessor columns need both `get = \"...\"` and `set = \"...\"`",
            ));
        }
        Ok(attr)
    }

    fn parse_item(&mut self, meta: ParseNestedMeta<'_>) -> Result<()> {
        if meta.path.is_ident("column") {
            let value: LitStr = meta.value()?.parse()?;
            self.column = Some(value.value());
        } else if meta.path.is_ident("skip") {
            self.skip = true;
        } else if meta.path.is_ident("get") {
            let value: LitStr = meta.value()?.parse()?;
            self.get = Some(value.parse()?);
        } else if meta.path.is_ident("set") {
            let value: LitStr = meta.value()?.parse()?;
            self.set = Some(value.parse()?);
        } else if meta.path.is_ident("primary_key") {
            let mut conflict = quote!(::litorm::Conflict::Abort);
            let mut autoincrement = false;
            if meta.input.peek(syn::token::Paren) {
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("conflict") {
                        let value: LitStr = inner.value()?.parse()?;
                        conflict = conflict_tokens(&inner, &value)?;
                    } else if inner.path.is_ident("autoincrement") {
                        autoincrement = true;
                    } else {
                        return Err(inner.error("expected `conflict` or `autoincrement`"));
                    }
                    Ok(())
                })?;
            }
            self.constraints.push(quote! {
                ::litorm::Constraint::PrimaryKey {
                    conflict: #conflict,
                    autoincrement: #autoincrement,
                }
            });
        } else if meta.path.is_ident("not_null") || meta.path.is_ident("unique") {
            let ctor = if meta.path.is_ident("unique") {
                quote!(::litorm::Constraint::unique)
            } else {
                quote!(::litorm::Constraint::not_null)
            };
            let mut conflict = quote!(::litorm::Conflict::Abort);
            if meta.input.peek(syn::token::Paren) {
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("conflict") {
                        let value: LitStr = inner.value()?.parse()?;
                        conflict = conflict_tokens(&inner, &value)?;
                        Ok(())
                    } else {
                        Err(inner.error("expected `conflict`"))
                    }
                })?;
            }
            self.constraints.push(quote!(#ctor(#conflict)));
        } else if meta.path.is_ident("foreign_key") {
            let mut table = None;
            let mut column = None;
            let mut on_update = quote!(::litorm::Action::NoAction);
            let mut on_delete = quote!(::litorm::Action::NoAction);
            meta.parse_nested_meta(|inner| {
                let value: LitStr = inner.value()?.parse()?;
                if inner.path.is_ident("table") {
                    table = Some(value.value());
                } else if inner.path.is_ident("column") {
                    column = Some(value.value());
                } else if inner.path.is_ident("on_update") {
                    on_update = action_tokens(&inner, &value)?;
                } else if inner.path.is_ident("on_delete") {
                    on_delete = action_tokens(&inner, &value)?;
                } else {
                    return Err(inner.error(
                        "expected `table`, `column`, `on_update` or `on_delete`",
                    ));
                }
                Ok(())
            })?;
            let (Some(table), Some(column)) = (table, column) else {
                return Err(meta.error("foreign_key requires `table` and `column`"));
            };
            self.constraints.push(quote! {
                ::litorm::Constraint::foreign_key(
                    ::litorm::Reference::new(#table, #column),
                    #on_update,
                    #on_delete,
                )
            });
        } else {
            return Err(meta.error("unsupported orm attribute"));
        }
        Ok(())
    }
}

/// Extract table name from struct-level `#[orm(table = "...")]` attribute.
pub(super) fn get_table_name(input: &DeriveInput) -> Result<String> {
    let mut table = None;
    for attr in &input.attrs {
        if attr.path().is_ident("orm") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let value: LitStr = meta.value()?.parse()?;
                    table = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("expected `table = \"...\"`"))
                }
            })?;
        }
    }
    table.ok_or_else(|| {
        syn::Error::new_spanned(
            input,
            "Record requires #[orm(table = \"table_name\")] attribute",
        )
    })
}
