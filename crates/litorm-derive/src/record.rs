//! Record derive macro implementation

mod attrs;

use attrs::{FieldAttr, get_table_name};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let table_name = get_table_name(&input)?;

    let mut accessors = Vec::new();
    let mut columns = Vec::new();
    for field in fields {
        let attr = FieldAttr::from_field(field)?;
        if attr.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let plain = ident.to_string().trim_start_matches("r#").to_string();
        let column_name = attr.column.clone().unwrap_or_else(|| plain.clone());

        let column = match (&attr.get, &attr.set) {
            (Some(get), Some(set)) => quote! {
                ::litorm::Column::accessor::<#ty>(#column_name, #name::#get, #name::#set)
            },
            _ => {
                let get = format_ident!("__litorm_get_{}", plain);
                let get_mut = format_ident!("__litorm_get_mut_{}", plain);
                accessors.push(quote! {
                    fn #get(record: &#name) -> &#ty {
                        &record.#ident
                    }
                    fn #get_mut(record: &mut #name) -> &mut #ty {
                        &mut record.#ident
                    }
                });
                quote! {
                    ::litorm::Column::field::<#ty>(#column_name, #get, #get_mut)
                }
            }
        };

        let constraints = &attr.constraints;
        columns.push(quote! {
            .column(#column #(.constraint(#constraints))*)
        });
    }

    Ok(quote! {
        impl ::litorm::Record for #name {
            fn table() -> ::litorm::OrmResult<::litorm::Table<Self>> {
                #(#accessors)*

                ::litorm::Table::builder(#table_name)
                    #(#columns)*
                    .build()
            }
        }
    })
}
