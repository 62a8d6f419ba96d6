use quote::quote;
use syn::parse::ParseStream;
use syn::spanned::Spanned;

use crate::table_method::{self, Method};

pub struct ImplTable {
    pub path: syn::Path,
    pub mod_ident: syn::Ident,
    pub method_results: Vec<syn::Result<Method>>,
}

impl syn::parse::Parse for ImplTable {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let _: syn::token::Impl = input.parse()?;
        let path: syn::Path = input.parse()?;

        let content;
        let _brace_token = syn::braced!(content in input);

        let mut method_results = Vec::new();
        while !content.is_empty() {
            method_results.push(
                content
                    .parse::<syn::TraitItemMethod>()
                    .and_then(Method::try_from_ast),
            );
        }

        let ident = match path.segments.last() {
            Some(segment) => &segment.ident,
            None => return Err(syn::Error::new(path.span(), "Expected a table type")),
        };
        let ident_lower = ident.to_string().to_lowercase();
        let mod_ident = quote::format_ident!("__{}", ident_lower);

        Ok(ImplTable {
            path,
            mod_ident,
            method_results,
        })
    }
}

pub fn gen_table(table_name: syn::LitStr, impl_table: ImplTable) -> proc_macro2::TokenStream {
    let path = &impl_table.path;
    let mod_ident = &impl_table.mod_ident;

    let errors = impl_table
        .method_results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .map(syn::Error::to_compile_error);

    let methods: Vec<&Method> = impl_table
        .method_results
        .iter()
        .filter_map(|result| result.as_ref().ok())
        .collect();

    let accessors = methods
        .iter()
        .map(|method| table_method::gen_method(method, path));

    let columns: Vec<&table_method::Column> = methods
        .iter()
        .filter_map(|method| match method {
            Method::Column(column) => Some(column),
            Method::Foreign(_) => None,
        })
        .collect();

    let column_defs = columns
        .iter()
        .map(|column| table_method::gen_column_def(column));

    let primary_key = columns
        .iter()
        .filter(|column| column.primary_key)
        .map(|column| &column.name);

    let (targets, foreign_key_defs): (Vec<_>, Vec<_>) = methods
        .iter()
        .filter_map(|method| match method {
            Method::Foreign(link) => Some(table_method::gen_foreign_key_def(link, path)),
            Method::Column(_) => None,
        })
        .unzip();

    quote! {
        #(#errors)*

        impl ::nestql::Relation for #path {
            fn name(&self) -> &'static str {
                #table_name
            }

            fn columns(&self) -> &'static [::nestql::schema::ColumnDef] {
                #mod_ident::COLUMNS
            }

            fn primary_key(&self) -> &'static [&'static str] {
                #mod_ident::PRIMARY_KEY
            }

            fn foreign_keys(&self) -> &'static [::nestql::schema::ForeignKeyDef] {
                #mod_ident::FOREIGN_KEYS
            }
        }

        impl #path {
            #(#accessors)*
        }

        #[doc(hidden)]
        mod #mod_ident {
            use super::*;

            static INSTANCE: #path = #path;

            impl ::nestql::Instance for #path {
                fn instance() -> &'static Self {
                    &INSTANCE
                }
            }

            pub(super) static COLUMNS: &[::nestql::schema::ColumnDef] = &[#(#column_defs),*];

            pub(super) static PRIMARY_KEY: &[&str] = &[#(#primary_key),*];

            pub(super) static FOREIGN_KEYS: &[::nestql::schema::ForeignKeyDef] = &[#(#foreign_key_defs),*];

            #(#targets)*
        }
    }
}
