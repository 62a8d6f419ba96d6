use proc_macro2::Span;
use quote::*;
use syn::spanned::Spanned;

use crate::attr::attr_util;
use crate::attr::foreign;

/// One declaration inside `#[table] impl T { .. }`.
pub enum Method {
    Column(Column),
    Foreign(ForeignLink),
}

pub struct Column {
    pub name: syn::LitStr,
    pub method_ident: syn::Ident,
    pub ty: syn::Type,
    pub primary_key: bool,
}

pub struct ForeignLink {
    pub name: syn::LitStr,
    pub method_ident: syn::Ident,
    pub foreign: foreign::ForeignAttr,
}

enum Quantified<T> {
    Unit(T),
    Slice(syn::token::Bracket, T),
}

struct Meta {
    foreign: Option<foreign::ForeignAttr>,
    primary_key: Option<Span>,
}

impl Method {
    pub fn try_from_ast(method: syn::TraitItemMethod) -> syn::Result<Self> {
        let span = method.span();
        let meta = meta_from_attrs(method.attrs)?;

        if let Some(arg) = method.sig.inputs.first() {
            return Err(syn::Error::new(
                arg.span(),
                "Table declarations take no arguments",
            ));
        }
        if let Some(default) = &method.default {
            return Err(syn::Error::new(
                default.span(),
                "Table declarations have no body",
            ));
        }

        let method_ident = method.sig.ident;
        let name = syn::LitStr::new(&method_ident.to_string(), method_ident.span());
        let return_type = extract_quantified_return_type(method.sig.output, span)?;

        match meta.foreign {
            Some(foreign) => {
                if let Some(primary_key_span) = meta.primary_key {
                    return Err(syn::Error::new(
                        primary_key_span,
                        "A foreign key can not be a primary key",
                    ));
                }

                let return_path = match (&foreign.cardinality, return_type) {
                    (foreign::LinkCardinality::ToOne, Quantified::Unit(ty)) => ty,
                    (foreign::LinkCardinality::ToOne, Quantified::Slice(bracket, _)) => {
                        return Err(syn::Error::new(
                            bracket.span,
                            "Expected non-slice unit type",
                        ))
                    }
                    (foreign::LinkCardinality::ToMany, Quantified::Slice(_, ty)) => ty,
                    (foreign::LinkCardinality::ToMany, Quantified::Unit(ty)) => {
                        return Err(syn::Error::new(ty.span(), "Expected slice"))
                    }
                };

                let expected = &foreign.target;
                if quote!(#return_path).to_string() != quote!(#expected).to_string() {
                    return Err(syn::Error::new(
                        return_path.span(),
                        format!("Expected `{}`", quote!(#expected)),
                    ));
                }

                Ok(Self::Foreign(ForeignLink {
                    name,
                    method_ident,
                    foreign,
                }))
            }
            None => match return_type {
                Quantified::Unit(ty) => Ok(Self::Column(Column {
                    name,
                    method_ident,
                    ty,
                    primary_key: meta.primary_key.is_some(),
                })),
                Quantified::Slice(bracket, _) => Err(syn::Error::new(
                    bracket.span,
                    "Expected non-slice unit type",
                )),
            },
        }
    }
}

fn extract_quantified_return_type(
    ret_ty: syn::ReturnType,
    field_span: Span,
) -> syn::Result<Quantified<syn::Type>> {
    let user_ty = match ret_ty {
        syn::ReturnType::Default => return Err(syn::Error::new(field_span, "Expected return type")),
        syn::ReturnType::Type(_, ty) => *ty,
    };

    match user_ty {
        syn::Type::Slice(type_slice) => Ok(Quantified::Slice(
            type_slice.bracket_token,
            *type_slice.elem,
        )),
        syn::Type::Path(path) if path.path.is_ident("Self") => Err(syn::Error::new(
            path.span(),
            "Expected a type, not Self",
        )),
        ty => Ok(Quantified::Unit(ty)),
    }
}

fn meta_from_attrs(attrs: Vec<syn::Attribute>) -> syn::Result<Meta> {
    let mut meta = Meta {
        foreign: None,
        primary_key: None,
    };

    for attr in attrs {
        if attr_util::attr_has_simple_ident(&attr, "foreign") {
            meta.foreign = Some(syn::parse2(attr.tokens)?);
        } else if attr_util::attr_has_simple_ident(&attr, "primary_key") {
            if !attr.tokens.is_empty() {
                return Err(syn::Error::new(
                    attr.tokens.span(),
                    "#[primary_key] takes no arguments",
                ));
            }
            meta.primary_key = Some(attr.path.span());
        } else {
            return Err(syn::Error::new(attr.path.span(), "Unrecognized attribute"));
        }
    }

    Ok(meta)
}

pub fn gen_method(method: &Method, table_path: &syn::Path) -> proc_macro2::TokenStream {
    match method {
        Method::Column(column) => {
            let method_ident = &column.method_ident;
            let name = &column.name;
            let ty = &column.ty;

            quote! {
                pub fn #method_ident() -> ::nestql::Column<#table_path, #ty> {
                    ::nestql::Column::new(#name)
                }
            }
        }
        Method::Foreign(link) => {
            let method_ident = &link.method_ident;
            let name = &link.name;
            let foreign_table_path = &link.foreign.target;
            let span = link.foreign.span;

            let outcome = match link.foreign.cardinality {
                foreign::LinkCardinality::ToOne => quote_spanned! {span=> OneToOne },
                foreign::LinkCardinality::ToMany => quote_spanned! {span=> OneToMany },
            };

            quote! {
                pub fn #method_ident() -> ::nestql::Foreign<#table_path, #foreign_table_path, ::nestql::#outcome> {
                    ::nestql::Foreign::new(#name)
                }
            }
        }
    }
}

/// `ColumnDef` metadata of a column.
pub fn gen_column_def(column: &Column) -> proc_macro2::TokenStream {
    let name = &column.name;
    let nullable = attr_util::is_option_type(&column.ty);

    quote! {
        ::nestql::schema::ColumnDef {
            name: #name,
            nullable: #nullable,
        }
    }
}

/// `ForeignKeyDef` metadata of a link, together with its target function.
///
/// Every referenced column of the foreign table is also checked to exist,
/// by naming its generated accessor.
pub fn gen_foreign_key_def(
    link: &ForeignLink,
    table_path: &syn::Path,
) -> (proc_macro2::TokenStream, proc_macro2::TokenStream) {
    let name = &link.name;
    let foreign_table_path = &link.foreign.target;
    let target_ident = format_ident!("__target_{}", link.method_ident);
    let many = matches!(link.foreign.cardinality, foreign::LinkCardinality::ToMany);

    let pairs = link.foreign.pairs.iter().map(|pair| {
        let local = pair.local.to_string();
        let foreign = pair.foreign.to_string();
        quote! { (#local, #foreign) }
    });

    let checks = link.foreign.pairs.iter().map(|pair| {
        let local_ident = &pair.local;
        let foreign_ident = &pair.foreign;
        let local_span = local_ident.span();
        let foreign_span = foreign_ident.span();

        let local_check = quote_spanned! {local_span=> let _ = #table_path::#local_ident; };
        let foreign_check =
            quote_spanned! {foreign_span=> let _ = #foreign_table_path::#foreign_ident; };

        quote! {
            #local_check
            #foreign_check
        }
    });

    let target = quote! {
        fn #target_ident() -> &'static dyn ::nestql::Relation {
            #(#checks)*
            <#foreign_table_path as ::nestql::Instance>::instance()
        }
    };

    let def = quote! {
        ::nestql::schema::ForeignKeyDef {
            name: #name,
            target: #target_ident,
            pairs: &[#(#pairs),*],
            many: #many,
        }
    };

    (target, def)
}
