use proc_macro2::Span;
use syn::parse::ParseStream;
use syn::spanned::Spanned;

///
/// Parsed `#[foreign(Self(a, b) => Other(x, y))]`, or the reverse.
///
/// The side written first holds the referencing columns.
///
pub struct ForeignAttr {
    pub span: Span,
    pub target: syn::Path,
    pub pairs: Vec<ColumnPair>,
    pub cardinality: LinkCardinality,
}

/// `local = foreign`, where `local` is a column of `Self`.
pub struct ColumnPair {
    pub local: syn::Ident,
    pub foreign: syn::Ident,
}

pub enum LinkCardinality {
    /// `Self` references the target: at most one target row.
    ToOne,
    /// The target references `Self`: any number of target rows.
    ToMany,
}

/// One side of the arrow: `Self(..)` or `Path(..)`.
struct Side {
    table: Option<syn::Path>,
    columns: Vec<syn::Ident>,
}

impl syn::parse::Parse for Side {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let table = if input.peek(syn::token::SelfType) {
            input.parse::<syn::token::SelfType>()?;
            None
        } else {
            Some(input.parse::<syn::Path>()?)
        };

        let content;
        syn::parenthesized!(content in input);
        let columns =
            syn::punctuated::Punctuated::<syn::Ident, syn::token::Comma>::parse_terminated(
                &content,
            )?;

        let columns: Vec<syn::Ident> = columns.into_iter().collect();
        for (idx, column) in columns.iter().enumerate() {
            if columns[..idx].contains(column) {
                return Err(syn::Error::new(column.span(), "Column listed twice"));
            }
        }

        Ok(Self { table, columns })
    }
}

impl syn::parse::Parse for ForeignAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let content;
        syn::parenthesized!(content in input);
        let span = content.span();

        let referencing: Side = content.parse()?;
        content.parse::<syn::token::FatArrow>()?;
        let referenced: Side = content.parse()?;

        if !content.is_empty() {
            return Err(content.error("Unexpected tokens after foreign key"));
        }

        let (target, local, foreign, cardinality) = match (referencing.table, referenced.table) {
            (None, Some(target)) => (
                target,
                referencing.columns,
                referenced.columns,
                LinkCardinality::ToOne,
            ),
            (Some(target), None) => (
                target,
                referenced.columns,
                referencing.columns,
                LinkCardinality::ToMany,
            ),
            (None, None) => {
                return Err(syn::Error::new(
                    span,
                    "Foreign keys from a table to itself are not supported",
                ))
            }
            (Some(path), Some(_)) => {
                return Err(syn::Error::new(path.span(), "One side must be Self(..)"))
            }
        };

        Ok(Self {
            span,
            target,
            pairs: pair_columns(local, foreign, span)?,
            cardinality,
        })
    }
}

fn pair_columns(
    local: Vec<syn::Ident>,
    foreign: Vec<syn::Ident>,
    span: Span,
) -> syn::Result<Vec<ColumnPair>> {
    if local.is_empty() || foreign.is_empty() {
        return Err(syn::Error::new(span, "Must specify at least one column"));
    }
    if local.len() != foreign.len() {
        return Err(syn::Error::new(
            span,
            format!(
                "Column count mismatch: {} on Self, {} on the foreign table",
                local.len(),
                foreign.len()
            ),
        ));
    }

    Ok(local
        .into_iter()
        .zip(foreign)
        .map(|(local, foreign)| ColumnPair { local, foreign })
        .collect())
}
