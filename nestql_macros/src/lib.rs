#![forbid(unsafe_code)]

extern crate proc_macro;

mod table;
mod table_method;

mod attr {
    pub mod attr_util;
    pub mod foreign;
}

use proc_macro::TokenStream;

///
/// Declare the schema of one relation.
///
/// ```ignore
/// #[nestql::table("athlete")]
/// impl Athlete {
///     #[primary_key]
///     fn id() -> i64;
///     fn club_id() -> Option<i64>;
///
///     #[foreign(Self(club_id) => Club(id))]
///     fn club() -> Club;
///
///     #[foreign(AthleteResult(athlete_id) => Self(id))]
///     fn results() -> [AthleteResult];
/// }
/// ```
///
#[proc_macro_attribute]
pub fn table(args: TokenStream, input: TokenStream) -> TokenStream {
    let name: syn::LitStr = syn::parse_macro_input!(args as syn::LitStr);
    let impl_table = syn::parse_macro_input!(input as table::ImplTable);

    let tokens = table::gen_table(name, impl_table);

    TokenStream::from(tokens)
}
