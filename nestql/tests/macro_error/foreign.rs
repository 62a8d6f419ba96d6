pub struct Foo;
pub struct Bar;

#[nestql::table("foo")]
impl Foo {
    #[primary_key]
    fn id() -> i64;
    fn bar_id() -> i64;

    #[foreign(Self(id) => Self(id))]
    fn self_to_self() -> Foo;

    #[foreign(Bar(id) => Bar(foo_id))]
    fn bar_to_bar() -> Bar;

    #[foreign(Self(bar_id) => Bar(id, foo_id))]
    fn count_mismatch() -> Bar;
}

#[nestql::table("bar")]
impl Bar {
    #[primary_key]
    fn id() -> i64;
    fn foo_id() -> i64;
}

fn main() {}
