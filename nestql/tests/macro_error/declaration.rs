pub struct Meet;
pub struct Heat;

#[nestql::table("meet")]
impl Meet {
    #[primary_key]
    fn id() -> i64;

    #[foreign(Heat(meet_id) => Self(id))]
    fn heat() -> Heat;
}

#[nestql::table("heat")]
impl Heat {
    fn meet_id() -> i64;

    #[foreign(Self(meet_id) => Meet(id))]
    fn meets() -> [Meet];

    #[primary_key]
    #[foreign(Self(meet_id) => Meet(id))]
    fn keyed_meet() -> Meet;
}

fn main() {}
