pub struct Meet;
pub struct Heat;
pub struct Lane;

#[nestql::table("meet")]
impl Meet {
    #[primary_key]
    fn id() -> i64;
    fn venue() -> Option<String>;

    #[foreign(Heat(meet_id) => Self(id))]
    fn heats() -> [Heat];
}

#[nestql::table("heat")]
impl Heat {
    #[primary_key]
    fn meet_id() -> i64;
    #[primary_key]
    fn number() -> i16;

    #[foreign(Self(meet_id) => Meet(id))]
    fn meet() -> Meet;

    #[foreign(Lane(meet_id, heat_number) => Self(meet_id, number))]
    fn lanes() -> [Lane];
}

#[nestql::table("lane")]
impl Lane {
    fn meet_id() -> i64;
    fn heat_number() -> i16;
    fn position() -> i32;

    #[foreign(Self(meet_id, heat_number) => Heat(meet_id, number))]
    fn heat() -> Heat;
}

fn main() {
    use nestql::{Instance, Relation};

    let schema = nestql::Schema::new(vec![
        Meet::instance() as &dyn Relation,
        Heat::instance(),
        Lane::instance(),
    ]);
    assert!(schema.validate().is_ok());

    let lanes = Heat::instance().foreign_key("lanes").unwrap();
    assert!(lanes.many);
    assert_eq!(lanes.pairs, &[("meet_id", "meet_id"), ("number", "heat_number")]);
    assert!(Meet::instance().column("venue").unwrap().nullable);

    let _ = Lane::heat().column(Heat::meet().column(Meet::venue()));
}
