#![allow(dead_code)]

use chrono::NaiveDate;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Connection, SqliteConnection, SqlitePool};

pub mod db {
    pub struct Series;
    pub struct Competition;
    pub struct Club;
    pub struct Organization;
    pub struct Athlete;
    pub struct Category;
    pub struct CategoryAthlete;
    pub struct Event;
    pub struct AthleteResult;

    #[nestql::table("series")]
    impl Series {
        #[primary_key]
        fn id() -> i64;
        fn name() -> String;
    }

    #[nestql::table("competition")]
    impl Competition {
        #[primary_key]
        fn id() -> i64;
        fn name() -> String;
        fn competition_date() -> chrono::NaiveDate;
        fn always_first_three_medals() -> bool;
        fn medal_percentage() -> i32;
        fn series_id() -> i64;

        #[foreign(Self(series_id) => Series(id))]
        fn series() -> Series;

        #[foreign(Category(series_id) => Self(series_id))]
        fn categories() -> [Category];
    }

    #[nestql::table("club")]
    impl Club {
        #[primary_key]
        fn id() -> i64;
        fn abbreviation() -> String;
        fn name() -> String;
    }

    #[nestql::table("organization")]
    impl Organization {
        #[primary_key]
        fn id() -> i64;
        fn abbreviation() -> String;
        fn name() -> String;
    }

    #[nestql::table("athlete")]
    impl Athlete {
        #[primary_key]
        fn id() -> i64;
        fn first_name() -> String;
        fn last_name() -> String;
        fn gender() -> String;
        fn year_of_birth() -> i32;
        fn club_id() -> Option<i64>;
        fn organization_id() -> Option<i64>;

        #[foreign(Self(club_id) => Club(id))]
        fn club() -> Club;

        #[foreign(Self(organization_id) => Organization(id))]
        fn organization() -> Organization;

        #[foreign(AthleteResult(athlete_id) => Self(id))]
        fn results() -> [AthleteResult];
    }

    #[nestql::table("category")]
    impl Category {
        #[primary_key]
        fn id() -> i64;
        fn abbreviation() -> String;
        fn name() -> String;
        fn gender() -> String;
        fn year_from() -> i32;
        fn year_to() -> i32;
        fn series_id() -> i64;

        #[foreign(CategoryAthlete(category_id) => Self(id))]
        fn athletes() -> [CategoryAthlete];
    }

    #[nestql::table("category_athlete")]
    impl CategoryAthlete {
        #[primary_key]
        fn category_id() -> i64;
        #[primary_key]
        fn athlete_id() -> i64;

        #[foreign(Self(category_id) => Category(id))]
        fn category() -> Category;

        #[foreign(Self(athlete_id) => Athlete(id))]
        fn athlete() -> Athlete;
    }

    #[nestql::table("event")]
    impl Event {
        #[primary_key]
        fn id() -> i64;
        fn abbreviation() -> String;
        fn name() -> String;
        fn event_type() -> String;
    }

    #[nestql::table("result")]
    impl AthleteResult {
        #[primary_key]
        fn id() -> i64;
        fn competition_id() -> i64;
        fn athlete_id() -> i64;
        fn category_id() -> i64;
        fn event_id() -> i64;
        fn position() -> i32;
        fn result() -> String;
        fn points() -> i32;

        #[foreign(Self(event_id) => Event(id))]
        fn event() -> Event;

        #[foreign(Self(athlete_id) => Athlete(id))]
        fn athlete() -> Athlete;
    }

    pub fn schema() -> nestql::Schema {
        nestql::Schema::new(vec![
            <Series as nestql::Instance>::instance() as &dyn nestql::Relation,
            <Competition as nestql::Instance>::instance(),
            <Club as nestql::Instance>::instance(),
            <Organization as nestql::Instance>::instance(),
            <Athlete as nestql::Instance>::instance(),
            <Category as nestql::Instance>::instance(),
            <CategoryAthlete as nestql::Instance>::instance(),
            <Event as nestql::Instance>::instance(),
            <AthleteResult as nestql::Instance>::instance(),
        ])
    }
}

const SCHEMA: &str = r#"
CREATE TABLE series (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE competition (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    competition_date TEXT NOT NULL,
    always_first_three_medals INTEGER NOT NULL,
    medal_percentage INTEGER NOT NULL,
    series_id INTEGER NOT NULL REFERENCES series (id)
);

CREATE TABLE club (
    id INTEGER PRIMARY KEY,
    abbreviation TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE organization (
    id INTEGER PRIMARY KEY,
    abbreviation TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE athlete (
    id INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    gender TEXT NOT NULL,
    year_of_birth INTEGER NOT NULL,
    club_id INTEGER REFERENCES club (id),
    organization_id INTEGER REFERENCES organization (id)
);

CREATE TABLE category (
    id INTEGER PRIMARY KEY,
    abbreviation TEXT NOT NULL,
    name TEXT NOT NULL,
    gender TEXT NOT NULL,
    year_from INTEGER NOT NULL,
    year_to INTEGER NOT NULL,
    series_id INTEGER NOT NULL REFERENCES series (id)
);

CREATE TABLE category_athlete (
    category_id INTEGER NOT NULL REFERENCES category (id),
    athlete_id INTEGER NOT NULL REFERENCES athlete (id),
    PRIMARY KEY (category_id, athlete_id)
);

CREATE TABLE event (
    id INTEGER PRIMARY KEY,
    abbreviation TEXT NOT NULL,
    name TEXT NOT NULL,
    event_type TEXT NOT NULL
);

CREATE TABLE result (
    id INTEGER PRIMARY KEY,
    competition_id INTEGER NOT NULL REFERENCES competition (id),
    athlete_id INTEGER NOT NULL REFERENCES athlete (id),
    category_id INTEGER NOT NULL REFERENCES category (id),
    event_id INTEGER NOT NULL REFERENCES event (id),
    position INTEGER NOT NULL,
    result TEXT NOT NULL,
    points INTEGER NOT NULL
);
"#;

const SEED: &str = r#"
INSERT INTO series (id, name) VALUES (1, 'CIS 2023');

INSERT INTO competition (id, name, competition_date, always_first_three_medals, medal_percentage, series_id)
VALUES (1, 'CIS Liestal', '2023-06-10', 1, 0, 1);

INSERT INTO club (id, abbreviation, name) VALUES (1, 'LSU', 'Louisiana State University');

INSERT INTO organization (id, abbreviation, name) VALUES (1, 'STV', 'STV Liestal');

INSERT INTO athlete (id, first_name, last_name, gender, year_of_birth, club_id, organization_id)
VALUES (1000, 'Armand', 'Duplantis', 'm', 1999, 1, 1);

INSERT INTO category (id, abbreviation, name, gender, year_from, year_to, series_id)
VALUES (1, 'MAN', 'Men', 'm', 1900, 2004, 1);

INSERT INTO category_athlete (category_id, athlete_id) VALUES (1, 1000);

INSERT INTO event (id, abbreviation, name, event_type) VALUES (1, '60', '60 m', 'RUN');
INSERT INTO event (id, abbreviation, name, event_type) VALUES (2, 'LJ', 'Long Jump', 'JUMP');
INSERT INTO event (id, abbreviation, name, event_type) VALUES (3, 'SP', 'Shot Put', 'THROW');

INSERT INTO result (id, competition_id, athlete_id, category_id, event_id, position, result, points)
VALUES (1, 1, 1000, 1, 3, 3, '12.40', 650);
INSERT INTO result (id, competition_id, athlete_id, category_id, event_id, position, result, points)
VALUES (2, 1, 1000, 1, 1, 1, '7.85', 890);
INSERT INTO result (id, competition_id, athlete_id, category_id, event_id, position, result, points)
VALUES (3, 1, 1000, 1, 2, 2, '6.10', 720);
"#;

/// A fresh in-memory database with the schema, but no rows.
pub async fn empty_db() -> SqliteConnection {
    let mut conn = SqliteConnection::connect("sqlite::memory:")
        .await
        .expect("in-memory database");

    sqlx::raw_sql("PRAGMA foreign_keys = ON;")
        .execute(&mut conn)
        .await
        .expect("enable foreign keys");
    sqlx::raw_sql(SCHEMA)
        .execute(&mut conn)
        .await
        .expect("create schema");

    conn
}

/// A fresh in-memory database holding one competition with one category,
/// one athlete and three results.
pub async fn seeded_db() -> SqliteConnection {
    let mut conn = empty_db().await;

    sqlx::raw_sql(SEED)
        .execute(&mut conn)
        .await
        .expect("seed data");

    conn
}

/// The seeded database behind a pool of one long-lived connection.
pub async fn seeded_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");

    sqlx::raw_sql(SCHEMA)
        .execute(&pool)
        .await
        .expect("create schema");
    sqlx::raw_sql(SEED)
        .execute(&pool)
        .await
        .expect("seed data");

    pool
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompetitionRankingData {
    pub name: String,
    pub competition_date: NaiveDate,
    pub always_first_three_medals: bool,
    pub medal_percentage: i32,
    pub categories: Vec<CategoryData>,
}

impl CompetitionRankingData {
    pub fn new(
        name: String,
        competition_date: NaiveDate,
        always_first_three_medals: bool,
        medal_percentage: i32,
        categories: Vec<CategoryData>,
    ) -> Self {
        Self {
            name,
            competition_date,
            always_first_three_medals,
            medal_percentage,
            categories,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryData {
    pub abbreviation: String,
    pub name: String,
    pub year_from: i32,
    pub year_to: i32,
    pub athletes: Vec<AthleteData>,
}

impl CategoryData {
    pub fn new(
        abbreviation: String,
        name: String,
        year_from: i32,
        year_to: i32,
        athletes: Vec<AthleteData>,
    ) -> Self {
        Self {
            abbreviation,
            name,
            year_from,
            year_to,
            athletes,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AthleteData {
    pub first_name: String,
    pub last_name: String,
    pub year_of_birth: i32,
    pub club: String,
    pub results: Vec<ResultData>,
}

impl AthleteData {
    pub fn new(
        first_name: String,
        last_name: String,
        year_of_birth: i32,
        club: String,
        results: Vec<ResultData>,
    ) -> Self {
        Self {
            first_name,
            last_name,
            year_of_birth,
            club,
            results,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultData {
    pub event_abbreviation: String,
    pub result: String,
    pub points: i32,
}

impl ResultData {
    pub fn new(event_abbreviation: String, result: String, points: i32) -> Self {
        Self {
            event_abbreviation,
            result,
            points,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AthleteDto {
    pub first_name: String,
    pub last_name: String,
    pub club_name: String,
}

impl AthleteDto {
    pub fn new(first_name: String, last_name: String, club_name: String) -> Self {
        Self {
            first_name,
            last_name,
            club_name,
        }
    }
}

/// Competition, its categories, their athletes and each athlete's results
/// in that competition and category.
#[macro_export]
macro_rules! competition_ranking {
    ($competition_id:expr) => {{
        use nestql::prelude::*;
        use nestql::{multiset, select};
        use $crate::common::db::*;
        use $crate::common::*;

        select::<Competition>()
            .columns((
                Competition::name(),
                Competition::competition_date(),
                Competition::always_first_three_medals(),
                Competition::medal_percentage(),
                multiset(
                    select::<Category>()
                        .columns((
                            Category::abbreviation(),
                            Category::name(),
                            Category::year_from(),
                            Category::year_to(),
                            multiset(
                                select::<CategoryAthlete>()
                                    .columns((
                                        CategoryAthlete::athlete().column(Athlete::first_name()),
                                        CategoryAthlete::athlete().column(Athlete::last_name()),
                                        CategoryAthlete::athlete().column(Athlete::year_of_birth()),
                                        CategoryAthlete::athlete()
                                            .join(Athlete::club())
                                            .column(Club::name()),
                                        multiset(
                                            select::<AthleteResult>()
                                                .columns((
                                                    AthleteResult::event()
                                                        .column(Event::abbreviation()),
                                                    AthleteResult::result(),
                                                    AthleteResult::points(),
                                                ))
                                                .filter(
                                                    AthleteResult::athlete_id()
                                                        .eq(CategoryAthlete::athlete_id())
                                                        .and(
                                                            AthleteResult::competition_id()
                                                                .eq(Competition::id()),
                                                        )
                                                        .and(
                                                            AthleteResult::category_id()
                                                                .eq(Category::id()),
                                                        ),
                                                )
                                                .order_by(AthleteResult::position().asc())
                                                .map(ResultData::new),
                                        ),
                                    ))
                                    .via(Category::athletes())
                                    .map(AthleteData::new),
                            ),
                        ))
                        .via(Competition::categories())
                        .order_by(Category::abbreviation().asc())
                        .map(CategoryData::new),
                ),
            ))
            .filter(Competition::id().eq($competition_id))
            .map(CompetitionRankingData::new)
    }};
}
