use nestql::prelude::*;
use nestql::*;
use pretty_assertions::assert_eq;

mod common;

use common::db::*;
use common::*;

#[test]
fn schema_is_consistent() {
    assert_eq!(db::schema().validate(), Ok(()));
    assert_eq!(
        db::schema()
            .relation("result")
            .map(|relation| relation.primary_key()),
        Some(&["id"][..])
    );
    assert_eq!(
        CategoryAthlete::instance().primary_key(),
        &["category_id", "athlete_id"]
    );
}

#[tokio::test]
async fn find_competitions() {
    let mut conn = seeded_db().await;

    let competitions = select::<Competition>()
        .columns((Competition::id(), Competition::name(), Competition::competition_date()))
        .order_by(Competition::name().asc())
        .fetch_all(&mut conn)
        .await
        .unwrap();

    assert_eq!(
        competitions,
        vec![(1, "CIS Liestal".to_string(), date(2023, 6, 10))]
    );
}

#[tokio::test]
async fn find_missing_competition() {
    let mut conn = seeded_db().await;

    let query = select::<Competition>()
        .columns((Competition::name(),))
        .filter(Competition::id().eq(2i64));

    assert_eq!(query.fetch_optional(&mut conn).await, Ok(None));
    assert_eq!(
        query.fetch_one(&mut conn).await,
        Err(NestError::NotFound {
            relation: "competition"
        })
    );
}

#[tokio::test]
async fn implicit_join_into_record() {
    let mut conn = seeded_db().await;

    let athletes = select::<Athlete>()
        .columns((
            Athlete::first_name(),
            Athlete::last_name(),
            Athlete::club().column(Club::name()),
        ))
        .filter(Athlete::year_of_birth().ge(1990))
        .map(AthleteDto::new)
        .fetch_all(&mut conn)
        .await
        .unwrap();

    assert_eq!(
        athletes,
        vec![AthleteDto::new(
            "Armand".to_string(),
            "Duplantis".to_string(),
            "Louisiana State University".to_string(),
        )]
    );
}

#[tokio::test]
async fn implicit_join_without_foreign_row() {
    let mut conn = seeded_db().await;

    insert_into::<Athlete>()
        .value(Athlete::id(), 1001i64)
        .value(Athlete::first_name(), "Mondo")
        .value(Athlete::last_name(), "Unattached")
        .value(Athlete::gender(), "m")
        .value(Athlete::year_of_birth(), 2001)
        .execute(&mut conn)
        .await
        .unwrap();

    let club_id = select::<Athlete>()
        .columns((Athlete::club_id(),))
        .filter(Athlete::id().eq(1001i64))
        .fetch_one(&mut conn)
        .await
        .unwrap();
    assert_eq!(club_id, (None,));

    // the LEFT JOIN yields NULL, which a non-optional column refuses
    let club_name = select::<Athlete>()
        .columns((Athlete::club().column(Club::name()),))
        .filter(Athlete::id().eq(1001i64))
        .fetch_one(&mut conn)
        .await;
    assert!(matches!(club_name, Err(NestError::Decode { .. })));

    let athletes = select::<Athlete>()
        .columns((
            Athlete::last_name(),
            Athlete::club().nullable_column(Club::name()),
        ))
        .order_by(Athlete::id().asc())
        .fetch_all(&mut conn)
        .await
        .unwrap();
    assert_eq!(
        athletes,
        vec![
            (
                "Duplantis".to_string(),
                Some("Louisiana State University".to_string())
            ),
            ("Unattached".to_string(), None),
        ]
    );
}

#[tokio::test]
async fn delete_athlete() {
    let mut conn = seeded_db().await;

    sqlx::query("DELETE FROM result")
        .execute(&mut conn)
        .await
        .unwrap();
    sqlx::query("DELETE FROM category_athlete")
        .execute(&mut conn)
        .await
        .unwrap();

    let deleted = delete_from::<Athlete>()
        .filter(Athlete::id().eq(1000i64))
        .execute(&mut conn)
        .await
        .unwrap();

    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn closed_pool_is_a_transport_error() {
    let mut pool = seeded_pool().await;

    let clubs = select::<Club>()
        .columns((Club::abbreviation(),))
        .fetch_all(&mut pool)
        .await
        .unwrap();
    assert_eq!(clubs, vec![("LSU".to_string(),)]);

    pool.close().await;

    let clubs = select::<Club>()
        .columns((Club::abbreviation(),))
        .fetch_all(&mut pool)
        .await;
    assert!(matches!(clubs, Err(NestError::Transport(_))));

    let deleted = delete_from::<Club>()
        .filter(Club::id().eq(1i64))
        .execute(&mut pool)
        .await;
    assert!(matches!(deleted, Err(NestError::Transport(_))));
}
