// Integration tests for the dispatch store
// These require a running Postgres and are marked as ignored
// Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use dispatch_service::database::Database;
use ride_core::RideStatus;
use rust_decimal_macros::dec;
use uuid::Uuid;

async fn connect() -> Database {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    let db = Database::new(&url, 5).await.expect("connect failed");
    bootstrap(&db).await;
    db
}

async fn bootstrap(db: &Database) {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rides (
            id UUID PRIMARY KEY,
            rider_id UUID NOT NULL,
            driver_id UUID,
            pickup TEXT NOT NULL,
            dropoff TEXT NOT NULL,
            pickup_lat DOUBLE PRECISION NOT NULL,
            pickup_lng DOUBLE PRECISION NOT NULL,
            dropoff_lat DOUBLE PRECISION NOT NULL,
            dropoff_lng DOUBLE PRECISION NOT NULL,
            ride_type TEXT NOT NULL,
            fare NUMERIC NOT NULL,
            status TEXT NOT NULL,
            payment_status TEXT NOT NULL,
            declined_by UUID[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(db.pool())
    .await
    .expect("rides table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            id UUID PRIMARY KEY,
            ride_id UUID NOT NULL,
            rider_id UUID NOT NULL,
            amount NUMERIC NOT NULL,
            status TEXT NOT NULL,
            payment_method TEXT,
            payment_intent_id TEXT,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(db.pool())
    .await
    .expect("payments table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            full_name TEXT,
            phone TEXT,
            profile_pic TEXT,
            vehicle TEXT,
            vehicle_plate TEXT,
            lat DOUBLE PRECISION,
            lng DOUBLE PRECISION,
            updated_at TIMESTAMPTZ,
            stripe_account_id TEXT,
            total_earnings NUMERIC
        )
        "#,
    )
    .execute(db.pool())
    .await
    .expect("users table");

    // Replay guard for webhook inserts
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS payments_completed_intent_key
        ON payments (payment_intent_id)
        WHERE status = 'completed'
        "#,
    )
    .execute(db.pool())
    .await
    .expect("payments intent index");
}

async fn seed_ride(db: &Database) -> Uuid {
    let row = db
        .create_ride(
            Uuid::new_v4(),
            "MG Road",
            "Koramangala",
            12.9716,
            77.5946,
            12.9352,
            77.6146,
            "standard",
            dec!(80.10),
        )
        .await
        .expect("create ride");
    row.id
}

#[tokio::test]
#[ignore]
async fn accept_is_exclusive_under_contention() {
    let db = connect().await;
    let ride_id = seed_ride(&db).await;

    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    let won_first = db.accept_ride(ride_id, first).await.expect("accept");
    let won_second = db.accept_ride(ride_id, second).await.expect("accept");

    assert!(won_first.is_some());
    assert!(won_second.is_none(), "second claim must lose");

    let ride = db.get_ride(ride_id).await.unwrap().unwrap();
    assert_eq!(ride.status, "confirmed");
    assert_eq!(ride.driver_id, Some(first));
}

#[tokio::test]
#[ignore]
async fn decline_is_idempotent_and_keeps_ride_pending() {
    let db = connect().await;
    let ride_id = seed_ride(&db).await;
    let driver = Uuid::new_v4();

    let first = db.try_decline(ride_id, driver).await.expect("decline");
    let repeat = db.try_decline(ride_id, driver).await.expect("decline");

    assert!(first.is_some());
    assert!(repeat.is_none(), "repeat decline must not match");

    let ride = db.get_ride(ride_id).await.unwrap().unwrap();
    assert_eq!(ride.status, "pending");
    assert_eq!(ride.declined_by, vec![driver]);
}

#[tokio::test]
#[ignore]
async fn declined_rides_are_hidden_from_that_driver_only() {
    let db = connect().await;
    let ride_id = seed_ride(&db).await;
    let decliner = Uuid::new_v4();
    let other = Uuid::new_v4();

    db.try_decline(ride_id, decliner).await.expect("decline");

    let for_decliner = db.pending_unassigned(Some(decliner)).await.unwrap();
    let for_other = db.pending_unassigned(Some(other)).await.unwrap();

    assert!(for_decliner.iter().all(|r| r.id != ride_id));
    assert!(for_other.iter().any(|r| r.id == ride_id));
}

#[tokio::test]
#[ignore]
async fn status_guard_rejects_illegal_moves() {
    let db = connect().await;
    let ride_id = seed_ride(&db).await;

    // pending -> ongoing is not a legal move
    let moved = db
        .update_status(ride_id, RideStatus::Ongoing, &[RideStatus::Confirmed])
        .await
        .unwrap();
    assert!(moved.is_none());

    db.accept_ride(ride_id, Uuid::new_v4()).await.unwrap();

    let moved = db
        .update_status(ride_id, RideStatus::Ongoing, &[RideStatus::Confirmed])
        .await
        .unwrap();
    assert!(moved.is_some());
}

#[tokio::test]
#[ignore]
async fn earnings_credit_is_atomic() {
    let db = connect().await;
    let driver = Uuid::new_v4();

    sqlx::query("INSERT INTO users (id, full_name, total_earnings) VALUES ($1, 'Asha Rao', NULL)")
        .bind(driver)
        .execute(db.pool())
        .await
        .unwrap();

    let name = db.increment_driver_earnings(driver, dec!(100)).await.unwrap();
    assert_eq!(name.as_deref(), Some("Asha Rao"));
    db.increment_driver_earnings(driver, dec!(54.50)).await.unwrap();

    let user = db.get_user(driver).await.unwrap().unwrap();
    assert_eq!(user.total_earnings, Some(dec!(154.50)));

    assert!(!db.debit_driver_earnings(driver, dec!(200)).await.unwrap());
    assert!(db.debit_driver_earnings(driver, dec!(154.50)).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn payment_completion_races_have_one_winner() {
    let db = connect().await;
    let ride_id = seed_ride(&db).await;
    let rider = Uuid::new_v4();

    let payment = db
        .insert_payment(ride_id, rider, dec!(80.10), "pending", None, None)
        .await
        .unwrap();

    let first = db.complete_payment(payment.id, Some("pi_race")).await.unwrap();
    let replay = db.complete_payment(payment.id, Some("pi_race")).await.unwrap();

    assert!(first, "first delivery must win the completion");
    assert!(!replay, "replayed delivery must find nothing pending");
}

#[tokio::test]
#[ignore]
async fn replayed_intent_insert_is_a_noop() {
    let db = connect().await;
    let ride_id = seed_ride(&db).await;
    let rider = Uuid::new_v4();
    let intent = format!("pi_{}", Uuid::new_v4().simple());

    let first = db
        .insert_completed_payment(ride_id, rider, dec!(80.10), "card", &intent)
        .await
        .unwrap();
    let replay = db
        .insert_completed_payment(ride_id, rider, dec!(80.10), "card", &intent)
        .await
        .unwrap();

    assert!(first.is_some());
    assert!(replay.is_none(), "second insert of the same intent must not land");

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE payment_intent_id = $1")
            .bind(&intent)
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore]
async fn late_confirmation_cannot_revive_a_cancelled_ride() {
    let db = connect().await;
    let ride_id = seed_ride(&db).await;

    sqlx::query("UPDATE rides SET status = 'cancelled' WHERE id = $1")
        .bind(ride_id)
        .execute(db.pool())
        .await
        .unwrap();

    let settled = db.complete_ride_paid(ride_id).await.unwrap();
    assert!(settled.is_none(), "cancelled ride must refuse settlement");

    let ride = db.get_ride(ride_id).await.unwrap().unwrap();
    assert_eq!(ride.status, "cancelled");
}

#[tokio::test]
#[ignore]
async fn ride_completion_requires_a_recorded_payment() {
    use dispatch_service::location::LocationIndex;
    use dispatch_service::services::RideService;
    use dispatch_service::DispatchError;
    use realtime_hub::BroadcastHub;
    use std::sync::Arc;

    let db = connect().await;
    let ride_id = seed_ride(&db).await;
    let driver = Uuid::new_v4();
    db.accept_ride(ride_id, driver).await.unwrap();

    let service = RideService::new(
        Arc::new(Database::from_pool(db.pool().clone())),
        Arc::new(BroadcastHub::new()),
        Arc::new(LocationIndex::new()),
    );

    let err = service.update_status(ride_id, "completed").await.unwrap_err();
    assert!(matches!(err, DispatchError::Conflict(_)));

    let ride = db.get_ride(ride_id).await.unwrap().unwrap();
    assert_eq!(ride.status, "confirmed", "unpaid ride must stay open");

    let rider = ride.rider_id;
    db.insert_payment(ride_id, rider, dec!(80.10), "completed", Some("cash"), None)
        .await
        .unwrap();

    let completed = service.update_status(ride_id, "completed").await.unwrap();
    assert_eq!(completed.status, RideStatus::Completed);
}
