//! Postgres store access
//!
//! Every lifecycle write is a single conditional statement so that
//! concurrent requests (or multiple service instances) serialize in
//! the database, never through in-process locking. A conditional
//! update that matches zero rows is how the caller observes a lost
//! race or an illegal transition.

use crate::errors::Result;
use crate::models::{PaymentRow, ReviewRow, RideRow, UserRow};
use chrono::Utc;
use ride_core::RideStatus;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::time::Duration;
use uuid::Uuid;

pub struct Database {
    pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Database { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ---- Rides ----

    #[allow(clippy::too_many_arguments)]
    pub async fn create_ride(
        &self,
        rider_id: Uuid,
        pickup: &str,
        dropoff: &str,
        pickup_lat: f64,
        pickup_lng: f64,
        dropoff_lat: f64,
        dropoff_lng: f64,
        ride_type: &str,
        fare: Decimal,
    ) -> Result<RideRow> {
        let ride = sqlx::query_as::<_, RideRow>(
            r#"
            INSERT INTO rides
                (id, rider_id, pickup, dropoff, pickup_lat, pickup_lng,
                 dropoff_lat, dropoff_lng, ride_type, fare, status,
                 payment_status, declined_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    'pending', 'pending', '{}', $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(rider_id)
        .bind(pickup)
        .bind(dropoff)
        .bind(pickup_lat)
        .bind(pickup_lng)
        .bind(dropoff_lat)
        .bind(dropoff_lng)
        .bind(ride_type)
        .bind(fare)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(ride)
    }

    pub async fn get_ride(&self, ride_id: Uuid) -> Result<Option<RideRow>> {
        let ride = sqlx::query_as::<_, RideRow>("SELECT * FROM rides WHERE id = $1")
            .bind(ride_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ride)
    }

    pub async fn rides_for_rider(&self, rider_id: Uuid) -> Result<Vec<RideRow>> {
        let rides = sqlx::query_as::<_, RideRow>(
            "SELECT * FROM rides WHERE rider_id = $1 ORDER BY created_at DESC",
        )
        .bind(rider_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rides)
    }

    /// Pending, unassigned rides, minus those the requesting driver
    /// already declined. Distance filtering happens in the caller.
    pub async fn pending_unassigned(&self, excluding_driver: Option<Uuid>) -> Result<Vec<RideRow>> {
        let rides = sqlx::query_as::<_, RideRow>(
            r#"
            SELECT * FROM rides
            WHERE status = 'pending'
              AND driver_id IS NULL
              AND ($1::uuid IS NULL OR NOT (declined_by @> ARRAY[$1]))
            "#,
        )
        .bind(excluding_driver)
        .fetch_all(&self.pool)
        .await?;

        Ok(rides)
    }

    /// Atomic claim. Matches only while the ride is still pending and
    /// unassigned; `None` means another driver won the race.
    pub async fn accept_ride(&self, ride_id: Uuid, driver_id: Uuid) -> Result<Option<RideRow>> {
        let ride = sqlx::query_as::<_, RideRow>(
            r#"
            UPDATE rides
            SET driver_id = $1, status = 'confirmed'
            WHERE id = $2 AND status = 'pending' AND driver_id IS NULL
            RETURNING *
            "#,
        )
        .bind(driver_id)
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ride)
    }

    /// Idempotent decline append. `None` when the guard did not match:
    /// ride missing, not pending, or this driver already declined.
    pub async fn try_decline(&self, ride_id: Uuid, driver_id: Uuid) -> Result<Option<RideRow>> {
        let ride = sqlx::query_as::<_, RideRow>(
            r#"
            UPDATE rides
            SET declined_by = array_append(declined_by, $1)
            WHERE id = $2 AND status = 'pending' AND NOT (declined_by @> ARRAY[$1])
            RETURNING *
            "#,
        )
        .bind(driver_id)
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ride)
    }

    /// Guarded status move. `allowed_from` mirrors the lifecycle table;
    /// zero rows matched means the ride moved underneath the caller.
    pub async fn update_status(
        &self,
        ride_id: Uuid,
        new_status: RideStatus,
        allowed_from: &[RideStatus],
    ) -> Result<Option<RideRow>> {
        let from: Vec<String> = allowed_from.iter().map(|s| s.as_str().to_string()).collect();

        let ride = sqlx::query_as::<_, RideRow>(
            r#"
            UPDATE rides
            SET status = $1
            WHERE id = $2 AND status = ANY($3)
            RETURNING *
            "#,
        )
        .bind(new_status.as_str())
        .bind(ride_id)
        .bind(&from)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ride)
    }

    pub async fn mark_ride_paid(&self, ride_id: Uuid) -> Result<Option<RideRow>> {
        let ride = sqlx::query_as::<_, RideRow>(
            r#"
            UPDATE rides
            SET payment_status = 'completed'
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ride)
    }

    /// Reconciliation write: one statement moves both status fields.
    /// Cancelled rides stay cancelled no matter how late the payment
    /// confirmation arrives.
    pub async fn complete_ride_paid(&self, ride_id: Uuid) -> Result<Option<RideRow>> {
        let ride = sqlx::query_as::<_, RideRow>(
            r#"
            UPDATE rides
            SET status = 'completed', payment_status = 'completed'
            WHERE id = $1 AND status <> 'cancelled'
            RETURNING *
            "#,
        )
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ride)
    }

    pub async fn ride_history(&self, user_id: Uuid, role: &str) -> Result<Vec<RideRow>> {
        let column = if role == "driver" {
            "driver_id"
        } else {
            "rider_id"
        };

        let query = format!(
            "SELECT * FROM rides WHERE {} = $1 ORDER BY created_at DESC LIMIT 100",
            column
        );

        let rides = sqlx::query_as::<_, RideRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rides)
    }

    // ---- Payments ----

    pub async fn find_pending_payment(
        &self,
        ride_id: Uuid,
        rider_id: Uuid,
    ) -> Result<Option<PaymentRow>> {
        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT * FROM payments
            WHERE ride_id = $1 AND rider_id = $2 AND status = 'pending'
            LIMIT 1
            "#,
        )
        .bind(ride_id)
        .bind(rider_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Idempotency probe for webhook replays.
    pub async fn find_completed_payment_by_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<PaymentRow>> {
        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT * FROM payments
            WHERE payment_intent_id = $1 AND status = 'completed'
            LIMIT 1
            "#,
        )
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn completed_payment_for_ride(&self, ride_id: Uuid) -> Result<Option<PaymentRow>> {
        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT * FROM payments
            WHERE ride_id = $1 AND status = 'completed'
            LIMIT 1
            "#,
        )
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn insert_payment(
        &self,
        ride_id: Uuid,
        rider_id: Uuid,
        amount: Decimal,
        status: &str,
        payment_method: Option<&str>,
        payment_intent_id: Option<&str>,
    ) -> Result<PaymentRow> {
        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO payments
                (id, ride_id, rider_id, amount, status, payment_method,
                 payment_intent_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(ride_id)
        .bind(rider_id)
        .bind(amount)
        .bind(status)
        .bind(payment_method)
        .bind(payment_intent_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Conditional completion keyed on the pending state; `false`
    /// means a concurrent delivery already completed this payment.
    pub async fn complete_payment(
        &self,
        payment_id: Uuid,
        payment_intent_id: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'completed',
                payment_intent_id = COALESCE($1, payment_intent_id)
            WHERE id = $2 AND status = 'pending'
            "#,
        )
        .bind(payment_intent_id)
        .bind(payment_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert path for intents that never had a pending row. The
    /// partial unique index on completed intents turns a replay into
    /// a no-op insert, signalled by `None`.
    pub async fn insert_completed_payment(
        &self,
        ride_id: Uuid,
        rider_id: Uuid,
        amount: Decimal,
        payment_method: &str,
        payment_intent_id: &str,
    ) -> Result<Option<PaymentRow>> {
        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO payments
                (id, ride_id, rider_id, amount, status, payment_method,
                 payment_intent_id, created_at)
            VALUES ($1, $2, $3, $4, 'completed', $5, $6, $7)
            ON CONFLICT (payment_intent_id) WHERE status = 'completed' DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(ride_id)
        .bind(rider_id)
        .bind(amount)
        .bind(payment_method)
        .bind(payment_intent_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn set_payment_intent(&self, payment_id: Uuid, payment_intent_id: &str) -> Result<()> {
        sqlx::query("UPDATE payments SET payment_intent_id = $1 WHERE id = $2")
            .bind(payment_intent_id)
            .bind(payment_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ---- Users / drivers ----

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, full_name, phone, profile_pic, vehicle, vehicle_plate,
                   stripe_account_id, total_earnings
            FROM users WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Partial profile update; absent fields keep their value.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        full_name: Option<&str>,
        phone: Option<&str>,
        profile_pic: Option<&str>,
        vehicle: Option<&str>,
        vehicle_plate: Option<&str>,
    ) -> Result<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET full_name = COALESCE($1, full_name),
                phone = COALESCE($2, phone),
                profile_pic = COALESCE($3, profile_pic),
                vehicle = COALESCE($4, vehicle),
                vehicle_plate = COALESCE($5, vehicle_plate)
            WHERE id = $6
            RETURNING id, full_name, phone, profile_pic, vehicle, vehicle_plate,
                      stripe_account_id, total_earnings
            "#,
        )
        .bind(full_name)
        .bind(phone)
        .bind(profile_pic)
        .bind(vehicle)
        .bind(vehicle_plate)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn update_driver_location(&self, driver_id: Uuid, lat: f64, lng: f64) -> Result<()> {
        sqlx::query("UPDATE users SET lat = $1, lng = $2, updated_at = $3 WHERE id = $4")
            .bind(lat)
            .bind(lng)
            .bind(Utc::now())
            .bind(driver_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Atomic earnings credit; survives concurrent completions without
    /// read-modify-write. Hands back the driver's display name so
    /// settlement does not need a second lookup for the receipt.
    pub async fn increment_driver_earnings(
        &self,
        driver_id: Uuid,
        amount: Decimal,
    ) -> Result<Option<String>> {
        let name = sqlx::query_scalar::<_, Option<String>>(
            r#"
            UPDATE users
            SET total_earnings = COALESCE(total_earnings, 0) + $1
            WHERE id = $2
            RETURNING full_name
            "#,
        )
        .bind(amount)
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(name.flatten())
    }

    /// Guarded debit for payouts; `false` means insufficient balance.
    pub async fn debit_driver_earnings(&self, driver_id: Uuid, amount: Decimal) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET total_earnings = total_earnings - $1
            WHERE id = $2 AND COALESCE(total_earnings, 0) >= $1
            "#,
        )
        .bind(amount)
        .bind(driver_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_stripe_account(&self, driver_id: Uuid, account_id: &str) -> Result<()> {
        sqlx::query("UPDATE users SET stripe_account_id = $1 WHERE id = $2")
            .bind(account_id)
            .bind(driver_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ---- Reviews ----

    pub async fn upsert_review(
        &self,
        ride_id: Uuid,
        driver_id: Uuid,
        rider_id: Uuid,
        rating: i32,
        review: Option<&str>,
    ) -> Result<ReviewRow> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            INSERT INTO ride_reviews
                (id, ride_id, driver_id, rider_id, rating, review, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (ride_id, rider_id)
            DO UPDATE SET rating = $5, review = $6
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(ride_id)
        .bind(driver_id)
        .bind(rider_id)
        .bind(rating)
        .bind(review)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn driver_reviews(&self, driver_id: Uuid) -> Result<Vec<ReviewRow>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT * FROM ride_reviews
            WHERE driver_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
