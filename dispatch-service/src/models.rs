use chrono::{DateTime, Utc};
use ride_core::{Coordinates, DriverProfile, Ride, RideClass, RidePaymentStatus, RideStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Ride row as persisted: flat coordinates, textual enums
#[derive(Debug, Clone, FromRow)]
pub struct RideRow {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub pickup: String,
    pub dropoff: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub ride_type: String,
    pub fare: Decimal,
    pub status: String,
    pub payment_status: String,
    pub declined_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<RideRow> for Ride {
    type Error = ride_core::Error;

    fn try_from(row: RideRow) -> Result<Self, Self::Error> {
        Ok(Ride {
            id: row.id,
            rider_id: row.rider_id,
            driver_id: row.driver_id,
            pickup: row.pickup,
            dropoff: row.dropoff,
            pickup_coords: Coordinates {
                lat: row.pickup_lat,
                lng: row.pickup_lng,
            },
            dropoff_coords: Coordinates {
                lat: row.dropoff_lat,
                lng: row.dropoff_lng,
            },
            ride_class: RideClass::parse(&row.ride_type),
            fare: row.fare,
            status: RideStatus::parse(&row.status)?,
            payment_status: RidePaymentStatus::parse(&row.payment_status),
            declined_by: row.declined_by,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub rider_id: Uuid,
    pub amount: Decimal,
    pub status: String,
    pub payment_method: Option<String>,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserRow {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub profile_pic: Option<String>,
    pub vehicle: Option<String>,
    pub vehicle_plate: Option<String>,
    pub stripe_account_id: Option<String>,
    pub total_earnings: Option<Decimal>,
}

impl From<UserRow> for DriverProfile {
    fn from(row: UserRow) -> Self {
        DriverProfile {
            id: row.id,
            full_name: row.full_name,
            phone: row.phone,
            profile_pic: row.profile_pic,
            vehicle: row.vehicle,
            vehicle_plate: row.vehicle_plate,
        }
    }
}

// ---- Request DTOs ----

#[derive(Debug, Deserialize, Serialize, validator::Validate)]
pub struct CreateRideRequest {
    pub rider_id: Uuid,
    #[validate(length(min = 1, max = 256))]
    pub pickup: String,
    #[validate(length(min = 1, max = 256))]
    pub dropoff: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub ride_type: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AcceptRideRequest {
    pub driver_id: Uuid,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeclineRideRequest {
    pub driver_id: Uuid,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StatusUpdateRequest {
    /// Caller-facing names: `in_progress` or `completed`
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub driver_lat: Option<f64>,
    pub driver_lng: Option<f64>,
    pub driver_id: Option<Uuid>,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Uuid,
    pub role: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LocationUpdateRequest {
    pub lat: f64,
    pub lng: f64,
    pub ride_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Serialize, validator::Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 128))]
    pub full_name: Option<String>,
    #[validate(length(min = 4, max = 24))]
    pub phone: Option<String>,
    pub profile_pic: Option<String>,
    pub vehicle: Option<String>,
    pub vehicle_plate: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, validator::Validate)]
pub struct PaymentIntentRequest {
    pub ride_id: Uuid,
    pub rider_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RecordPaymentRequest {
    pub ride_id: Uuid,
    pub rider_id: Uuid,
    pub amount: Decimal,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PayoutRequest {
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Serialize, validator::Validate)]
pub struct CreateReviewRequest {
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub rider_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    pub review: Option<String>,
}

// ---- Response DTOs ----

#[derive(Debug, Serialize)]
pub struct RideWithDriver {
    #[serde(flatten)]
    pub ride: Ride,
    pub driver: Option<DriverProfile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NearbyRide {
    #[serde(flatten)]
    pub ride: Ride,
    pub distance_km: f64,
}

#[derive(Debug, Serialize)]
pub struct ClientSecretResponse {
    pub client_secret: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectStripeResponse {
    pub url: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PayoutResponse {
    pub message: String,
    pub transfer_id: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewRow {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub rider_id: Uuid,
    pub rating: i32,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DriverReviews {
    pub average_rating: Option<Decimal>,
    pub reviews: Vec<ReviewRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_row() -> RideRow {
        RideRow {
            id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            driver_id: None,
            pickup: "MG Road".into(),
            dropoff: "HSR Layout".into(),
            pickup_lat: 12.9716,
            pickup_lng: 77.5946,
            dropoff_lat: 12.9121,
            dropoff_lng: 77.6446,
            ride_type: "Premium".into(),
            fare: dec!(154.50),
            status: "pending".into(),
            payment_status: "pending".into(),
            declined_by: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_to_domain_conversion() {
        let row = sample_row();
        let ride = Ride::try_from(row.clone()).unwrap();
        assert_eq!(ride.status, RideStatus::Pending);
        assert_eq!(ride.ride_class, RideClass::Premium);
        assert_eq!(ride.pickup_coords.lat, row.pickup_lat);
        assert!(ride.is_claimable());
    }

    #[test]
    fn test_row_with_unknown_status_fails() {
        let mut row = sample_row();
        row.status = "vanished".into();
        assert!(Ride::try_from(row).is_err());
    }

    #[test]
    fn test_unknown_ride_type_is_standard() {
        let mut row = sample_row();
        row.ride_type = "Hyperloop".into();
        let ride = Ride::try_from(row).unwrap();
        assert_eq!(ride.ride_class, RideClass::Standard);
    }
}
