//! Core types for rides
//!
//! All money amounts use exact `Decimal` arithmetic; statuses and ride
//! classes round-trip through the lowercase strings the store persists.

use crate::geo::Coordinates;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Ride lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    /// Created, visible to nearby drivers, no driver assigned
    Pending,
    /// A driver claimed the ride
    Confirmed,
    /// Trip in progress
    Ongoing,
    /// Trip finished (terminal)
    Completed,
    /// Cancelled by the rider (terminal)
    Cancelled,
}

impl RideStatus {
    /// Lowercase form persisted in the store and sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Confirmed => "confirmed",
            RideStatus::Ongoing => "ongoing",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the persisted form
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "pending" => Ok(RideStatus::Pending),
            "confirmed" => Ok(RideStatus::Confirmed),
            "ongoing" => Ok(RideStatus::Ongoing),
            "completed" => Ok(RideStatus::Completed),
            "cancelled" => Ok(RideStatus::Cancelled),
            other => Err(crate::Error::UnknownStatus(other.to_string())),
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status of a ride
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RidePaymentStatus {
    /// Not yet reconciled against a provider event
    Pending,
    /// A verified provider event finalized the payment
    Completed,
}

impl RidePaymentStatus {
    /// Lowercase persisted form
    pub fn as_str(&self) -> &'static str {
        match self {
            RidePaymentStatus::Pending => "pending",
            RidePaymentStatus::Completed => "completed",
        }
    }

    /// Parse the persisted form; anything unknown is treated as pending
    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => RidePaymentStatus::Completed,
            _ => RidePaymentStatus::Pending,
        }
    }
}

/// Ride class (tier), keyed into the fare multiplier table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RideClass {
    /// Base tier, multiplier 1
    Standard,
    /// Multiplier 1.5
    Premium,
    /// Multiplier 2
    #[serde(rename = "XL")]
    Xl,
}

impl RideClass {
    /// Fare multiplier for this class
    pub fn multiplier(&self) -> Decimal {
        match self {
            RideClass::Standard => dec!(1),
            RideClass::Premium => dec!(1.5),
            RideClass::Xl => dec!(2),
        }
    }

    /// Display/persisted form
    pub fn as_str(&self) -> &'static str {
        match self {
            RideClass::Standard => "Standard",
            RideClass::Premium => "Premium",
            RideClass::Xl => "XL",
        }
    }

    /// Parse a class label, case-insensitive. Unknown labels fall back
    /// to `Standard` (multiplier 1): documented policy, not an error.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "premium" => RideClass::Premium,
            "xl" => RideClass::Xl,
            _ => RideClass::Standard,
        }
    }
}

impl fmt::Display for RideClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single trip request from creation to terminal status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    /// Ride ID
    pub id: Uuid,

    /// Rider who requested the trip
    pub rider_id: Uuid,

    /// Assigned driver; `None` exactly while the ride is pending
    pub driver_id: Option<Uuid>,

    /// Pickup label (human-readable address)
    pub pickup: String,

    /// Dropoff label
    pub dropoff: String,

    /// Pickup point
    pub pickup_coords: Coordinates,

    /// Dropoff point
    pub dropoff_coords: Coordinates,

    /// Ride class used for the fare multiplier
    pub ride_class: RideClass,

    /// Fare, fixed at creation
    pub fare: Decimal,

    /// Lifecycle status
    pub status: RideStatus,

    /// Payment status, finalized only by reconciliation
    pub payment_status: RidePaymentStatus,

    /// Drivers who declined this ride; it stays pending for everyone else
    pub declined_by: Vec<Uuid>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Ride {
    /// A ride is claimable while pending and unassigned
    pub fn is_claimable(&self) -> bool {
        self.status == RideStatus::Pending && self.driver_id.is_none()
    }
}

/// Public driver fields broadcast to the ride room on assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverProfile {
    /// Driver user ID
    pub id: Uuid,
    /// Display name
    pub full_name: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Avatar URL
    pub profile_pic: Option<String>,
    /// Vehicle description
    pub vehicle: Option<String>,
    /// Plate number
    pub vehicle_plate: Option<String>,
}
