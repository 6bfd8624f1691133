//! Typed event catalog
//!
//! Every domain event that crosses the socket is a variant here, so
//! the catalog is closed and exhaustively matchable. Wire form is
//! `{"event": <name>, "data": <payload>}` in both directions.

use ride_core::{DriverProfile, Ride, RideStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server → client event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RideEvent {
    /// A ride was created; fanned out to every connection (drivers
    /// self-filter by proximity)
    NewRideRequest(Ride),

    /// Driver moved; scoped to the ride room
    DriverLocationUpdate {
        /// Ride being driven
        ride_id: Uuid,
        /// Moving driver
        driver_id: Uuid,
        /// Latitude
        lat: f64,
        /// Longitude
        lng: f64,
    },

    /// Echo back to the driver's own room
    DriverLocationAck {
        /// Latitude
        lat: f64,
        /// Longitude
        lng: f64,
    },

    /// Lifecycle status changed
    RideStatusUpdate {
        /// Ride
        ride_id: Uuid,
        /// New status
        status: RideStatus,
    },

    /// A driver claimed the ride; carries the public profile
    DriverAssigned {
        /// Ride
        ride_id: Uuid,
        /// Assigned driver's public profile
        driver: Option<DriverProfile>,
    },

    /// Terminal completion notice
    RideCompleted {
        /// Ride
        ride_id: Uuid,
    },

    /// Terminal cancellation notice
    RideCancelled {
        /// Ride
        ride_id: Uuid,
    },

    /// Full ride record changed in a way not covered above
    RideUpdated(Ride),
}

impl RideEvent {
    /// Wire name of this event
    pub fn name(&self) -> &'static str {
        match self {
            RideEvent::NewRideRequest(_) => "new_ride_request",
            RideEvent::DriverLocationUpdate { .. } => "driver_location_update",
            RideEvent::DriverLocationAck { .. } => "driver_location_ack",
            RideEvent::RideStatusUpdate { .. } => "ride_status_update",
            RideEvent::DriverAssigned { .. } => "driver_assigned",
            RideEvent::RideCompleted { .. } => "ride_completed",
            RideEvent::RideCancelled { .. } => "ride_cancelled",
            RideEvent::RideUpdated(_) => "ride_updated",
        }
    }
}

/// Client → server command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Subscribe the connection to a driver's private room
    JoinDriver {
        /// Driver ID
        driver_id: Uuid,
    },

    /// Subscribe the connection to a ride room
    JoinRide {
        /// Ride ID
        ride_id: Uuid,
    },

    /// Streamed driver position; relayed to the ride room when a ride
    /// is attached, always acked to the driver room
    DriverLocation {
        /// Ride being driven, if any
        #[serde(default)]
        ride_id: Option<Uuid>,
        /// Moving driver
        driver_id: Uuid,
        /// Latitude
        lat: f64,
        /// Longitude
        lng: f64,
    },

    /// Client-relayed status notice for a ride room
    UpdateRideStatus {
        /// Ride
        ride_id: Uuid,
        /// New status
        status: RideStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_names_match_serialized_tag() {
        let id = Uuid::new_v4();
        let events = [
            RideEvent::DriverLocationUpdate {
                ride_id: id,
                driver_id: id,
                lat: 1.0,
                lng: 2.0,
            },
            RideEvent::DriverLocationAck { lat: 1.0, lng: 2.0 },
            RideEvent::RideStatusUpdate {
                ride_id: id,
                status: RideStatus::Confirmed,
            },
            RideEvent::DriverAssigned {
                ride_id: id,
                driver: None,
            },
            RideEvent::RideCompleted { ride_id: id },
            RideEvent::RideCancelled { ride_id: id },
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name(), "tag mismatch for {:?}", event);
        }
    }

    #[test]
    fn test_status_update_payload_shape() {
        let ride_id = Uuid::new_v4();
        let event = RideEvent::RideStatusUpdate {
            ride_id,
            status: RideStatus::Ongoing,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "ride_status_update",
                "data": { "ride_id": ride_id, "status": "ongoing" }
            })
        );
    }

    #[test]
    fn test_client_command_parsing() {
        let driver_id = Uuid::new_v4();
        let raw = json!({
            "event": "join_driver",
            "data": { "driver_id": driver_id }
        });
        let cmd: ClientCommand = serde_json::from_value(raw).unwrap();
        match cmd {
            ClientCommand::JoinDriver { driver_id: id } => assert_eq!(id, driver_id),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_driver_location_ride_optional() {
        let driver_id = Uuid::new_v4();
        let raw = json!({
            "event": "driver_location",
            "data": { "driver_id": driver_id, "lat": 12.9, "lng": 77.6 }
        });
        let cmd: ClientCommand = serde_json::from_value(raw).unwrap();
        match cmd {
            ClientCommand::DriverLocation { ride_id, .. } => assert!(ride_id.is_none()),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
