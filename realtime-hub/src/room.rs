//! Broadcast rooms
//!
//! Two room kinds: one per ride (rider, assigned driver, observers)
//! and one private channel per driver. Membership is transient and
//! tied to connection lifetime.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A named broadcast scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Room {
    /// All parties interested in one ride
    Ride(Uuid),
    /// One driver's private channel
    Driver(Uuid),
}

impl Room {
    /// Wire name for this room
    pub fn name(&self) -> String {
        match self {
            Room::Ride(id) => format!("ride_{}", id),
            Room::Driver(id) => format!("driver_{}", id),
        }
    }

    /// Parse a wire name
    pub fn parse(s: &str) -> crate::Result<Self> {
        if let Some(id) = s.strip_prefix("ride_") {
            let id = Uuid::parse_str(id).map_err(|_| crate::Error::InvalidRoom(s.to_string()))?;
            return Ok(Room::Ride(id));
        }
        if let Some(id) = s.strip_prefix("driver_") {
            let id = Uuid::parse_str(id).map_err(|_| crate::Error::InvalidRoom(s.to_string()))?;
            return Ok(Room::Driver(id));
        }
        Err(crate::Error::InvalidRoom(s.to_string()))
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_names() {
        let id = Uuid::parse_str("0a0b0c0d-0001-4002-8003-000000000042").unwrap();
        assert_eq!(Room::Ride(id).name(), format!("ride_{}", id));
        assert_eq!(Room::Driver(id).name(), format!("driver_{}", id));
    }

    #[test]
    fn test_parse_round_trip() {
        let room = Room::Ride(Uuid::new_v4());
        assert_eq!(Room::parse(&room.name()).unwrap(), room);

        let room = Room::Driver(Uuid::new_v4());
        assert_eq!(Room::parse(&room.name()).unwrap(), room);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Room::parse("lobby").is_err());
        assert!(Room::parse("ride_not-a-uuid").is_err());
        assert!(Room::parse("").is_err());
    }
}
