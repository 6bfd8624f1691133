//! Room membership and fan-out
//!
//! The hub owns two per-key tables: connection → outbound channel, and
//! room → member set. Both are dashmaps mutated by many connection
//! handlers concurrently; every operation touches a single key, so no
//! global lock exists.
//!
//! Delivery contract: at-most-once per connected client, no replay.
//! Events for one room are serialized once and pushed through each
//! member's FIFO channel, so per-room order matches emission order for
//! every subscriber. A send to a closed channel means the client went
//! away; the connection is pruned and the event is dropped for it.

use crate::event::RideEvent;
use crate::room::Room;
use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Opaque handle for one live socket connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Messages delivered to a connection, already serialized
pub type OutboundReceiver = mpsc::UnboundedReceiver<String>;

/// Realtime broadcast hub
#[derive(Debug, Default)]
pub struct BroadcastHub {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<String>>,
    rooms: DashMap<Room, HashSet<ConnectionId>>,
}

impl BroadcastHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and hand back its outbound stream
    pub fn register(&self) -> (ConnectionId, OutboundReceiver) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(id, tx);
        debug!("connection {} registered", id);
        (id, rx)
    }

    /// Subscribe a connection to a room. Joining twice is a no-op.
    pub fn join(&self, conn: ConnectionId, room: Room) {
        self.rooms.entry(room).or_default().insert(conn);
        debug!("connection {} joined {}", conn, room);
    }

    /// Unsubscribe a connection from a room
    pub fn leave(&self, conn: ConnectionId, room: Room) {
        if let Some(mut members) = self.rooms.get_mut(&room) {
            members.remove(&conn);
        }
    }

    /// Drop a connection and leave every room it was in
    pub fn disconnect(&self, conn: ConnectionId) {
        self.connections.remove(&conn);
        for mut entry in self.rooms.iter_mut() {
            entry.value_mut().remove(&conn);
        }
        debug!("connection {} disconnected", conn);
    }

    /// Number of live members in a room
    pub fn room_size(&self, room: Room) -> usize {
        self.rooms.get(&room).map(|m| m.len()).unwrap_or(0)
    }

    /// Fan an event out to one room. Best-effort: gone connections are
    /// pruned from the membership set, never reported to the emitter.
    pub fn emit_to_room(&self, room: Room, event: &RideEvent) -> crate::Result<()> {
        let wire = serde_json::to_string(event)?;
        let Some(members) = self.rooms.get(&room) else {
            return Ok(());
        };

        let mut gone = Vec::new();
        for conn in members.iter() {
            if !self.send_to(*conn, &wire) {
                gone.push(*conn);
            }
        }
        drop(members);

        for conn in gone {
            self.disconnect(conn);
        }

        debug!("emitted {} to {}", event.name(), room);
        Ok(())
    }

    /// Fan an event out to every connection. Used only for
    /// `new_ride_request`, where candidate drivers are unknown at
    /// emission time.
    pub fn emit_to_all(&self, event: &RideEvent) -> crate::Result<()> {
        let wire = serde_json::to_string(event)?;
        let mut gone = Vec::new();
        for entry in self.connections.iter() {
            if entry.value().send(wire.clone()).is_err() {
                gone.push(*entry.key());
            }
        }
        for conn in gone {
            self.disconnect(conn);
        }

        debug!(
            "emitted {} to all ({} connections)",
            event.name(),
            self.connections.len()
        );
        Ok(())
    }

    fn send_to(&self, conn: ConnectionId, wire: &str) -> bool {
        match self.connections.get(&conn) {
            Some(tx) => tx.send(wire.to_string()).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ride_core::{Coordinates, Ride, RideClass, RidePaymentStatus, RideStatus};
    use rust_decimal_macros::dec;

    fn sample_ride() -> Ride {
        Ride {
            id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            driver_id: None,
            pickup: "MG Road".into(),
            dropoff: "Koramangala".into(),
            pickup_coords: Coordinates {
                lat: 12.9716,
                lng: 77.5946,
            },
            dropoff_coords: Coordinates {
                lat: 12.9352,
                lng: 77.6146,
            },
            ride_class: RideClass::Standard,
            fare: dec!(80.10),
            status: RideStatus::Pending,
            payment_status: RidePaymentStatus::Pending,
            declined_by: vec![],
            created_at: Utc::now(),
        }
    }

    fn location_event(ride_id: Uuid) -> RideEvent {
        RideEvent::DriverLocationUpdate {
            ride_id,
            driver_id: Uuid::new_v4(),
            lat: 12.97,
            lng: 77.59,
        }
    }

    #[tokio::test]
    async fn test_room_fanout_hits_all_and_only_members() {
        let hub = BroadcastHub::new();
        let ride_id = Uuid::new_v4();
        let room = Room::Ride(ride_id);

        let (a, mut rx_a) = hub.register();
        let (b, mut rx_b) = hub.register();
        let (_c, mut rx_c) = hub.register();

        hub.join(a, room);
        hub.join(b, room);
        // c never joins

        hub.emit_to_room(room, &location_event(ride_id)).unwrap();

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_per_room_order_matches_emission_order() {
        let hub = BroadcastHub::new();
        let ride_id = Uuid::new_v4();
        let room = Room::Ride(ride_id);
        let (conn, mut rx) = hub.register();
        hub.join(conn, room);

        for status in [
            RideStatus::Confirmed,
            RideStatus::Ongoing,
            RideStatus::Completed,
        ] {
            hub.emit_to_room(room, &RideEvent::RideStatusUpdate { ride_id, status })
                .unwrap();
        }

        for expected in ["confirmed", "ongoing", "completed"] {
            let wire = rx.try_recv().unwrap();
            let value: serde_json::Value = serde_json::from_str(&wire).unwrap();
            assert_eq!(value["data"]["status"], expected);
        }
    }

    #[tokio::test]
    async fn test_emit_to_all_reaches_unjoined_connections() {
        let hub = BroadcastHub::new();
        let (_a, mut rx_a) = hub.register();
        let (_b, mut rx_b) = hub.register();

        hub.emit_to_all(&RideEvent::NewRideRequest(sample_ride()))
            .unwrap();

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_leaves_every_room() {
        let hub = BroadcastHub::new();
        let ride_id = Uuid::new_v4();
        let driver_id = Uuid::new_v4();
        let (conn, rx) = hub.register();
        hub.join(conn, Room::Ride(ride_id));
        hub.join(conn, Room::Driver(driver_id));
        drop(rx);

        hub.disconnect(conn);

        assert_eq!(hub.room_size(Room::Ride(ride_id)), 0);
        assert_eq!(hub.room_size(Room::Driver(driver_id)), 0);
        // Emitting afterwards is a quiet no-op
        hub.emit_to_room(Room::Ride(ride_id), &location_event(ride_id))
            .unwrap();
    }

    #[tokio::test]
    async fn test_dead_receiver_is_pruned_not_fatal() {
        let hub = BroadcastHub::new();
        let ride_id = Uuid::new_v4();
        let room = Room::Ride(ride_id);

        let (dead, rx_dead) = hub.register();
        let (live, mut rx_live) = hub.register();
        hub.join(dead, room);
        hub.join(live, room);
        drop(rx_dead);

        hub.emit_to_room(room, &location_event(ride_id)).unwrap();

        assert!(rx_live.try_recv().is_ok());
        assert_eq!(hub.room_size(room), 1);
    }

    #[tokio::test]
    async fn test_join_twice_delivers_once() {
        let hub = BroadcastHub::new();
        let ride_id = Uuid::new_v4();
        let room = Room::Ride(ride_id);
        let (conn, mut rx) = hub.register();
        hub.join(conn, room);
        hub.join(conn, room);

        hub.emit_to_room(room, &location_event(ride_id)).unwrap();

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
