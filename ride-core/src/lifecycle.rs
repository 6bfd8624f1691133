//! Ride lifecycle state machine
//!
//! `pending → confirmed → ongoing → completed`, with `cancelled`
//! reachable from `pending` or `confirmed`. Declining is not a
//! transition: it records the driver in `declined_by` and leaves the
//! ride pending for everyone else.
//!
//! These guards are pure. The store layer enforces the same conditions
//! as single conditional updates, which is what actually serializes
//! concurrent attempts; the guards exist so illegal requests are
//! rejected before a round trip and so the table is testable.

use crate::types::RideStatus;
use uuid::Uuid;

/// A requested change to a ride's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Driver claims a pending, unassigned ride
    Accept {
        /// Claiming driver
        driver_id: Uuid,
    },
    /// Driver hides a pending ride from their own feed
    Decline {
        /// Declining driver
        driver_id: Uuid,
    },
    /// Trip begins (confirmed → ongoing)
    Start,
    /// Trip finishes
    Complete,
    /// Rider cancels before the trip starts
    Cancel,
}

impl LifecycleAction {
    /// Name used in error reporting
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleAction::Accept { .. } => "accept",
            LifecycleAction::Decline { .. } => "decline",
            LifecycleAction::Start => "start",
            LifecycleAction::Complete => "complete",
            LifecycleAction::Cancel => "cancel",
        }
    }
}

/// Compute the status a legal action leads to.
///
/// `Decline` is accepted from `pending` but yields `pending` again;
/// the visible effect is on `declined_by`, not on status.
pub fn next_status(current: RideStatus, action: LifecycleAction) -> crate::Result<RideStatus> {
    use LifecycleAction::*;
    use RideStatus::*;

    let next = match (current, action) {
        (Pending, Accept { .. }) => Confirmed,
        (Pending, Decline { .. }) => Pending,
        (Confirmed, Start) => Ongoing,
        // A ride can be completed straight from confirmed (e.g. payment
        // reconciliation landing before the driver flips to ongoing).
        (Ongoing, Complete) | (Confirmed, Complete) => Completed,
        (Pending, Cancel) | (Confirmed, Cancel) => Cancelled,
        (from, action) => {
            return Err(crate::Error::InvalidTransition {
                from,
                action: action.name(),
            })
        }
    };
    Ok(next)
}

/// Record a decline. Returns `true` if the set changed; appending a
/// driver already present is a no-op.
pub fn note_decline(declined_by: &mut Vec<Uuid>, driver_id: Uuid) -> bool {
    if declined_by.contains(&driver_id) {
        return false;
    }
    declined_by.push(driver_id);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept() -> LifecycleAction {
        LifecycleAction::Accept {
            driver_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_happy_path() {
        let s = next_status(RideStatus::Pending, accept()).unwrap();
        assert_eq!(s, RideStatus::Confirmed);
        let s = next_status(s, LifecycleAction::Start).unwrap();
        assert_eq!(s, RideStatus::Ongoing);
        let s = next_status(s, LifecycleAction::Complete).unwrap();
        assert_eq!(s, RideStatus::Completed);
    }

    #[test]
    fn test_complete_from_confirmed() {
        let s = next_status(RideStatus::Confirmed, LifecycleAction::Complete).unwrap();
        assert_eq!(s, RideStatus::Completed);
    }

    #[test]
    fn test_cancel_only_before_trip_starts() {
        assert_eq!(
            next_status(RideStatus::Pending, LifecycleAction::Cancel).unwrap(),
            RideStatus::Cancelled
        );
        assert_eq!(
            next_status(RideStatus::Confirmed, LifecycleAction::Cancel).unwrap(),
            RideStatus::Cancelled
        );
        assert!(next_status(RideStatus::Ongoing, LifecycleAction::Cancel).is_err());
        assert!(next_status(RideStatus::Completed, LifecycleAction::Cancel).is_err());
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for terminal in [RideStatus::Completed, RideStatus::Cancelled] {
            assert!(next_status(terminal, accept()).is_err());
            assert!(next_status(terminal, LifecycleAction::Start).is_err());
            assert!(next_status(terminal, LifecycleAction::Complete).is_err());
            assert!(next_status(terminal, LifecycleAction::Cancel).is_err());
        }
    }

    #[test]
    fn test_accept_requires_pending() {
        assert!(next_status(RideStatus::Confirmed, accept()).is_err());
        assert!(next_status(RideStatus::Ongoing, accept()).is_err());
    }

    #[test]
    fn test_decline_keeps_ride_pending() {
        let driver = Uuid::new_v4();
        let s = next_status(
            RideStatus::Pending,
            LifecycleAction::Decline { driver_id: driver },
        )
        .unwrap();
        assert_eq!(s, RideStatus::Pending);
    }

    #[test]
    fn test_decline_is_idempotent() {
        let driver = Uuid::new_v4();
        let mut declined = Vec::new();
        assert!(note_decline(&mut declined, driver));
        assert!(!note_decline(&mut declined, driver));
        assert_eq!(declined.len(), 1);

        let other = Uuid::new_v4();
        assert!(note_decline(&mut declined, other));
        assert_eq!(declined, vec![driver, other]);
    }
}
