//! In-memory driver location index and proximity ranking.
//!
//! Location writes are last-write-wins per driver; the index never
//! blocks ride traffic. Durable persistence of the same fix goes
//! through [`crate::database::Database::update_driver_location`] on a
//! separate path.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ride_core::{haversine_km, Coordinates};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct DriverFix {
    pub position: Coordinates,
    pub updated_at: DateTime<Utc>,
}

/// Latest known position per driver.
#[derive(Default)]
pub struct LocationIndex {
    fixes: DashMap<Uuid, DriverFix>,
}

impl LocationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, driver_id: Uuid, position: Coordinates) {
        self.fixes.insert(
            driver_id,
            DriverFix {
                position,
                updated_at: Utc::now(),
            },
        );
    }

    pub fn get(&self, driver_id: Uuid) -> Option<DriverFix> {
        self.fixes.get(&driver_id).map(|f| *f)
    }

    pub fn remove(&self, driver_id: Uuid) {
        self.fixes.remove(&driver_id);
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}

/// Distance from `origin` to each candidate pickup point, filtered to
/// `radius_km` and sorted ascending. Candidates carry their id so the
/// caller can map back to full ride records.
pub fn rank_nearby<T>(
    origin: Coordinates,
    candidates: impl IntoIterator<Item = (T, Coordinates)>,
    radius_km: f64,
) -> Vec<(T, f64)> {
    let mut ranked: Vec<(T, f64)> = candidates
        .into_iter()
        .map(|(id, pickup)| (id, haversine_km(origin, pickup)))
        .filter(|(_, d)| *d <= radius_km)
        .collect();

    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}
