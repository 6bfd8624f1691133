//! Ride orchestration.
//!
//! Handlers stay thin; every lifecycle decision funnels through
//! [`RideService`], which pairs the conditional database writes with
//! the matching room broadcasts. Broadcasts are best-effort: a failed
//! emit is logged and the committed write stands.

use crate::database::Database;
use crate::errors::{DispatchError, Result};
use crate::location::{rank_nearby, LocationIndex};
use crate::models::{
    CreateRideRequest, DriverReviews, HistoryQuery, NearbyQuery, NearbyRide, RideRow,
    RideWithDriver,
};
use realtime_hub::{BroadcastHub, RideEvent, Room};
use ride_core::{haversine_km, quote, Coordinates, DriverProfile, Ride, RideClass, RideStatus};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Default proximity radius when the caller does not send one.
const DEFAULT_RADIUS_KM: f64 = 10.0;

pub struct RideService {
    db: Arc<Database>,
    hub: Arc<BroadcastHub>,
    locations: Arc<LocationIndex>,
}

impl RideService {
    pub fn new(db: Arc<Database>, hub: Arc<BroadcastHub>, locations: Arc<LocationIndex>) -> Self {
        Self { db, hub, locations }
    }

    /// Create a pending ride and announce it to every connection.
    pub async fn create_ride(&self, req: CreateRideRequest) -> Result<Ride> {
        let pickup = Coordinates::new(req.pickup_lat, req.pickup_lng)?;
        let dropoff = Coordinates::new(req.dropoff_lat, req.dropoff_lng)?;

        let class = req
            .ride_type
            .as_deref()
            .map(RideClass::parse)
            .unwrap_or(RideClass::Standard);

        let distance_km = haversine_km(pickup, dropoff);
        let fare = quote(distance_km, class)?;

        let row = self
            .db
            .create_ride(
                req.rider_id,
                &req.pickup,
                &req.dropoff,
                pickup.lat,
                pickup.lng,
                dropoff.lat,
                dropoff.lng,
                class.as_str(),
                fare,
            )
            .await?;

        let ride: Ride = row.try_into()?;

        info!(ride_id = %ride.id, rider_id = %ride.rider_id, %fare, "ride created");
        self.emit_all(&RideEvent::NewRideRequest(ride.clone()));

        Ok(ride)
    }

    pub async fn get_ride(&self, ride_id: Uuid) -> Result<RideWithDriver> {
        let row = self
            .db
            .get_ride(ride_id)
            .await?
            .ok_or(DispatchError::NotFound("ride"))?;

        self.with_driver(row).await
    }

    pub async fn rides_for_rider(&self, rider_id: Uuid) -> Result<Vec<Ride>> {
        let rows = self.db.rides_for_rider(rider_id).await?;
        rows.into_iter()
            .map(|r| r.try_into().map_err(DispatchError::from))
            .collect()
    }

    /// Claimable rides near a driver, closest first.
    pub async fn nearby_rides(&self, query: NearbyQuery) -> Result<Vec<NearbyRide>> {
        let origin = match (query.driver_lat, query.driver_lng) {
            // A malformed origin matches nothing rather than erroring
            (Some(lat), Some(lng)) => match Coordinates::new(lat, lng) {
                Ok(origin) => origin,
                Err(_) => return Ok(Vec::new()),
            },
            _ => {
                // Fall back to the live index when coordinates are absent
                let driver_id = query.driver_id.ok_or_else(|| {
                    DispatchError::Validation(
                        "driver coordinates or driver_id required".into(),
                    )
                })?;
                self.locations
                    .get(driver_id)
                    .ok_or_else(|| {
                        DispatchError::Validation("no known location for driver".into())
                    })?
                    .position
            }
        };

        let radius = query.radius_km.unwrap_or(DEFAULT_RADIUS_KM);
        let rows = self.db.pending_unassigned(query.driver_id).await?;

        let mut rides = Vec::with_capacity(rows.len());
        for row in rows {
            let ride: Ride = row.try_into()?;
            rides.push(ride);
        }

        let candidates = rides
            .into_iter()
            .map(|ride| {
                let pickup = ride.pickup_coords;
                (ride, pickup)
            })
            .collect::<Vec<_>>();

        let ranked = rank_nearby(origin, candidates, radius);

        Ok(ranked
            .into_iter()
            .map(|(ride, distance_km)| NearbyRide { ride, distance_km })
            .collect())
    }

    /// Atomic accept. Exactly one driver wins; the rest get a conflict.
    pub async fn accept_ride(&self, ride_id: Uuid, driver_id: Uuid) -> Result<RideWithDriver> {
        let Some(row) = self.db.accept_ride(ride_id, driver_id).await? else {
            // Distinguish a lost race from a missing ride
            return match self.db.get_ride(ride_id).await? {
                Some(_) => Err(DispatchError::Conflict("ride already accepted".into())),
                None => Err(DispatchError::NotFound("ride")),
            };
        };

        let result = self.with_driver(row).await?;

        info!(%ride_id, %driver_id, "ride accepted");
        self.emit_room(
            Room::Ride(ride_id),
            &RideEvent::DriverAssigned {
                ride_id,
                driver: result.driver.clone(),
            },
        );
        self.emit_room(
            Room::Ride(ride_id),
            &RideEvent::RideStatusUpdate {
                ride_id,
                status: RideStatus::Confirmed,
            },
        );

        Ok(result)
    }

    /// Record a driver's decline. Declining twice is a no-op; the ride
    /// stays claimable by everyone else.
    pub async fn decline_ride(&self, ride_id: Uuid, driver_id: Uuid) -> Result<Ride> {
        if let Some(row) = self.db.try_decline(ride_id, driver_id).await? {
            let ride: Ride = row.try_into()?;
            info!(%ride_id, %driver_id, "ride declined");
            // The ride stays pending; room members learn nothing moved
            self.emit_room(
                Room::Ride(ride_id),
                &RideEvent::RideStatusUpdate {
                    ride_id,
                    status: RideStatus::Pending,
                },
            );
            return Ok(ride);
        }

        // Guard did not match: missing ride, already-declined repeat,
        // or the ride left pending
        let row = self
            .db
            .get_ride(ride_id)
            .await?
            .ok_or(DispatchError::NotFound("ride"))?;
        let ride: Ride = row.try_into()?;

        if ride.status != RideStatus::Pending {
            return Err(DispatchError::Conflict(format!(
                "cannot decline a {} ride",
                ride.status.as_str()
            )));
        }

        Ok(ride)
    }

    /// Caller-facing status move: `in_progress` or `completed`.
    pub async fn update_status(&self, ride_id: Uuid, requested: &str) -> Result<Ride> {
        let (target, allowed_from): (RideStatus, &[RideStatus]) = match requested {
            "in_progress" => (RideStatus::Ongoing, &[RideStatus::Confirmed]),
            "completed" => (
                RideStatus::Completed,
                &[RideStatus::Ongoing, RideStatus::Confirmed],
            ),
            other => {
                return Err(DispatchError::Validation(format!(
                    "unsupported status '{other}'"
                )))
            }
        };

        // Completion follows the money: a ride closes only after a
        // completed payment exists for it
        if target == RideStatus::Completed
            && self.db.completed_payment_for_ride(ride_id).await?.is_none()
        {
            return Err(DispatchError::Conflict("ride is not paid yet".into()));
        }

        let ride = self.transition(ride_id, target, allowed_from).await?;

        if target == RideStatus::Completed {
            self.emit_room(Room::Ride(ride_id), &RideEvent::RideCompleted { ride_id });
        }

        Ok(ride)
    }

    /// Flag the ride's payment as settled without closing it.
    pub async fn mark_paid(&self, ride_id: Uuid) -> Result<Ride> {
        let row = self
            .db
            .mark_ride_paid(ride_id)
            .await?
            .ok_or(DispatchError::NotFound("ride"))?;
        let ride: Ride = row.try_into()?;

        self.emit_room(Room::Ride(ride_id), &RideEvent::RideUpdated(ride.clone()));
        Ok(ride)
    }

    pub async fn cancel_ride(&self, ride_id: Uuid) -> Result<Ride> {
        let ride = self
            .transition(
                ride_id,
                RideStatus::Cancelled,
                &[RideStatus::Pending, RideStatus::Confirmed],
            )
            .await?;

        self.emit_room(Room::Ride(ride_id), &RideEvent::RideCancelled { ride_id });
        Ok(ride)
    }

    /// Latest driver position: index write, durable write, and relay
    /// to the ride room when one is attached.
    pub async fn record_location(
        &self,
        driver_id: Uuid,
        lat: f64,
        lng: f64,
        ride_id: Option<Uuid>,
    ) -> Result<()> {
        let position = Coordinates::new(lat, lng)?;

        self.locations.record(driver_id, position);
        self.db.update_driver_location(driver_id, lat, lng).await?;

        if let Some(ride_id) = ride_id {
            self.emit_room(
                Room::Ride(ride_id),
                &RideEvent::DriverLocationUpdate {
                    ride_id,
                    driver_id,
                    lat,
                    lng,
                },
            );
        }
        self.emit_room(
            Room::Driver(driver_id),
            &RideEvent::DriverLocationAck { lat, lng },
        );

        Ok(())
    }

    pub async fn ride_history(&self, query: HistoryQuery) -> Result<Vec<Ride>> {
        if query.role != "rider" && query.role != "driver" {
            return Err(DispatchError::Validation(format!(
                "unsupported role '{}'",
                query.role
            )));
        }

        let rows = self.db.ride_history(query.user_id, &query.role).await?;
        rows.into_iter()
            .map(|r| r.try_into().map_err(DispatchError::from))
            .collect()
    }

    pub async fn driver_profile(&self, driver_id: Uuid) -> Result<DriverProfile> {
        let user = self
            .db
            .get_user(driver_id)
            .await?
            .ok_or(DispatchError::NotFound("driver"))?;

        Ok(user.into())
    }

    pub async fn create_review(
        &self,
        ride_id: Uuid,
        driver_id: Uuid,
        rider_id: Uuid,
        rating: i32,
        review: Option<&str>,
    ) -> Result<crate::models::ReviewRow> {
        // Only the rider of a completed ride may review it
        let row = self
            .db
            .get_ride(ride_id)
            .await?
            .ok_or(DispatchError::NotFound("ride"))?;
        let ride: Ride = row.try_into()?;

        if ride.rider_id != rider_id {
            return Err(DispatchError::Unauthorized(
                "only the rider may review this ride".into(),
            ));
        }
        if ride.status != RideStatus::Completed {
            return Err(DispatchError::Conflict(
                "ride is not completed yet".into(),
            ));
        }

        self.db
            .upsert_review(ride_id, driver_id, rider_id, rating, review)
            .await
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        req: crate::models::UpdateProfileRequest,
    ) -> Result<DriverProfile> {
        let user = self
            .db
            .update_profile(
                user_id,
                req.full_name.as_deref(),
                req.phone.as_deref(),
                req.profile_pic.as_deref(),
                req.vehicle.as_deref(),
                req.vehicle_plate.as_deref(),
            )
            .await?
            .ok_or(DispatchError::NotFound("driver"))?;

        Ok(user.into())
    }

    /// Render the receipt PDF for a completed ride.
    pub async fn ride_receipt(&self, ride_id: Uuid) -> Result<Vec<u8>> {
        let row = self
            .db
            .get_ride(ride_id)
            .await?
            .ok_or(DispatchError::NotFound("ride"))?;
        let ride: Ride = row.try_into()?;

        if ride.status != RideStatus::Completed {
            return Err(DispatchError::Conflict(
                "receipt is available after completion".into(),
            ));
        }

        let driver_name = match ride.driver_id {
            Some(driver_id) => self.db.get_user(driver_id).await?.and_then(|u| u.full_name),
            None => None,
        };

        crate::receipt::render_receipt(&crate::receipt::ReceiptData {
            ride_id,
            pickup: ride.pickup,
            dropoff: ride.dropoff,
            ride_type: ride.ride_class.as_str().to_string(),
            fare: ride.fare,
            driver_name,
            completed_at: chrono::Utc::now(),
        })
    }

    pub async fn driver_earnings(&self, driver_id: Uuid) -> Result<Decimal> {
        let user = self
            .db
            .get_user(driver_id)
            .await?
            .ok_or(DispatchError::NotFound("driver"))?;

        Ok(user.total_earnings.unwrap_or(Decimal::ZERO))
    }

    pub async fn driver_reviews(&self, driver_id: Uuid) -> Result<DriverReviews> {
        let reviews = self.db.driver_reviews(driver_id).await?;

        let average_rating = if reviews.is_empty() {
            None
        } else {
            let total: i32 = reviews.iter().map(|r| r.rating).sum();
            Some(
                (Decimal::from(total) / Decimal::from(reviews.len() as i64)).round_dp(2),
            )
        };

        Ok(DriverReviews {
            average_rating,
            reviews,
        })
    }

    async fn transition(
        &self,
        ride_id: Uuid,
        target: RideStatus,
        allowed_from: &[RideStatus],
    ) -> Result<Ride> {
        let Some(row) = self.db.update_status(ride_id, target, allowed_from).await? else {
            let current = self
                .db
                .get_ride(ride_id)
                .await?
                .ok_or(DispatchError::NotFound("ride"))?;

            return Err(DispatchError::Conflict(format!(
                "cannot move a {} ride to {}",
                current.status,
                target.as_str()
            )));
        };

        let ride: Ride = row.try_into()?;

        info!(%ride_id, status = ride.status.as_str(), "ride status updated");
        self.emit_room(
            Room::Ride(ride_id),
            &RideEvent::RideStatusUpdate {
                ride_id,
                status: ride.status,
            },
        );

        Ok(ride)
    }

    async fn with_driver(&self, row: RideRow) -> Result<RideWithDriver> {
        let ride: Ride = row.try_into()?;

        let driver = match ride.driver_id {
            Some(driver_id) => self.db.get_user(driver_id).await?.map(DriverProfile::from),
            None => None,
        };

        Ok(RideWithDriver { ride, driver })
    }

    fn emit_room(&self, room: Room, event: &RideEvent) {
        if let Err(e) = self.hub.emit_to_room(room, event) {
            warn!(event = event.name(), "room broadcast failed: {e}");
        }
    }

    fn emit_all(&self, event: &RideEvent) {
        if let Err(e) = self.hub.emit_to_all(event) {
            warn!(event = event.name(), "broadcast failed: {e}");
        }
    }
}
