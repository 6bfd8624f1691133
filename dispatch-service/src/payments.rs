//! Payment collection, reconciliation and driver payouts.
//!
//! The webhook path is the source of truth for card payments: it
//! verifies the provider signature over the raw body, dedupes replays
//! by payment intent id, and lands every financial write before any
//! best-effort side effect (receipt email) is scheduled.

use crate::auth::AuthClient;
use crate::database::Database;
use crate::errors::{DispatchError, Result};
use crate::models::{
    ClientSecretResponse, ConnectStripeResponse, PaymentIntentRequest, PayoutResponse,
    RecordPaymentRequest,
};
use crate::receipt::ReceiptData;
use crate::sidefx::SideEffects;
use crate::stripe::{verify_signature, StripeClient};
use chrono::Utc;
use realtime_hub::{BroadcastHub, RideEvent, Room};
use ride_core::Ride;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct PaymentService {
    db: Arc<Database>,
    stripe: Arc<StripeClient>,
    hub: Arc<BroadcastHub>,
    side_effects: SideEffects,
    webhook_secret: String,
}

/// Minimal shape of the provider's webhook envelope.
#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: IntentObject,
}

#[derive(Debug, Deserialize)]
struct IntentObject {
    id: String,
    #[serde(default)]
    metadata: IntentMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct IntentMetadata {
    ride_id: Option<Uuid>,
    rider_id: Option<Uuid>,
}

/// Outcome of a webhook delivery; all of these are 200s to the caller
/// so the provider stops retrying.
#[derive(Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    Reconciled,
    AlreadyProcessed,
    Ignored,
}

impl PaymentService {
    pub fn new(
        db: Arc<Database>,
        stripe: Arc<StripeClient>,
        hub: Arc<BroadcastHub>,
        auth: Arc<AuthClient>,
        mailer: Arc<crate::email::Mailer>,
        webhook_secret: String,
    ) -> Self {
        Self {
            db,
            stripe,
            hub,
            side_effects: SideEffects::new(auth, mailer),
            webhook_secret,
        }
    }

    /// Create (or refresh) the payment intent backing a ride's card
    /// payment. One pending payment row per (ride, rider).
    pub async fn create_intent(&self, req: PaymentIntentRequest) -> Result<ClientSecretResponse> {
        let ride = self
            .db
            .get_ride(req.ride_id)
            .await?
            .ok_or(DispatchError::NotFound("ride"))?;

        if ride.rider_id != req.rider_id {
            return Err(DispatchError::Unauthorized(
                "payment must come from the ride's rider".into(),
            ));
        }
        if req.amount <= Decimal::ZERO {
            return Err(DispatchError::Validation("amount must be positive".into()));
        }

        let payment = match self.db.find_pending_payment(req.ride_id, req.rider_id).await? {
            Some(existing) => existing,
            None => {
                self.db
                    .insert_payment(req.ride_id, req.rider_id, req.amount, "pending", None, None)
                    .await?
            }
        };

        let intent = self
            .stripe
            .create_payment_intent(req.amount, req.ride_id, req.rider_id)
            .await?;

        self.db.set_payment_intent(payment.id, &intent.id).await?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            DispatchError::PaymentProvider("intent missing client secret".into())
        })?;

        Ok(ClientSecretResponse { client_secret })
    }

    /// Record an out-of-band (cash) payment and settle the ride.
    pub async fn record_payment(&self, req: RecordPaymentRequest) -> Result<Ride> {
        let ride = self
            .db
            .get_ride(req.ride_id)
            .await?
            .ok_or(DispatchError::NotFound("ride"))?;

        if ride.rider_id != req.rider_id {
            return Err(DispatchError::Unauthorized(
                "payment must come from the ride's rider".into(),
            ));
        }

        if self.db.completed_payment_for_ride(req.ride_id).await?.is_some() {
            return Err(DispatchError::Conflict("ride already paid".into()));
        }

        let method = req.payment_method.as_deref().unwrap_or("cash");
        self.db
            .insert_payment(req.ride_id, req.rider_id, req.amount, "completed", Some(method), None)
            .await?;

        self.settle(req.ride_id).await
    }

    /// Verify and apply one webhook delivery. Replays and unhandled
    /// event types resolve without touching the ledger.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookOutcome> {
        verify_signature(
            payload,
            signature_header,
            &self.webhook_secret,
            Utc::now().timestamp(),
        )?;

        let event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| DispatchError::Validation(format!("malformed webhook body: {e}")))?;

        if event.event_type != "payment_intent.succeeded" {
            info!(event_type = event.event_type, "ignoring webhook event");
            return Ok(WebhookOutcome::Ignored);
        }

        let intent = event.data.object;

        if self
            .db
            .find_completed_payment_by_intent(&intent.id)
            .await?
            .is_some()
        {
            info!(intent_id = intent.id, "webhook replay, already reconciled");
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        let (Some(ride_id), Some(rider_id)) = (intent.metadata.ride_id, intent.metadata.rider_id)
        else {
            warn!(intent_id = intent.id, "intent missing ride metadata, ignoring");
            return Ok(WebhookOutcome::Ignored);
        };

        // Whoever wins the completion write settles; a concurrent
        // delivery of the same intent loses and stops here.
        let won = match self.db.find_pending_payment(ride_id, rider_id).await? {
            Some(payment) => self.db.complete_payment(payment.id, Some(&intent.id)).await?,
            None => {
                // Intent created elsewhere; still record the money
                let ride = self
                    .db
                    .get_ride(ride_id)
                    .await?
                    .ok_or(DispatchError::NotFound("ride"))?;
                self.db
                    .insert_completed_payment(ride_id, rider_id, ride.fare, "card", &intent.id)
                    .await?
                    .is_some()
            }
        };

        if !won {
            info!(intent_id = intent.id, "concurrent delivery already reconciled this intent");
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        self.settle(ride_id).await?;

        info!(intent_id = intent.id, %ride_id, "payment reconciled");
        Ok(WebhookOutcome::Reconciled)
    }

    /// Link (or resume linking) a driver's payout account.
    pub async fn connect_stripe(&self, driver_id: Uuid) -> Result<ConnectStripeResponse> {
        let user = self
            .db
            .get_user(driver_id)
            .await?
            .ok_or(DispatchError::NotFound("driver"))?;

        let account_id = match user.stripe_account_id {
            Some(id) => id,
            None => {
                let account = self.stripe.create_connect_account(driver_id).await?;
                self.db.set_stripe_account(driver_id, &account.id).await?;
                account.id
            }
        };

        let link = self.stripe.create_account_link(&account_id).await?;

        Ok(ConnectStripeResponse {
            url: Some(link.url),
            message: None,
        })
    }

    /// Pay a driver out of accumulated earnings. The balance debit is
    /// guarded, so concurrent payouts cannot overdraw.
    pub async fn payout(&self, driver_id: Uuid, amount: Decimal) -> Result<PayoutResponse> {
        if amount <= Decimal::ZERO {
            return Err(DispatchError::Validation("amount must be positive".into()));
        }

        let user = self
            .db
            .get_user(driver_id)
            .await?
            .ok_or(DispatchError::NotFound("driver"))?;

        let account_id = user.stripe_account_id.ok_or_else(|| {
            DispatchError::Validation("driver has no payout account linked".into())
        })?;

        if !self.db.debit_driver_earnings(driver_id, amount).await? {
            return Err(DispatchError::Conflict("insufficient earnings".into()));
        }

        let transfer = match self.stripe.create_transfer(amount, &account_id).await {
            Ok(t) => t,
            Err(e) => {
                // Give the balance back if the provider rejected us
                self.db.increment_driver_earnings(driver_id, amount).await?;
                return Err(e);
            }
        };

        Ok(PayoutResponse {
            message: format!("paid out {amount} to driver {driver_id}"),
            transfer_id: transfer.id,
        })
    }

    /// Financial settlement for a paid ride: statuses, earnings credit
    /// and the completion broadcast. Receipt delivery is scheduled
    /// afterwards and cannot fail the settlement.
    async fn settle(&self, ride_id: Uuid) -> Result<Ride> {
        let Some(row) = self.db.complete_ride_paid(ride_id).await? else {
            // The guard refused the write: the ride is gone or was
            // cancelled before the confirmation landed. The payment
            // row stays recorded; nothing else moves.
            let row = self
                .db
                .get_ride(ride_id)
                .await?
                .ok_or(DispatchError::NotFound("ride"))?;
            let ride: Ride = row.try_into()?;
            warn!(
                %ride_id,
                status = ride.status.as_str(),
                "payment recorded for a non-settleable ride, skipping settlement"
            );
            return Ok(ride);
        };
        let ride: Ride = row.try_into()?;

        let driver_name = match ride.driver_id {
            Some(driver_id) => {
                self.db.increment_driver_earnings(driver_id, ride.fare).await?
            }
            None => None,
        };

        let room = Room::Ride(ride_id);
        if let Err(e) = self
            .hub
            .emit_to_room(room, &RideEvent::RideUpdated(ride.clone()))
        {
            warn!(%ride_id, "settlement broadcast failed: {e}");
        }
        if let Err(e) = self
            .hub
            .emit_to_room(room, &RideEvent::RideCompleted { ride_id })
        {
            warn!(%ride_id, "settlement broadcast failed: {e}");
        }

        self.side_effects.dispatch_receipt(
            ride.rider_id,
            ReceiptData {
                ride_id,
                pickup: ride.pickup.clone(),
                dropoff: ride.dropoff.clone(),
                ride_type: ride.ride_class.as_str().to_string(),
                fare: ride.fare,
                driver_name,
                completed_at: Utc::now(),
            },
        );

        Ok(ride)
    }
}
