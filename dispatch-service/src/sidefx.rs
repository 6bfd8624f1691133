//! Best-effort post-completion side effects.
//!
//! Receipt rendering and email delivery run on a spawned task after
//! the financial writes commit. Failures here are logged and retried
//! with backoff, but they never surface to the caller and never roll
//! anything back.

use crate::auth::AuthClient;
use crate::email::Mailer;
use crate::errors::Result;
use crate::receipt::{render_receipt, ReceiptData};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(8);

pub struct SideEffects {
    auth: Arc<AuthClient>,
    mailer: Arc<Mailer>,
}

impl SideEffects {
    pub fn new(auth: Arc<AuthClient>, mailer: Arc<Mailer>) -> Self {
        Self { auth, mailer }
    }

    /// Fire-and-forget receipt delivery for a completed, paid ride.
    pub fn dispatch_receipt(&self, rider_id: Uuid, data: ReceiptData) {
        let auth = Arc::clone(&self.auth);
        let mailer = Arc::clone(&self.mailer);
        let ride_id = data.ride_id;

        tokio::spawn(async move {
            if let Err(e) = deliver_with_retry(&auth, &mailer, rider_id, &data).await {
                error!(%ride_id, %rider_id, "receipt delivery abandoned: {e}");
            }
        });
    }
}

async fn deliver_with_retry(
    auth: &AuthClient,
    mailer: &Mailer,
    rider_id: Uuid,
    data: &ReceiptData,
) -> Result<()> {
    let mut attempts = 0;
    let mut delay = INITIAL_DELAY;

    loop {
        attempts += 1;

        match deliver_once(auth, mailer, rider_id, data).await {
            Ok(()) => {
                if attempts > 1 {
                    info!(ride_id = %data.ride_id, "receipt delivered after {attempts} attempts");
                }
                return Ok(());
            }
            Err(e) => {
                if attempts >= MAX_ATTEMPTS {
                    return Err(e);
                }

                warn!(
                    ride_id = %data.ride_id,
                    "receipt delivery failed (attempt {attempts}), retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

async fn deliver_once(
    auth: &AuthClient,
    mailer: &Mailer,
    rider_id: Uuid,
    data: &ReceiptData,
) -> Result<()> {
    let Some(email) = auth.user_email(rider_id).await? else {
        // No address on file; nothing to deliver and nothing to retry.
        info!(ride_id = %data.ride_id, %rider_id, "rider has no email, skipping receipt");
        return Ok(());
    };

    let pdf = render_receipt(data)?;
    mailer.send_receipt(&email, data.ride_id, pdf).await
}
