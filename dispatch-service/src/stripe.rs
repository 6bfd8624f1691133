//! Stripe API client and webhook signature verification.
//!
//! Amounts cross the wire in the currency's smallest unit (paise for
//! INR). Webhook payloads are verified over the raw request bytes
//! before any JSON parsing happens.

use crate::config::StripeConfig;
use crate::errors::{DispatchError, Result};
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use tracing::info;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Reject webhook timestamps older than this; limits replay windows.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub struct StripeClient {
    config: StripeConfig,
    http_client: Client,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ConnectAccount {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountLink {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub amount: i64,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DispatchError::Internal(format!("http client init failed: {e}")))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Create a payment intent for a ride. Ride and rider ids travel in
    /// metadata so the webhook can reconcile without extra state.
    pub async fn create_payment_intent(
        &self,
        amount: Decimal,
        ride_id: Uuid,
        rider_id: Uuid,
    ) -> Result<PaymentIntent> {
        let minor_units = to_minor_units(amount)?;

        let params = [
            ("amount", minor_units.to_string()),
            ("currency", self.config.currency.clone()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[ride_id]", ride_id.to_string()),
            ("metadata[rider_id]", rider_id.to_string()),
        ];

        let intent: PaymentIntent = self
            .post_form("/v1/payment_intents", &params)
            .await?;

        info!(intent_id = %intent.id, %ride_id, "created payment intent");
        Ok(intent)
    }

    /// Provision an Express connect account for driver payouts.
    pub async fn create_connect_account(&self, driver_id: Uuid) -> Result<ConnectAccount> {
        let params = [
            ("type", "express".to_string()),
            ("metadata[driver_id]", driver_id.to_string()),
        ];

        self.post_form("/v1/accounts", &params).await
    }

    pub async fn create_account_link(&self, account_id: &str) -> Result<AccountLink> {
        let params = [
            ("account", account_id.to_string()),
            (
                "refresh_url",
                format!("{}/driver/onboarding/refresh", self.config.frontend_url),
            ),
            (
                "return_url",
                format!("{}/driver/onboarding/complete", self.config.frontend_url),
            ),
            ("type", "account_onboarding".to_string()),
        ];

        self.post_form("/v1/account_links", &params).await
    }

    pub async fn create_transfer(&self, amount: Decimal, destination: &str) -> Result<Transfer> {
        let minor_units = to_minor_units(amount)?;

        let params = [
            ("amount", minor_units.to_string()),
            ("currency", self.config.currency.clone()),
            ("destination", destination.to_string()),
        ];

        let transfer: Transfer = self.post_form("/v1/transfers", &params).await?;

        info!(transfer_id = %transfer.id, destination, "created payout transfer");
        Ok(transfer)
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.config.api_base, path);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::PaymentProvider(format!(
                "stripe {path} returned {status}: {body}"
            )));
        }

        Ok(response.json::<T>().await?)
    }
}

fn to_minor_units(amount: Decimal) -> Result<i64> {
    (amount * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| DispatchError::PaymentProvider(format!("amount out of range: {amount}")))
}

/// Verify a `Stripe-Signature` header against the raw payload.
///
/// The header carries `t=<unix>,v1=<hex hmac>`; the signed string is
/// `{t}.{payload}`. Any parse failure, stale timestamp, or digest
/// mismatch is a verification error.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<()> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        DispatchError::SignatureVerification("missing timestamp in signature header".into())
    })?;

    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(DispatchError::SignatureVerification(
            "signature timestamp outside tolerance".into(),
        ));
    }

    if candidates.is_empty() {
        return Err(DispatchError::SignatureVerification(
            "no v1 signature in header".into(),
        ));
    }

    let mut signed = Vec::with_capacity(payload.len() + 16);
    signed.extend_from_slice(timestamp.to_string().as_bytes());
    signed.push(b'.');
    signed.extend_from_slice(payload);

    for candidate in candidates {
        let Ok(expected) = hex_decode(candidate) else {
            continue;
        };

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| {
            DispatchError::SignatureVerification("invalid webhook secret".into())
        })?;
        mac.update(&signed);

        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(DispatchError::SignatureVerification(
        "signature mismatch".into(),
    ))
}

fn hex_decode(input: &str) -> std::result::Result<Vec<u8>, ()> {
    // Header values are attacker-controlled; work on raw bytes so a
    // multi-byte character can never land inside a slice boundary
    let bytes = input.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(());
    }

    bytes
        .chunks_exact(2)
        .map(|pair| {
            let hi = hex_nibble(pair[0])?;
            let lo = hex_nibble(pair[1])?;
            Ok(hi << 4 | lo)
        })
        .collect()
}

fn hex_nibble(b: u8) -> std::result::Result<u8, ()> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &[u8], timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        let digest = mac.finalize().into_bytes();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        format!("t={timestamp},v1={hex}")
    }

    #[test]
    fn valid_signature_accepted() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let now = 1_700_000_000;
        let header = sign(payload, now);

        assert!(verify_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn tampered_payload_rejected() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let now = 1_700_000_000;
        let header = sign(payload, now);

        let err = verify_signature(b"{\"type\":\"other\"}", &header, SECRET, now);
        assert!(err.is_err());
    }

    #[test]
    fn wrong_secret_rejected() {
        let payload = b"payload";
        let now = 1_700_000_000;
        let header = sign(payload, now);

        assert!(verify_signature(payload, &header, "whsec_other", now).is_err());
    }

    #[test]
    fn stale_timestamp_rejected() {
        let payload = b"payload";
        let signed_at = 1_700_000_000;
        let header = sign(payload, signed_at);

        let err = verify_signature(payload, &header, SECRET, signed_at + 301).unwrap_err();
        assert!(matches!(err, DispatchError::SignatureVerification(_)));
    }

    #[test]
    fn malformed_header_rejected() {
        assert!(verify_signature(b"x", "not-a-header", SECRET, 0).is_err());
        assert!(verify_signature(b"x", "t=abc,v1=zz", SECRET, 0).is_err());
    }

    #[test]
    fn non_ascii_signature_value_rejected_without_panic() {
        // Even byte length, but the second hex pair would split a
        // multi-byte character
        let err = verify_signature(b"{}", "t=0,v1=a\u{e9}b", SECRET, 0);
        assert!(matches!(err, Err(DispatchError::SignatureVerification(_))));

        assert!(hex_decode("a\u{e9}b").is_err());
        assert_eq!(hex_decode("0aFf"), Ok(vec![0x0a, 0xff]));
    }

    #[test]
    fn minor_units_round_to_paise() {
        assert_eq!(to_minor_units(dec!(154.50)).unwrap(), 15450);
        assert_eq!(to_minor_units(dec!(25)).unwrap(), 2500);
    }
}
