//! Payment endpoints.
//!
//! The webhook route is the one unauthenticated POST: it carries its
//! own proof via the provider signature, verified over the raw bytes.

use crate::auth::AuthClient;
use crate::errors::DispatchError;
use crate::models::{PaymentIntentRequest, PayoutRequest, RecordPaymentRequest};
use crate::payments::PaymentService;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub async fn create_intent(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<PaymentService>>,
    body: web::Json<PaymentIntentRequest>,
) -> Result<HttpResponse, DispatchError> {
    let user = auth.authenticate(&req).await?;

    if user.id != body.rider_id {
        return Err(DispatchError::Unauthorized(
            "payment must come from the authenticated rider".into(),
        ));
    }

    let secret = service.create_intent(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(secret))
}

pub async fn record_payment(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<PaymentService>>,
    body: web::Json<RecordPaymentRequest>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let ride = service.record_payment(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ride))
}

pub async fn webhook(
    req: HttpRequest,
    service: web::Data<Arc<PaymentService>>,
    payload: web::Bytes,
) -> Result<HttpResponse, DispatchError> {
    let signature = req
        .headers()
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            DispatchError::SignatureVerification("missing Stripe-Signature header".into())
        })?;

    let outcome = service.handle_webhook(&payload, signature).await?;
    Ok(HttpResponse::Ok().json(json!({ "received": true, "outcome": format!("{outcome:?}") })))
}

pub async fn connect_stripe(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<PaymentService>>,
    driver_id: web::Path<Uuid>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let response = service.connect_stripe(*driver_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn payout(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<PaymentService>>,
    driver_id: web::Path<Uuid>,
    body: web::Json<PayoutRequest>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let response = service.payout(*driver_id, body.amount).await?;
    Ok(HttpResponse::Ok().json(response))
}
