//! Driver-facing endpoints: location, profile, reviews, earnings.

use crate::auth::AuthClient;
use crate::errors::DispatchError;
use crate::models::{CreateReviewRequest, LocationUpdateRequest};
use crate::services::RideService;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub async fn update_location(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    driver_id: web::Path<Uuid>,
    body: web::Json<LocationUpdateRequest>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    service
        .record_location(*driver_id, body.lat, body.lng, body.ride_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

pub async fn get_profile(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    driver_id: web::Path<Uuid>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let profile = service.driver_profile(*driver_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn update_profile(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    driver_id: web::Path<Uuid>,
    body: web::Json<crate::models::UpdateProfileRequest>,
) -> Result<HttpResponse, DispatchError> {
    let user = auth.authenticate(&req).await?;

    if user.id != *driver_id {
        return Err(DispatchError::Unauthorized(
            "profiles can only be edited by their owner".into(),
        ));
    }

    let body = body.into_inner();
    body.validate()?;

    let profile = service.update_profile(*driver_id, body).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn get_reviews(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    driver_id: web::Path<Uuid>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let reviews = service.driver_reviews(*driver_id).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

pub async fn get_earnings(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    driver_id: web::Path<Uuid>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let total = service.driver_earnings(*driver_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "driver_id": *driver_id,
        "total_earnings": total
    })))
}

pub async fn create_review(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    body: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse, DispatchError> {
    let user = auth.authenticate(&req).await?;

    let body = body.into_inner();
    body.validate()?;

    if user.id != body.rider_id {
        return Err(DispatchError::Unauthorized(
            "reviews must be submitted by their author".into(),
        ));
    }

    let review = service
        .create_review(
            body.ride_id,
            body.driver_id,
            body.rider_id,
            body.rating,
            body.review.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Created().json(review))
}
