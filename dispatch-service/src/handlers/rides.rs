//! Ride lifecycle endpoints.

use crate::auth::AuthClient;
use crate::errors::DispatchError;
use crate::models::{
    AcceptRideRequest, CreateRideRequest, DeclineRideRequest, HistoryQuery, NearbyQuery,
    StatusUpdateRequest,
};
use crate::services::RideService;
use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub async fn create_ride(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    body: web::Json<CreateRideRequest>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let body = body.into_inner();
    body.validate()?;

    let ride = service.create_ride(body).await?;
    Ok(HttpResponse::Created().json(ride))
}

pub async fn get_ride(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    ride_id: web::Path<Uuid>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let ride = service.get_ride(*ride_id).await?;
    Ok(HttpResponse::Ok().json(ride))
}

pub async fn rides_for_rider(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    rider_id: web::Path<Uuid>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let rides = service.rides_for_rider(*rider_id).await?;
    Ok(HttpResponse::Ok().json(rides))
}

pub async fn nearby_rides(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    query: web::Query<NearbyQuery>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let rides = service.nearby_rides(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(rides))
}

pub async fn ride_history(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let rides = service.ride_history(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(rides))
}

pub async fn accept_ride(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    ride_id: web::Path<Uuid>,
    body: web::Json<AcceptRideRequest>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let ride = service.accept_ride(*ride_id, body.driver_id).await?;
    Ok(HttpResponse::Ok().json(ride))
}

pub async fn decline_ride(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    ride_id: web::Path<Uuid>,
    body: web::Json<DeclineRideRequest>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let ride = service.decline_ride(*ride_id, body.driver_id).await?;
    Ok(HttpResponse::Ok().json(ride))
}

pub async fn update_status(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    ride_id: web::Path<Uuid>,
    body: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let ride = service.update_status(*ride_id, &body.status).await?;
    Ok(HttpResponse::Ok().json(ride))
}

pub async fn complete_ride(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    ride_id: web::Path<Uuid>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let ride = service.update_status(*ride_id, "completed").await?;
    Ok(HttpResponse::Ok().json(ride))
}

pub async fn mark_paid(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    ride_id: web::Path<Uuid>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let ride = service.mark_paid(*ride_id).await?;
    Ok(HttpResponse::Ok().json(ride))
}

pub async fn ride_receipt(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    ride_id: web::Path<Uuid>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let pdf = service.ride_receipt(*ride_id).await?;
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .body(pdf))
}

pub async fn cancel_ride(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    service: web::Data<Arc<RideService>>,
    ride_id: web::Path<Uuid>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let ride = service.cancel_ride(*ride_id).await?;
    Ok(HttpResponse::Ok().json(ride))
}
