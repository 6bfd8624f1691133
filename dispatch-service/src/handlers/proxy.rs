//! Mapping provider pass-through endpoints.

use crate::auth::AuthClient;
use crate::errors::DispatchError;
use crate::maps::MapsClient;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct DirectionsQuery {
    pub origin: String,
    pub destination: String,
}

pub async fn geocode(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    maps: web::Data<Arc<MapsClient>>,
    query: web::Query<GeocodeQuery>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let body = match (&query.address, query.lat, query.lng) {
        (Some(address), _, _) => maps.geocode(address).await?,
        (None, Some(lat), Some(lng)) => maps.reverse_geocode(lat, lng).await?,
        _ => {
            return Err(DispatchError::Validation(
                "address or lat/lng required".into(),
            ))
        }
    };

    Ok(HttpResponse::Ok().json(body))
}

pub async fn directions(
    req: HttpRequest,
    auth: web::Data<Arc<AuthClient>>,
    maps: web::Data<Arc<MapsClient>>,
    query: web::Query<DirectionsQuery>,
) -> Result<HttpResponse, DispatchError> {
    auth.authenticate(&req).await?;

    let body = maps.directions(&query.origin, &query.destination).await?;
    Ok(HttpResponse::Ok().json(body))
}
