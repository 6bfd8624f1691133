//! HTTP and websocket surface.

pub mod drivers;
pub mod payments;
pub mod proxy;
pub mod rides;
pub mod ws;

use actix_web::{web, HttpResponse};
use serde_json::json;

/// Liveness probe
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "dispatch-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Route table. Fixed segments register before `{ride_id}` captures.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/ws", web::get().to(ws::ws_entry))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/rides")
                        .route("", web::post().to(rides::create_ride))
                        .route("/nearby", web::get().to(rides::nearby_rides))
                        .route("/history", web::get().to(rides::ride_history))
                        .route("/user/{rider_id}", web::get().to(rides::rides_for_rider))
                        .route(
                            "/drivers/{driver_id}/location",
                            web::post().to(drivers::update_location),
                        )
                        .route("/{ride_id}", web::get().to(rides::get_ride))
                        .route("/{ride_id}/receipt", web::get().to(rides::ride_receipt))
                        .route("/{ride_id}/accept", web::post().to(rides::accept_ride))
                        .route("/{ride_id}/decline", web::patch().to(rides::decline_ride))
                        .route("/{ride_id}/status", web::patch().to(rides::update_status))
                        .route("/{ride_id}/cancel", web::patch().to(rides::cancel_ride))
                        .route("/{ride_id}/complete", web::patch().to(rides::complete_ride))
                        .route("/{ride_id}/mark-paid", web::patch().to(rides::mark_paid)),
                )
                .service(
                    web::scope("/drivers")
                        .route("/{driver_id}/profile", web::get().to(drivers::get_profile))
                        .route("/{driver_id}/profile", web::put().to(drivers::update_profile))
                        .route("/{driver_id}/reviews", web::get().to(drivers::get_reviews))
                        .route("/{driver_id}/earnings", web::get().to(drivers::get_earnings))
                        .route(
                            "/{driver_id}/connect-stripe",
                            web::post().to(payments::connect_stripe),
                        )
                        .route("/{driver_id}/payout", web::post().to(payments::payout)),
                )
                .service(
                    web::scope("/payments")
                        .route("", web::post().to(payments::record_payment))
                        .route("/intent", web::post().to(payments::create_intent))
                        .route("/webhook", web::post().to(payments::webhook)),
                )
                .route("/reviews", web::post().to(drivers::create_review))
                .route("/geocode", web::get().to(proxy::geocode))
                .route("/directions", web::get().to(proxy::directions)),
        );
}
