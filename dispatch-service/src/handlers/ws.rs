//! Websocket endpoint.
//!
//! Each connection registers with the broadcast hub, then a single
//! task pumps both directions: hub fan-out to the socket, and client
//! commands into room membership or the location pipeline. Dropping
//! the socket tears down every room membership.

use crate::services::RideService;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::{Message, Session};
use futures_util::StreamExt;
use realtime_hub::{BroadcastHub, ClientCommand, ConnectionId, RideEvent, Room};
use std::sync::Arc;
use tracing::{debug, warn};

pub async fn ws_entry(
    req: HttpRequest,
    stream: web::Payload,
    hub: web::Data<Arc<BroadcastHub>>,
    rides: web::Data<Arc<RideService>>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;

    let hub = Arc::clone(hub.get_ref());
    let rides = Arc::clone(rides.get_ref());

    actix_web::rt::spawn(connection_loop(hub, rides, session, msg_stream));

    Ok(response)
}

async fn connection_loop(
    hub: Arc<BroadcastHub>,
    rides: Arc<RideService>,
    mut session: Session,
    mut msg_stream: actix_ws::MessageStream,
) {
    let (conn_id, mut outbound) = hub.register();
    debug!(?conn_id, "websocket connected");

    loop {
        tokio::select! {
            maybe_out = outbound.recv() => {
                match maybe_out {
                    Some(text) => {
                        if session.text(text).await.is_err() {
                            break;
                        }
                    }
                    // Hub dropped the sender; connection is gone
                    None => break,
                }
            }
            maybe_msg = msg_stream.next() => {
                match maybe_msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_command(&hub, &rides, conn_id, &text).await;
                    }
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    hub.disconnect(conn_id);
    let _ = session.close(None).await;
    debug!(?conn_id, "websocket disconnected");
}

async fn handle_command(
    hub: &BroadcastHub,
    rides: &RideService,
    conn_id: ConnectionId,
    raw: &str,
) {
    let command: ClientCommand = match serde_json::from_str(raw) {
        Ok(cmd) => cmd,
        Err(e) => {
            debug!(?conn_id, "unparseable client frame: {e}");
            return;
        }
    };

    match command {
        ClientCommand::JoinDriver { driver_id } => {
            hub.join(conn_id, Room::Driver(driver_id));
        }
        ClientCommand::JoinRide { ride_id } => {
            hub.join(conn_id, Room::Ride(ride_id));
        }
        ClientCommand::DriverLocation {
            ride_id,
            driver_id,
            lat,
            lng,
        } => {
            if let Err(e) = rides.record_location(driver_id, lat, lng, ride_id).await {
                warn!(%driver_id, "location update rejected: {e}");
            }
        }
        ClientCommand::UpdateRideStatus { ride_id, status } => {
            // Client relay only; authoritative moves go through HTTP
            if let Err(e) =
                hub.emit_to_room(Room::Ride(ride_id), &RideEvent::RideStatusUpdate { ride_id, status })
            {
                warn!(%ride_id, "status relay failed: {e}");
            }
        }
    }
}
