use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dispatch_service::{
    auth::AuthClient,
    config::Config,
    database::Database,
    email::Mailer,
    handlers,
    location::LocationIndex,
    maps::MapsClient,
    payments::PaymentService,
    services::RideService,
    stripe::StripeClient,
};
use dotenv::dotenv;
use realtime_hub::BroadcastHub;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Invalid configuration");

    info!("Starting dispatch service on port {}", config.server.port);

    let db = Arc::new(
        Database::new(&config.database.url, config.database.max_connections)
            .await
            .expect("Failed to connect to database"),
    );

    let hub = Arc::new(BroadcastHub::new());
    let locations = Arc::new(LocationIndex::new());

    let auth = Arc::new(AuthClient::new(config.auth.clone()).expect("Failed to build auth client"));
    let maps = Arc::new(MapsClient::new(config.maps.clone()).expect("Failed to build maps client"));
    let stripe =
        Arc::new(StripeClient::new(config.stripe.clone()).expect("Failed to build stripe client"));
    let mailer = Arc::new(Mailer::new(&config.smtp).expect("Failed to build mailer"));

    let ride_service = Arc::new(RideService::new(
        Arc::clone(&db),
        Arc::clone(&hub),
        Arc::clone(&locations),
    ));
    let payment_service = Arc::new(PaymentService::new(
        Arc::clone(&db),
        Arc::clone(&stripe),
        Arc::clone(&hub),
        Arc::clone(&auth),
        Arc::clone(&mailer),
        config.stripe.webhook_secret.clone(),
    ));

    let cors_origins = config.server.cors_origins.clone();
    let host = config.server.host.clone();
    let port = config.server.port;

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allow_any_header()
            .max_age(3600);
        for origin in &cors_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .app_data(web::Data::new(ride_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(auth.clone()))
            .app_data(web::Data::new(maps.clone()))
            .app_data(web::Data::new(hub.clone()))
            .configure(handlers::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
