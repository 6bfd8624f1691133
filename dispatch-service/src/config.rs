use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub stripe: StripeConfig,
    pub maps: MapsConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    /// Base URL of the identity service that resolves bearer tokens
    pub base_url: String,
    /// Service key used for admin lookups (user email for receipts)
    pub service_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    /// Where account onboarding redirects land
    pub frontend_url: String,
    pub currency: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MapsConfig {
    pub api_key: String,
    pub api_base: String,
    /// Region bias for forward geocoding
    pub region: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("server.cors_origins", vec!["http://localhost:5173"])?
            .set_default("database.max_connections", 10)?
            .set_default("auth.timeout_secs", 5)?
            .set_default("stripe.api_base", "https://api.stripe.com")?
            .set_default("stripe.currency", "inr")?
            .set_default("stripe.timeout_secs", 10)?
            .set_default("maps.api_base", "https://maps.googleapis.com/maps/api")?
            .set_default("maps.region", "in")?
            .set_default("maps.timeout_secs", 10)?
            .set_default("smtp.port", 587)?
            .set_default("smtp.from_address", "no-reply@dispatch.local")?;

        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&config_file).required(false));
        } else {
            builder = builder
                .add_source(File::with_name(&format!("config/{}", environment)).required(false));
        }

        builder = builder.add_source(Environment::default().separator("__"));

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::Message("database.url is required".into()));
        }
        if self.stripe.webhook_secret.is_empty() {
            return Err(ConfigError::Message(
                "stripe.webhook_secret is required".into(),
            ));
        }
        Ok(())
    }

}

impl AuthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StripeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MapsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_files() {
        // Required fields come through the environment source
        std::env::set_var("DATABASE__URL", "postgres://localhost/dispatch");
        std::env::set_var("AUTH__BASE_URL", "http://localhost:9999");
        std::env::set_var("AUTH__SERVICE_KEY", "test-key");
        std::env::set_var("STRIPE__SECRET_KEY", "sk_test_x");
        std::env::set_var("STRIPE__WEBHOOK_SECRET", "whsec_x");
        std::env::set_var("STRIPE__FRONTEND_URL", "http://localhost:5173");
        std::env::set_var("MAPS__API_KEY", "maps-key");
        std::env::set_var("SMTP__HOST", "localhost");
        std::env::set_var("SMTP__USERNAME", "u");
        std::env::set_var("SMTP__PASSWORD", "p");

        let config = Config::from_env().expect("config should build");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.stripe.currency, "inr");
        assert_eq!(config.maps.region, "in");
        config.validate().expect("config should validate");
    }
}
