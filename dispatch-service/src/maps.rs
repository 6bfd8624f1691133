//! Mapping provider proxy.
//!
//! The frontends never see the maps API key; geocoding and routing
//! requests come through the service, which forwards them upstream and
//! relays the provider's JSON body unchanged.

use crate::config::MapsConfig;
use crate::errors::{DispatchError, Result};
use reqwest::Client;
use serde_json::Value;

pub struct MapsClient {
    config: MapsConfig,
    http_client: Client,
}

impl MapsClient {
    pub fn new(config: MapsConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DispatchError::Internal(format!("http client init failed: {e}")))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub async fn geocode(&self, address: &str) -> Result<Value> {
        self.forward(
            "/geocode/json",
            &[
                ("address", address),
                ("region", &self.config.region),
            ],
        )
        .await
    }

    pub async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<Value> {
        let latlng = format!("{lat},{lng}");
        self.forward("/geocode/json", &[("latlng", &latlng)]).await
    }

    pub async fn directions(&self, origin: &str, destination: &str) -> Result<Value> {
        self.forward(
            "/directions/json",
            &[("origin", origin), ("destination", destination)],
        )
        .await
    }

    async fn forward(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{}", self.config.api_base, path);

        let response = self
            .http_client
            .get(&url)
            .query(params)
            .query(&[("key", &self.config.api_key)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(DispatchError::MappingProvider(format!(
                "maps {path} returned {status}"
            )));
        }

        Ok(response.json::<Value>().await?)
    }
}
