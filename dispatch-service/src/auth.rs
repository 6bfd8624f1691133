//! Bearer-token verification against the identity provider.
//!
//! Tokens are opaque to this service; each request's token is resolved
//! to a user id by the upstream auth API. Handlers only ever see the
//! resolved [`AuthUser`].

use crate::config::AuthConfig;
use crate::errors::{DispatchError, Result};
use actix_web::HttpRequest;
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
}

pub struct AuthClient {
    config: AuthConfig,
    http_client: Client,
}

impl AuthClient {
    pub fn new(config: AuthConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DispatchError::Internal(format!("http client init failed: {e}")))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Resolve a bearer token to its user, or reject the request.
    pub async fn verify(&self, token: &str) -> Result<AuthUser> {
        let url = format!("{}/auth/v1/user", self.config.base_url);

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.config.service_key)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DispatchError::Unauthorized("invalid or expired token".into()));
        }

        let user: UserResponse = response.json().await?;
        Ok(AuthUser { id: user.id })
    }

    /// Admin lookup of a user's email, used when mailing receipts.
    pub async fn user_email(&self, user_id: Uuid) -> Result<Option<String>> {
        let url = format!("{}/auth/v1/admin/users/{}", self.config.base_url, user_id);

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        #[derive(Deserialize)]
        struct AdminUser {
            email: Option<String>,
        }

        let user: AdminUser = response.json().await?;
        Ok(user.email)
    }

    pub async fn authenticate(&self, req: &HttpRequest) -> Result<AuthUser> {
        let token = bearer_token(req)?;
        self.verify(token).await
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(req: &HttpRequest) -> Result<&str> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| DispatchError::Unauthorized("missing authorization header".into()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| DispatchError::Unauthorized("malformed authorization header".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn extracts_bearer_token() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer tok_abc123"))
            .to_http_request();

        assert_eq!(bearer_token(&req).unwrap(), "tok_abc123");
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(
            bearer_token(&req),
            Err(DispatchError::Unauthorized(_))
        ));
    }

    #[test]
    fn non_bearer_scheme_is_unauthorized() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .to_http_request();

        assert!(bearer_token(&req).is_err());
    }

    #[test]
    fn empty_token_is_unauthorized() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer "))
            .to_http_request();

        assert!(bearer_token(&req).is_err());
    }
}
