//! HobbyHub backend API client
//!
//! Used by the location service to push positions and sharing settings,
//! and by the CLI to run nearby queries against a running server.

use crate::config::ApiConfig;
use crate::constants::api::API_PREFIX;
use crate::error::{Error, Result};
use crate::location::{LocationUpdate, SharingSettings};
use crate::server::routes::{ErrorBody, NearbyResponse, RefreshRequest, TokenResponse};
use crate::storage::TokenStore;
use crate::store::{ContentKind, NearbyQuery};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Where the location service sends what it learns
pub trait LocationSync: Send + Sync {
    /// Report the device position
    fn push_location(
        &self,
        update: &LocationUpdate,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Report changed sharing settings
    fn update_settings(
        &self,
        settings: &SharingSettings,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// HTTP client for the backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
}

impl ApiClient {
    pub fn new(base_url: &str, tokens: Arc<TokenStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn from_config(config: &ApiConfig, tokens: Arc<TokenStore>) -> Self {
        Self::new(&config.base_url, tokens)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// Query string for a nearby request
    fn nearby_params(kind: ContentKind, query: &NearbyQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("latitude", query.coordinate.latitude.to_string()),
            ("longitude", query.coordinate.longitude.to_string()),
            ("radius", query.radius_km.to_string()),
        ];
        if let Some(category) = query.category {
            let key = match kind {
                ContentKind::Event => "hobbyType",
                ContentKind::Hobby => "category",
            };
            params.push((key, category.to_string()));
        }
        params
    }

    /// Map a non-success response to an error
    async fn error_for(response: reqwest::Response) -> Error {
        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };

        match status {
            reqwest::StatusCode::BAD_REQUEST => Error::Validation(message),
            reqwest::StatusCode::UNAUTHORIZED => Error::Unauthorized(message),
            reqwest::StatusCode::NOT_FOUND => Error::NotFound(message),
            _ => Error::Server(message),
        }
    }

    /// Nearby events or hobbies around a point
    pub async fn nearby(&self, kind: ContentKind, query: &NearbyQuery) -> Result<NearbyResponse> {
        let path = match kind {
            ContentKind::Event => "/events/nearby",
            ContentKind::Hobby => "/hobbies/nearby",
        };

        let response = self
            .client
            .get(self.url(path))
            .query(&Self::nearby_params(kind, query))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        Ok(response.json().await?)
    }

    /// Exchange the stored refresh token for a new pair
    pub async fn refresh_tokens(&self) -> Result<()> {
        let refresh_token = self
            .tokens
            .refresh_token()?
            .ok_or_else(|| Error::Unauthorized("no refresh token stored".to_string()))?;

        let response = self
            .client
            .post(self.url("/auth/refresh"))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let pair: TokenResponse = response.json().await?;
        self.tokens.save_tokens(&pair.access_token, &pair.refresh_token)?;
        info!("access token refreshed");
        Ok(())
    }

    async fn send_authed<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = self.tokens.access_token()? {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    /// POST with the access token; on 401 refresh once and retry
    async fn post_authed<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let mut response = self.send_authed(path, body).await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            && self.tokens.refresh_token()?.is_some()
        {
            debug!(path, "access token rejected, refreshing");
            self.refresh_tokens().await?;
            response = self.send_authed(path, body).await?;
        }

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        Ok(())
    }
}

impl LocationSync for ApiClient {
    async fn push_location(&self, update: &LocationUpdate) -> Result<()> {
        self.post_authed("/users/location", update).await
    }

    async fn update_settings(&self, settings: &SharingSettings) -> Result<()> {
        self.post_authed("/users/location/settings", settings).await
    }
}
