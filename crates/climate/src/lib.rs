//! Client for the Climate FieldView partner API: OAuth2 login and token
//! exchange, field/boundary retrieval, scouting observations, paginated
//! activity layers, and chunked file upload.
//!
//! [`ClimateApi`] is the seam the web layer talks through; [`ClimateClient`]
//! is the reqwest-backed implementation.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use url::Url;

use shared::domain::{Activity, ActivityPage, Authorization, Field};
use shared::error::ApiError;

mod client;

pub use client::ClimateClient;

const DEFAULT_LOGIN_BASE: &str = "https://climate.com/static/app-login/index.html";
const DEFAULT_TOKEN_URL: &str = "https://api.climate.com/api/oauth/token";
const DEFAULT_API_BASE: &str = "https://platform.climate.com";

/// Partner credentials plus endpoint bases. The bases default to the public
/// platform and only move for testing against a stand-in service.
#[derive(Debug, Clone)]
pub struct ClimateConfig {
    pub client_id: String,
    pub client_secret: String,
    pub scopes: String,
    pub api_key: String,
    pub login_base: Url,
    pub token_url: Url,
    pub api_base: Url,
}

impl ClimateConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scopes: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes: scopes.into(),
            api_key: api_key.into(),
            login_base: Url::parse(DEFAULT_LOGIN_BASE).expect("static url"),
            token_url: Url::parse(DEFAULT_TOKEN_URL).expect("static url"),
            api_base: Url::parse(DEFAULT_API_BASE).expect("static url"),
        }
    }

    /// The "Log In with FieldView" URL a browser is sent to. The platform
    /// redirects back to `redirect_uri` with a one-time `code`.
    pub fn login_uri(&self, redirect_uri: &str) -> String {
        let mut url = self.login_base.clone();
        url.query_pairs_mut()
            .append_pair("scope", &self.scopes)
            .append_pair("page", "oidcauthn")
            .append_pair("mobile-ui", "true")
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("client_id", &self.client_id);
        url.into()
    }
}

#[async_trait]
pub trait ClimateApi: Send + Sync {
    fn login_uri(&self, redirect_uri: &str) -> String;

    async fn authorize(&self, code: &str, redirect_uri: &str)
        -> Result<Authorization, ApiError>;
    async fn reauthorize(&self, refresh_token: &str) -> Result<Authorization, ApiError>;

    async fn fields(&self, token: &str) -> Result<Vec<Field>, ApiError>;
    async fn boundary(&self, token: &str, boundary_id: &str) -> Result<Value, ApiError>;

    /// Chunked upload of `data`; returns the platform-assigned upload id.
    async fn upload(
        &self,
        token: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<String, ApiError>;
    async fn upload_status(&self, token: &str, upload_id: &str) -> Result<Value, ApiError>;

    async fn scouting_observations(&self, token: &str, limit: u32)
        -> Result<Vec<Value>, ApiError>;
    async fn scouting_observation(&self, token: &str, id: &str) -> Result<Value, ApiError>;
    async fn scouting_observation_attachments(
        &self,
        token: &str,
        id: &str,
    ) -> Result<Vec<Value>, ApiError>;
    async fn attachment_contents(
        &self,
        token: &str,
        observation_id: &str,
        attachment_id: &str,
        content_type: &str,
        length: u64,
    ) -> Result<Bytes, ApiError>;

    /// One page of an activity layer; `next_token` resumes a prior listing.
    async fn activities(
        &self,
        token: &str,
        activity: Activity,
        next_token: Option<&str>,
    ) -> Result<ActivityPage, ApiError>;
    async fn activity_contents(
        &self,
        token: &str,
        activity: Activity,
        activity_id: &str,
        length: u64,
    ) -> Result<Bytes, ApiError>;
}
