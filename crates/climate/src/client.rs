use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use shared::domain::{Activity, ActivityPage, Authorization, Field};
use shared::error::{ApiError, ErrorCode};

use crate::{ClimateApi, ClimateConfig};

/// Upload bodies are sent in ranged PUTs of this size.
const UPLOAD_CHUNK_BYTES: usize = 5 * 1024 * 1024;

const NEXT_TOKEN_HEADER: &str = "x-next-token";
const API_KEY_HEADER: &str = "x-api-key";

pub struct ClimateClient {
    cfg: ClimateConfig,
    http: reqwest::Client,
}

/// Paginated platform responses wrap their items in a `results` array.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ResultsEnvelope<T> {
    #[serde(default)]
    results: Vec<T>,
}

impl ClimateClient {
    pub fn new(cfg: ClimateConfig) -> Self {
        Self {
            cfg,
            http: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> Result<Url, ApiError> {
        self.cfg
            .api_base
            .join(path)
            .map_err(|e| ApiError::internal(format!("bad api path '{path}': {e}")))
    }

    fn signed(&self, req: reqwest::RequestBuilder, token: &str) -> reqwest::RequestBuilder {
        req.bearer_auth(token).header(API_KEY_HEADER, &self.cfg.api_key)
    }

    async fn token_exchange(&self, params: &[(&str, &str)]) -> Result<Authorization, ApiError> {
        let response = self
            .http
            .post(self.cfg.token_url.clone())
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .form(params)
            .send()
            .await
            .map_err(transport)?;
        let response = checked(response).await?;
        response
            .json::<Authorization>()
            .await
            .map_err(|e| ApiError::upstream(format!("malformed token response: {e}")))
    }

    async fn get_json(&self, url: Url, token: &str) -> Result<Value, ApiError> {
        let response = self.signed(self.http.get(url), token).send().await.map_err(transport)?;
        let response = checked(response).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::upstream(format!("malformed response body: {e}")))
    }

    async fn get_ranged_bytes(
        &self,
        url: Url,
        token: &str,
        content_type: &str,
        length: u64,
    ) -> Result<Bytes, ApiError> {
        let range = format!("bytes=0-{}", length.saturating_sub(1));
        let response = self
            .signed(self.http.get(url), token)
            .header(header::RANGE, range)
            .header(header::ACCEPT, content_type)
            .send()
            .await
            .map_err(transport)?;
        let response = checked(response).await?;
        response
            .bytes()
            .await
            .map_err(|e| ApiError::upstream(format!("content download interrupted: {e}")))
    }
}

#[async_trait]
impl ClimateApi for ClimateClient {
    fn login_uri(&self, redirect_uri: &str) -> String {
        self.cfg.login_uri(redirect_uri)
    }

    async fn authorize(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Authorization, ApiError> {
        self.token_exchange(&[
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
            ("code", code),
        ])
        .await
    }

    async fn reauthorize(&self, refresh_token: &str) -> Result<Authorization, ApiError> {
        self.token_exchange(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn fields(&self, token: &str) -> Result<Vec<Field>, ApiError> {
        let response = self
            .signed(self.http.get(self.api_url("/v4/fields")?), token)
            .send()
            .await
            .map_err(transport)?;
        let response = checked(response).await?;
        let envelope: ResultsEnvelope<Field> = response
            .json()
            .await
            .map_err(|e| ApiError::upstream(format!("malformed fields response: {e}")))?;
        Ok(envelope.results)
    }

    async fn boundary(&self, token: &str, boundary_id: &str) -> Result<Value, ApiError> {
        self.get_json(self.api_url(&format!("/v4/boundaries/{boundary_id}"))?, token)
            .await
    }

    async fn upload(
        &self,
        token: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<String, ApiError> {
        if data.is_empty() {
            return Err(ApiError::new(
                ErrorCode::Validation,
                "upload body cannot be empty",
            ));
        }

        let init = serde_json::json!({
            "contentType": content_type,
            "length": data.len(),
        });
        let response = self
            .signed(self.http.post(self.api_url("/v4/uploads")?), token)
            .json(&init)
            .send()
            .await
            .map_err(transport)?;
        let response = checked(response).await?;
        let upload_id: String = response
            .json()
            .await
            .map_err(|e| ApiError::upstream(format!("malformed upload id: {e}")))?;

        let total = data.len();
        let chunk_url = self.api_url(&format!("/v4/uploads/{upload_id}"))?;
        for (index, chunk) in data.chunks(UPLOAD_CHUNK_BYTES).enumerate() {
            let start = index * UPLOAD_CHUNK_BYTES;
            debug!(%upload_id, start, len = chunk.len(), "uploading chunk");
            let response = self
                .signed(self.http.put(chunk_url.clone()), token)
                .header(header::CONTENT_RANGE, content_range(start, chunk.len(), total))
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .body(chunk.to_vec())
                .send()
                .await
                .map_err(transport)?;
            checked(response).await?;
        }

        Ok(upload_id)
    }

    async fn upload_status(&self, token: &str, upload_id: &str) -> Result<Value, ApiError> {
        self.get_json(self.api_url(&format!("/v4/uploads/{upload_id}/status"))?, token)
            .await
    }

    async fn scouting_observations(
        &self,
        token: &str,
        limit: u32,
    ) -> Result<Vec<Value>, ApiError> {
        let mut url = self.api_url("/v4/scoutingObservations")?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        let envelope: ResultsEnvelope<Value> =
            serde_json::from_value(self.get_json(url, token).await?)
                .map_err(|e| ApiError::upstream(format!("malformed observations list: {e}")))?;
        Ok(envelope.results)
    }

    async fn scouting_observation(&self, token: &str, id: &str) -> Result<Value, ApiError> {
        self.get_json(self.api_url(&format!("/v4/scoutingObservations/{id}"))?, token)
            .await
    }

    async fn scouting_observation_attachments(
        &self,
        token: &str,
        id: &str,
    ) -> Result<Vec<Value>, ApiError> {
        let url = self.api_url(&format!("/v4/scoutingObservations/{id}/attachments"))?;
        let envelope: ResultsEnvelope<Value> =
            serde_json::from_value(self.get_json(url, token).await?)
                .map_err(|e| ApiError::upstream(format!("malformed attachments list: {e}")))?;
        Ok(envelope.results)
    }

    async fn attachment_contents(
        &self,
        token: &str,
        observation_id: &str,
        attachment_id: &str,
        content_type: &str,
        length: u64,
    ) -> Result<Bytes, ApiError> {
        let url = self.api_url(&format!(
            "/v4/scoutingObservations/{observation_id}/attachments/{attachment_id}/contents"
        ))?;
        self.get_ranged_bytes(url, token, content_type, length).await
    }

    async fn activities(
        &self,
        token: &str,
        activity: Activity,
        next_token: Option<&str>,
    ) -> Result<ActivityPage, ApiError> {
        let url = self.api_url(&format!("/v4/layers/{}", activity.layer_name()))?;
        let mut request = self.signed(self.http.get(url), token);
        if let Some(cursor) = next_token {
            request = request.header(NEXT_TOKEN_HEADER, cursor);
        }
        let response = request.send().await.map_err(transport)?;
        let response = checked(response).await?;

        let next_token = response
            .headers()
            .get(NEXT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let envelope: ResultsEnvelope<Value> = response
            .json()
            .await
            .map_err(|e| ApiError::upstream(format!("malformed activity page: {e}")))?;

        Ok(ActivityPage {
            items: envelope.results,
            next_token,
        })
    }

    async fn activity_contents(
        &self,
        token: &str,
        activity: Activity,
        activity_id: &str,
        length: u64,
    ) -> Result<Bytes, ApiError> {
        let url = self.api_url(&format!(
            "/v4/layers/{}/{activity_id}/contents",
            activity.layer_name()
        ))?;
        self.get_ranged_bytes(url, token, "application/zip", length).await
    }
}

fn content_range(start: usize, len: usize, total: usize) -> String {
    format!("bytes {}-{}/{}", start, start + len - 1, total)
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::upstream(format!("climate api unreachable: {err}"))
}

/// Pass successful responses through; turn platform failures into the
/// error kinds the routes surface (expired auth, missing records, upstream
/// trouble).
async fn checked(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(error_for(status, body))
}

fn error_for(status: StatusCode, body: String) -> ApiError {
    let message = if body.is_empty() {
        format!("climate api returned {status}")
    } else {
        format!("climate api returned {status}: {body}")
    };
    let code = match status {
        StatusCode::UNAUTHORIZED => ErrorCode::AuthExpired,
        StatusCode::FORBIDDEN => ErrorCode::Unauthorized,
        StatusCode::NOT_FOUND => ErrorCode::NotFound,
        s if s.is_client_error() => ErrorCode::Validation,
        _ => ErrorCode::Upstream,
    };
    ApiError::new(code, message)
}
