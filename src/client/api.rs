//! Transport between the dashboard and the testimonial endpoints.
//!
//! Every request carries the session cookie so the server can resolve the
//! principal. Mutations are sent once; a failure is surfaced to the caller,
//! who may resubmit.

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::ClientConfig;
use crate::error::ErrorBody;
use crate::types::{NewTestimonial, Testimonial, TestimonialPatch};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status of a server-side rejection, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidUrl(_) => None,
        }
    }
}

/// The testimonial endpoints, as the dashboard consumes them.
#[async_trait]
pub trait TestimonyApi: Send + Sync {
    /// `GET /public/testimony/{user_id}`
    async fn list(&self, user_id: &str) -> Result<Vec<Testimonial>, ApiError>;
    /// `POST /testimony`
    async fn create(&self, new: &NewTestimonial) -> Result<Testimonial, ApiError>;
    /// `PATCH /testimony/{id}`
    async fn update(&self, id: i64, patch: &TestimonialPatch) -> Result<Testimonial, ApiError>;
    /// `DELETE /testimony/{id}`
    async fn delete(&self, id: i64) -> Result<(), ApiError>;
}

/// reqwest-backed [`TestimonyApi`].
#[derive(Debug, Clone)]
pub struct HttpTestimonyApi {
    client: reqwest::Client,
    base: Url,
    cookie: Option<String>,
}

impl HttpTestimonyApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&config.backend_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.backend_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.backend_url.clone()));
        }
        let cookie = config
            .session_token
            .as_ref()
            .map(|token| format!("{}={}", config.session_cookie, token));
        Ok(Self {
            client,
            base,
            cookie,
        })
    }

    /// Append path segments to the backend URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn with_credentials(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.cookie {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }
}

#[async_trait]
impl TestimonyApi for HttpTestimonyApi {
    async fn list(&self, user_id: &str) -> Result<Vec<Testimonial>, ApiError> {
        let url = self.endpoint(&["public", "testimony", user_id]);
        let response = self.with_credentials(self.client.get(url)).send().await?;
        read_json(response).await
    }

    async fn create(&self, new: &NewTestimonial) -> Result<Testimonial, ApiError> {
        let url = self.endpoint(&["testimony"]);
        let response = self
            .with_credentials(self.client.post(url))
            .json(new)
            .send()
            .await?;
        read_json(response).await
    }

    async fn update(&self, id: i64, patch: &TestimonialPatch) -> Result<Testimonial, ApiError> {
        let url = self.endpoint(&["testimony", &id.to_string()]);
        let response = self
            .with_credentials(self.client.patch(url))
            .json(patch)
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let url = self.endpoint(&["testimony", &id.to_string()]);
        let response = self.with_credentials(self.client.delete(url)).send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }
    Ok(response.json::<T>().await?)
}

async fn status_error(response: Response) -> ApiError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    ApiError::Status {
        status: status.as_u16(),
        message: error_message(status, &text),
    }
}

/// Prefer the server's `ErrorBody` message; fall back to the raw body, then
/// to the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error;
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}
