//! Client for the Google Sheets `values.get` endpoint.
//!
//! One GET per call, no retries. Transport failures, non-200 answers and
//! undecodable bodies each map to their own [`FetchError`] variant.

use crate::api_key::ApiKey;
use async_trait::async_trait;
use http::StatusCode;
use reqwest::header::{ACCEPT, HeaderValue};
use serde_json::Value as JsonValue;
use std::error::Error as StdError;
use std::time::Duration;
use url::Url;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Validated parameters of a single values read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesRequest {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub range: Option<String>,
}

impl ValuesRequest {
    /// The `sheet[!range]` string the upstream API expects.
    pub fn target(&self) -> String {
        match &self.range {
            Some(range) => format!("{}!{}", self.sheet_name, range),
            None => self.sheet_name.clone(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("Network request failed: {}", error_chain(.0))]
    Network(reqwest::Error),

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("Invalid JSON response from API")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("base URL {0} cannot be extended with path segments")]
    InvalidBaseUrl(Url),
}

impl FetchError {
    // reqwest errors carry the request URL, and with it the API key.
    fn network(error: reqwest::Error) -> Self {
        FetchError::Network(error.without_url())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Upstream { .. } => "upstream",
            FetchError::MalformedResponse(_) => "malformed_response",
            FetchError::InvalidBaseUrl(_) => "invalid_base_url",
        }
    }
}

/// Source of spreadsheet values. The handler only depends on this trait.
#[async_trait]
pub trait ValuesFetcher: Send + Sync {
    async fn fetch_values(
        &self,
        request: &ValuesRequest,
        api_key: &ApiKey,
    ) -> Result<JsonValue, FetchError>;
}

#[derive(Clone, Debug)]
pub struct SheetsClient {
    client: reqwest::Client,
    base_url: Url,
}

impl SheetsClient {
    pub fn new(base_url: Url) -> Result<Self, reqwest::Error> {
        Self::with_timeouts(base_url, REQUEST_TIMEOUT, CONNECT_TIMEOUT)
    }

    pub(crate) fn with_timeouts(
        base_url: Url,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        // No option disables certificate verification.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// `{base}/{spreadsheet_id}/values/{target}?key={api_key}`, with every
    /// component percent-encoded on its own.
    pub(crate) fn values_url(
        &self,
        request: &ValuesRequest,
        api_key: &ApiKey,
    ) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push(&request.spreadsheet_id)
            .push("values")
            .push(&request.target());
        url.query_pairs_mut().append_pair("key", api_key.expose());

        Ok(url)
    }
}

#[async_trait]
impl ValuesFetcher for SheetsClient {
    async fn fetch_values(
        &self,
        request: &ValuesRequest,
        api_key: &ApiKey,
    ) -> Result<JsonValue, FetchError> {
        let url = self.values_url(request, api_key)?;

        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(FetchError::network)?;

        let status = response.status();
        let body = response.bytes().await.map_err(FetchError::network)?;

        if status != StatusCode::OK {
            return Err(FetchError::Upstream {
                status,
                message: upstream_error_message(status, &body),
            });
        }

        serde_json::from_slice(&body).map_err(FetchError::MalformedResponse)
    }
}

/// Picks `error.message` out of a Google API error body, if there is one.
fn upstream_error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<JsonValue>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(JsonValue::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| format!("API request failed with HTTP {}", status.as_u16()))
}

/// Joins an error with its sources, e.g.
/// `error sending request: client error (Connect): tcp connect error: ...`.
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();

    while let Some(cause) = source {
        let cause_message = cause.to_string();
        if !message.ends_with(&cause_message) {
            message.push_str(": ");
            message.push_str(&cause_message);
        }
        source = cause.source();
    }

    message
}
