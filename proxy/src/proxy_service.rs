use crate::api_key::{API_KEY_ENV_VAR, ApiKey};
use crate::errors::{ProxyError, RequestError};
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT, UPSTREAM_ERRORS};
use crate::response::{error_response, json_response};
use crate::sheets_client::{FetchError, ValuesFetcher, ValuesRequest};
use crate::validation::{validate_range, validate_sheet_name, validate_spreadsheet_id};
use bytes::Bytes;
use http::header::{ALLOW, HeaderValue};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::Service as HyperService;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::Value as JsonValue;
use shared::{counter, gauge, histogram};
use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use url::form_urlencoded;

/// Answers `GET /?spreadsheet_id=..&sheet=..[&range=..]` with the values
/// read from the Sheets API.
///
/// The service holds no per-request state; cloning it is cheap and every
/// request is handled independently.
#[derive(Clone)]
pub struct ProxyService {
    fetcher: Arc<dyn ValuesFetcher>,
    api_key: Option<ApiKey>,
}

impl ProxyService {
    pub fn new(fetcher: Arc<dyn ValuesFetcher>, api_key: Option<ApiKey>) -> Self {
        Self { fetcher, api_key }
    }

    pub fn is_ready(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn handle<B>(&self, request: Request<B>) -> Response<Bytes> {
        let (parts, _body) = request.into_parts();

        match self.fetch(&parts.method, parts.uri.query()).await {
            Ok(values) => json_response(StatusCode::OK, &values),
            Err(err) => {
                log_request_error(&err);

                let mut response = error_response(err.status(), &err.client_message());
                if let RequestError::MethodNotAllowed = err {
                    response
                        .headers_mut()
                        .insert(ALLOW, HeaderValue::from_static("GET"));
                }
                response
            }
        }
    }

    async fn fetch(&self, method: &Method, query: Option<&str>) -> Result<JsonValue, RequestError> {
        if method != Method::GET {
            return Err(RequestError::MethodNotAllowed);
        }

        let values_request = parse_values_request(query)?;
        let api_key = self.api_key.as_ref().ok_or(RequestError::MissingApiKey)?;

        let values = self.fetcher.fetch_values(&values_request, api_key).await?;
        Ok(values)
    }
}

impl HyperService<Request<Incoming>> for ProxyService {
    type Response = Response<BoxBody<Bytes, ProxyError>>;
    type Error = ProxyError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();

        Box::pin(async move {
            let start = Instant::now();
            let _inflight = InflightGuard::new();

            let response = service.handle(req).await;

            histogram!(REQUEST_DURATION, "status" => response.status().as_u16().to_string())
                .record(start.elapsed().as_secs_f64());

            Ok(response.map(|body| Full::new(body).map_err(|e| match e {}).boxed()))
        })
    }
}

/// Presence is checked first (`spreadsheet_id` before `sheet`), then every
/// field is validated. A repeated parameter takes its last value.
fn parse_values_request(query: Option<&str>) -> Result<ValuesRequest, RequestError> {
    let params: HashMap<Cow<'_, str>, Cow<'_, str>> =
        form_urlencoded::parse(query.unwrap_or_default().as_bytes()).collect();

    let spreadsheet_id = params
        .get("spreadsheet_id")
        .ok_or(RequestError::MissingParameter("spreadsheet_id"))?;
    let sheet = params
        .get("sheet")
        .ok_or(RequestError::MissingParameter("sheet"))?;

    Ok(ValuesRequest {
        spreadsheet_id: validate_spreadsheet_id(spreadsheet_id)?,
        sheet_name: validate_sheet_name(sheet)?,
        range: validate_range(params.get("range").map(|range| range.as_ref()))?,
    })
}

fn log_request_error(err: &RequestError) {
    match err {
        RequestError::MethodNotAllowed | RequestError::MissingParameter(_) => {
            tracing::debug!(kind = err.kind(), error = %err, "Rejected request");
        }
        RequestError::InvalidInput(invalid) => {
            tracing::debug!(
                kind = err.kind(),
                field = %invalid.field(),
                error = %err,
                "Rejected request"
            );
        }
        RequestError::MissingApiKey => {
            tracing::error!("Cannot serve request: {API_KEY_ENV_VAR} is not set");
        }
        RequestError::Fetch(fetch_error @ FetchError::InvalidBaseUrl(_)) => {
            tracing::error!(
                kind = err.kind(),
                error = %fetch_error,
                "Unexpected error while handling request"
            );
        }
        RequestError::Fetch(fetch_error) => {
            counter!(UPSTREAM_ERRORS, "kind" => fetch_error.kind()).increment(1);
            tracing::warn!(kind = fetch_error.kind(), error = %fetch_error, "Upstream request failed");
        }
    }
}

struct InflightGuard;

impl InflightGuard {
    fn new() -> Self {
        gauge!(REQUESTS_INFLIGHT).increment(1.0);
        InflightGuard
    }
}

// Runs on completion and when the client goes away mid-request.
impl Drop for InflightGuard {
    fn drop(&mut self) {
        gauge!(REQUESTS_INFLIGHT).decrement(1.0);
    }
}
