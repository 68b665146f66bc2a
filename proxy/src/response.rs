use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred.";

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Serializes `value` as the response body.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Bytes> {
    match serde_json::to_vec(value) {
        Ok(body) => make_json_response(status, Bytes::from(body)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            make_json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"error":"An internal server error occurred."}"#),
            )
        }
    }
}

/// `{"error": message}` with the given status.
pub fn error_response(status: StatusCode, message: &str) -> Response<Bytes> {
    json_response(status, &ErrorBody { error: message })
}

fn make_json_response(status: StatusCode, body: Bytes) -> Response<Bytes> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    response
}
