use crate::config::ValidationError;
use crate::response::INTERNAL_ERROR_MESSAGE;
use crate::sheets_client::FetchError;
use crate::validation::InvalidInput;
use http::StatusCode;
use std::io;

/// Errors that stop the proxy from starting or serving.
#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
    #[error("could not build upstream HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Everything that can go wrong while answering a single request.
///
/// The `Display` text is what the client sees, except for an unusable
/// upstream base URL, which is replaced by a generic message (see
/// [`RequestError::client_message`]).
#[derive(thiserror::Error, Debug)]
pub enum RequestError {
    #[error("Method not allowed. Only GET requests are supported.")]
    MethodNotAllowed,

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),

    #[error("GOOGLE_SHEETS_API_KEY environment variable is not set.")]
    MissingApiKey,

    #[error("Failed to fetch data from Google Sheets API: {0}")]
    Fetch(#[from] FetchError),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RequestError::MissingParameter(_) | RequestError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            RequestError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            RequestError::Fetch(e) => match e {
                FetchError::Network(_) => StatusCode::INTERNAL_SERVER_ERROR,
                // The upstream status code is never forwarded.
                FetchError::Upstream { .. } | FetchError::MalformedResponse(_) => {
                    StatusCode::BAD_GATEWAY
                }
                FetchError::InvalidBaseUrl(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn client_message(&self) -> String {
        match self {
            RequestError::Fetch(FetchError::InvalidBaseUrl(_)) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::MethodNotAllowed => "method_not_allowed",
            RequestError::MissingParameter(_) => "missing_parameter",
            RequestError::InvalidInput(_) => "invalid_input",
            RequestError::MissingApiKey => "missing_configuration",
            RequestError::Fetch(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Field;
    use url::Url;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            RequestError::MethodNotAllowed.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            RequestError::MissingParameter("sheet").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RequestError::from(InvalidInput::Empty(Field::Range)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RequestError::MissingApiKey.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let upstream = RequestError::from(FetchError::Upstream {
            status: StatusCode::NOT_FOUND,
            message: "Requested entity was not found.".into(),
        });
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);

        let malformed = RequestError::from(FetchError::MalformedResponse(
            serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        ));
        assert_eq!(malformed.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_client_messages() {
        let upstream = RequestError::from(FetchError::Upstream {
            status: StatusCode::FORBIDDEN,
            message: "The caller does not have permission".into(),
        });
        assert_eq!(
            upstream.client_message(),
            "Failed to fetch data from Google Sheets API: The caller does not have permission"
        );

        let malformed = RequestError::from(FetchError::MalformedResponse(
            serde_json::from_str::<serde_json::Value>("nope").unwrap_err(),
        ));
        assert_eq!(
            malformed.client_message(),
            "Failed to fetch data from Google Sheets API: Invalid JSON response from API"
        );
    }

    #[test]
    fn test_internal_errors_are_not_exposed() {
        let err = RequestError::from(FetchError::InvalidBaseUrl(
            Url::parse("mailto:ops@example.com").unwrap(),
        ));

        assert!(matches!(
            err,
            RequestError::Fetch(FetchError::InvalidBaseUrl(_))
        ));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), INTERNAL_ERROR_MESSAGE);
        assert_eq!(err.kind(), "invalid_base_url");
        assert!(err.to_string().contains("mailto:ops@example.com"));
    }
}
