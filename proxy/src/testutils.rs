use http::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub accept: Option<String>,
}

/// A local stand-in for the Sheets API that answers every request with the
/// same canned response and records what it received.
pub struct MockUpstream {
    pub base_url: Url,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Path prefix the redirecting mock sends clients to.
pub const REDIRECT_PREFIX: &str = "/moved";

pub async fn start_mock_upstream(status: StatusCode, body: &'static str) -> MockUpstream {
    spawn_mock_upstream(status, body, Duration::ZERO, false).await
}

pub async fn start_slow_mock_upstream(
    status: StatusCode,
    body: &'static str,
    delay: Duration,
) -> MockUpstream {
    spawn_mock_upstream(status, body, delay, false).await
}

/// Answers `302 Found` pointing at the same path and query under
/// [`REDIRECT_PREFIX`], and serves `status`/`body` there.
pub async fn start_redirecting_mock_upstream(
    status: StatusCode,
    body: &'static str,
) -> MockUpstream {
    spawn_mock_upstream(status, body, Duration::ZERO, true).await
}

async fn spawn_mock_upstream(
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    redirect: bool,
) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to address");
    let port = listener.local_addr().unwrap().port();

    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let io = TokioIo::new(stream);
            let recorded = recorded.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let recorded = recorded.clone();
                    async move {
                        recorded.lock().unwrap().push(RecordedRequest {
                            method: req.method().to_string(),
                            path: req.uri().path().to_string(),
                            query: req.uri().query().map(str::to_string),
                            accept: req
                                .headers()
                                .get(ACCEPT)
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string),
                        });

                        tokio::time::sleep(delay).await;

                        let path = req.uri().path();
                        if redirect && !path.starts_with(REDIRECT_PREFIX) {
                            let location = match req.uri().query() {
                                Some(query) => format!("{REDIRECT_PREFIX}{path}?{query}"),
                                None => format!("{REDIRECT_PREFIX}{path}"),
                            };
                            let response = Response::builder()
                                .status(StatusCode::FOUND)
                                .header(LOCATION, location)
                                .body(Full::new(Bytes::new()))
                                .unwrap();
                            return Ok::<_, Infallible>(response);
                        }

                        let response = Response::builder()
                            .status(status)
                            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
                            .body(Full::new(Bytes::from_static(body.as_bytes())))
                            .unwrap();
                        Ok::<_, Infallible>(response)
                    }
                });

                let _ = Builder::new(TokioExecutor::new())
                    .serve_connection(io, service)
                    .await;
            });
        }
    });

    MockUpstream {
        base_url: Url::parse(&format!("http://127.0.0.1:{port}/v4/spreadsheets")).unwrap(),
        requests,
    }
}

/// Base URL of a port that nothing listens on.
pub async fn unreachable_base_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    Url::parse(&format!("http://127.0.0.1:{port}/v4/spreadsheets")).unwrap()
}
