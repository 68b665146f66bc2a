use crate::http::make_boxed_error_response;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

/// Serves `/health` (always ok) and `/ready` (ok once `is_ready` returns true).
pub struct AdminService<F, E> {
    is_ready: F,
    _error: PhantomData<fn() -> E>,
}

impl<F, E> AdminService<F, E>
where
    F: Fn() -> bool,
{
    pub fn new(is_ready: F) -> Self {
        Self {
            is_ready,
            _error: PhantomData,
        }
    }
}

impl<F, E> Service<Request<Incoming>> for AdminService<F, E>
where
    F: Fn() -> bool,
    E: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, E>>;
    type Error = E;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let response = admin_response(req.method(), req.uri().path(), (self.is_ready)());
        Box::pin(async move { Ok(response) })
    }
}

fn admin_response<E: 'static>(
    method: &Method,
    path: &str,
    is_ready: bool,
) -> Response<BoxBody<Bytes, E>> {
    let ok_body = || Full::new(Bytes::from("ok\n")).map_err(|e| match e {}).boxed();

    if method != Method::GET && method != Method::HEAD {
        return make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED);
    }

    match path {
        "/health" => Response::new(ok_body()),
        "/ready" => match is_ready {
            true => Response::new(ok_body()),
            false => make_boxed_error_response(StatusCode::SERVICE_UNAVAILABLE),
        },
        _ => make_boxed_error_response(StatusCode::NOT_FOUND),
    }
}
