use hyper::header::CONTENT_TYPE;
use hyper::http::HeaderValue;
use hyper::{Body, Response, StatusCode};
use serde_json::json;
use std::error::Error;

use crate::model::FieldErrors;

pub(super) const FALLBACK_MESSAGE: &str = "An unexpected error occurred";

/// A result of an HTTP operation
pub(super) type HttpResult<T> = Result<T, Box<dyn HttpError>>;

/// A generic HTTP error trait
pub(super) trait HttpError: Send {
    /// Returns the status code of this error
    fn status(&self) -> StatusCode;

    /// JSON body sent along with the status, if any
    fn body(&self) -> Option<serde_json::Value> {
        None
    }
}

impl From<Box<dyn HttpError>> for Response<Body> {
    fn from(err: Box<dyn HttpError>) -> Self {
        let mut res = match err.body() {
            Some(body) => {
                let mut res = Response::new(Body::from(body.to_string()));
                res.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                res
            }
            None => Response::default(),
        };
        *res.status_mut() = err.status();
        res
    }
}

#[derive(Debug)]
pub struct InternalServerError;

impl HttpError for InternalServerError {
    fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn body(&self) -> Option<serde_json::Value> {
        Some(json!({ "error": FALLBACK_MESSAGE }))
    }
}

/// Allows to convert any kind of error to a 500 Internal Server Error using `?`
impl<E: Into<Box<dyn Error>>> From<E> for Box<dyn HttpError> {
    fn from(_err: E) -> Self {
        Box::new(InternalServerError)
    }
}

#[derive(Debug)]
pub struct BadRequest;

impl HttpError for BadRequest {
    fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

/// The remote store failed; the message already carries the operation prefix.
#[derive(Debug)]
pub struct BadGateway(pub String);

impl HttpError for BadGateway {
    fn status(&self) -> StatusCode {
        StatusCode::BAD_GATEWAY
    }

    fn body(&self) -> Option<serde_json::Value> {
        Some(json!({ "error": self.0 }))
    }
}

/// The store was never configured.
#[derive(Debug)]
pub struct ServiceUnavailable(pub String);

impl HttpError for ServiceUnavailable {
    fn status(&self) -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }

    fn body(&self) -> Option<serde_json::Value> {
        Some(json!({ "error": self.0 }))
    }
}

#[derive(Debug)]
pub struct Unprocessable(pub FieldErrors);

impl HttpError for Unprocessable {
    fn status(&self) -> StatusCode {
        StatusCode::UNPROCESSABLE_ENTITY
    }

    fn body(&self) -> Option<serde_json::Value> {
        Some(json!({ "errors": self.0 }))
    }
}

pub(super) fn to_http_err<E: Error, H: HttpError + 'static>(
    http_err: H,
) -> impl FnOnce(E) -> Box<dyn HttpError> {
    move |_err| -> Box<dyn HttpError> { Box::new(http_err) }
}
