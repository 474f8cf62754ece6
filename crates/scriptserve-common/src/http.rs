//! HTTP helpers
//!
//! Type aliases for the Hyper request/response types used throughout the
//! server, plus small constructors for plain-text responses. Response
//! construction goes through `headers_mut`/`status_mut` so the builders are
//! infallible.

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};

/// Type alias for Hyper incoming requests.
pub type HyperRequest = Request<Incoming>;

/// Type alias for Hyper responses with a fully buffered body.
pub type HyperResponse = Response<Full<Bytes>>;

/// Builds a plain-text response with the given status code.
pub fn text_response(status: StatusCode, body: impl Into<Bytes>) -> HyperResponse {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

/// Builds the generic response for a status code, using its canonical
/// reason phrase as the body.
pub fn status_response(status: StatusCode) -> HyperResponse {
    let body = status.canonical_reason().unwrap_or("Error").to_string();
    text_response(status, body)
}
