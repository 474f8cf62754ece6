//! Request adapter
//!
//! Wraps an inbound HTTP request into the read-mostly view scripts see.
//! The adapter is built once per request, before script invocation, and is
//! immutable afterwards except for the lazy parse caches behind
//! [`RequestAdapter::query_params`] and [`RequestAdapter::form_params`].
//!
//! Header lookup is case-insensitive, but the original header casing is
//! preserved for serialization into the script-visible `Headers` object.

use std::sync::OnceLock;

use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::{Method, Uri, Version};
use serde_json::{json, Value};

/// Read-mostly view of one inbound HTTP request.
#[derive(Debug, Clone)]
pub struct RequestAdapter {
    method: String,
    url: String,
    path: String,
    query: String,
    proto: String,
    remote_addr: String,
    headers: Vec<(String, String)>,
    body: Bytes,
    query_cache: OnceLock<Vec<(String, String)>>,
    form_cache: OnceLock<Vec<(String, String)>>,
}

impl RequestAdapter {
    /// Builds an adapter from the pieces of a Hyper request.
    ///
    /// The body must already be collected; the serving loop buffers it
    /// before dispatch so scripts never observe a partial body.
    pub fn new(
        method: &Method,
        uri: &Uri,
        version: Version,
        headers: &HeaderMap,
        body: Bytes,
        remote_addr: String,
    ) -> Self {
        let header_pairs = headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).to_string(),
                )
            })
            .collect();

        Self {
            method: method.as_str().to_string(),
            url: uri.to_string(),
            path: uri.path().to_string(),
            query: uri.query().unwrap_or("").to_string(),
            proto: format!("{:?}", version),
            remote_addr,
            headers: header_pairs,
            body,
            query_cache: OnceLock::new(),
            form_cache: OnceLock::new(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request target as received (path plus query string).
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn proto(&self) -> &str {
        &self.proto
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// All headers in arrival order with their original casing.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive lookup of the first value for a header name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn referrer(&self) -> &str {
        self.header("referer").unwrap_or("")
    }

    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or("")
    }

    /// Query-string fields, parsed lazily on first access.
    ///
    /// Populated only when the request method is `GET`; any other method
    /// yields an empty mapping. Callers are expected to check the method
    /// before parsing, mirroring the script-side `GET()` accessor.
    pub fn query_params(&self) -> &[(String, String)] {
        if self.method != "GET" {
            return &[];
        }
        self.query_cache
            .get_or_init(|| parse_form_encoded(&self.query))
    }

    /// Form-encoded body fields, parsed lazily on first access.
    ///
    /// Populated only when the request method matches `expected_method`
    /// (`POST` or `PUT`); a mismatch yields an empty mapping rather than
    /// an error.
    pub fn form_params(&self, expected_method: &str) -> &[(String, String)] {
        if self.method != expected_method {
            return &[];
        }
        self.form_cache
            .get_or_init(|| parse_form_encoded(&String::from_utf8_lossy(&self.body)))
    }

    /// Public surface of the adapter as a JSON value.
    ///
    /// This is the shape `JSON.stringify(req)` exposes to scripts: only
    /// the documented fields, never the parse caches or the raw body
    /// buffer. Multi-valued headers collect into arrays under their
    /// original casing.
    pub fn public_json(&self) -> Value {
        let mut headers = serde_json::Map::new();
        for (name, value) in &self.headers {
            match headers.get_mut(name.as_str()) {
                Some(Value::Array(values)) => values.push(json!(value)),
                _ => {
                    headers.insert(name.clone(), json!([value]));
                }
            }
        }

        json!({
            "Method": self.method,
            "URL": self.url,
            "Proto": self.proto,
            "Headers": headers,
            "Referrer": self.referrer(),
            "UserAgent": self.user_agent(),
        })
    }
}

/// Parses a form-encoded string into ordered (name, value) pairs.
///
/// Malformed percent-encoding decodes best-effort (invalid sequences become
/// replacement characters) rather than failing the request.
pub fn parse_form_encoded(input: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(input.as_bytes())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect()
}
