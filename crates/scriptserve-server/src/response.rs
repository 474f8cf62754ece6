//! Response sink
//!
//! [`ResponseState`] is the staging record a script mutates during
//! execution. Both access paths scripts use (the `setHeader`/`setContent`
//! methods and direct assignment of `code`/`headers`/`content`) end up in
//! this one record, which is only turned into a wire response after the
//! script has finished. Nothing is transmitted before finalization, so a
//! failed run never leaks partial writes to the client.

use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use http_body_util::Full;
use hyper::body::Bytes;
use serde_json::Value;

use scriptserve_common::http::HyperResponse;

/// Header names whose values accumulate across `setHeader` calls instead
/// of replacing each other.
const MULTI_VALUE_HEADERS: &[&str] = &["set-cookie"];

/// True when values for this header accumulate instead of replacing.
pub(crate) fn is_multi_value_header(name: &str) -> bool {
    MULTI_VALUE_HEADERS.contains(&name.to_lowercase().as_str())
}

/// Staged response state accumulated by one script run.
#[derive(Debug, Clone)]
pub struct ResponseState {
    /// HTTP status code, defaults to 200.
    pub code: u16,
    /// Headers in insertion order. Names are stored lowercased; lookup and
    /// replacement are case-insensitive.
    headers: Vec<(String, String)>,
    /// Staged body, replaced wholesale by `setContent`.
    pub content: String,
    /// Fallback content type, used only when no `content-type` header was
    /// set explicitly.
    pub content_type: Option<String>,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            code: 200,
            headers: Vec::new(),
            content: String::new(),
            content_type: None,
        }
    }
}

impl ResponseState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a header. Last write wins per case-insensitive name, except
    /// for multi-value headers (`Set-Cookie`), whose values accumulate in
    /// call order.
    pub fn set_header(&mut self, name: &str, value: &str) {
        let lowered = name.to_lowercase();
        if !MULTI_VALUE_HEADERS.contains(&lowered.as_str()) {
            self.headers.retain(|(n, _)| n != &lowered);
        }
        self.headers.push((lowered, value.to_string()));
    }

    /// Case-insensitive lookup of the last staged value for a name.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        let lowered = name.to_lowercase();
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n == &lowered)
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Replaces the staged body.
    pub fn set_content(&mut self, body: &str) {
        self.content = body.to_string();
    }

    /// Merges a script-assigned `headers` value into the staged headers.
    ///
    /// Scripts assign headers in two shapes: a plain object
    /// (`{"Content-Type": "text/html"}`) or an array of single-entry
    /// objects (`[{"Content-Type": "text/html"}]`). Values may be strings,
    /// numbers, or arrays of either. Anything else is ignored.
    pub fn merge_headers_value(&mut self, value: &Value) {
        match value {
            Value::Object(map) => {
                for (name, entry) in map {
                    self.merge_header_entry(name, entry);
                }
            }
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(map) = item {
                        for (name, entry) in map {
                            self.merge_header_entry(name, entry);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn merge_header_entry(&mut self, name: &str, entry: &Value) {
        match entry {
            Value::String(s) => self.set_header(name, s),
            Value::Number(n) => self.set_header(name, &n.to_string()),
            Value::Array(values) => {
                for v in values {
                    match v {
                        Value::String(s) => self.set_header(name, s),
                        Value::Number(n) => self.set_header(name, &n.to_string()),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// Converts the staged state into the wire response.
    ///
    /// `returned_body` is the script's return value, when it produced one;
    /// it takes precedence over the staged content. When no `content-type`
    /// header was staged, the `ContentType` field applies, and failing
    /// that the body goes out as `text/plain`.
    pub fn finalize(self, returned_body: Option<String>) -> HyperResponse {
        let body = returned_body.unwrap_or(self.content);

        let status = StatusCode::from_u16(self.code).unwrap_or_else(|_| {
            tracing::warn!(code = self.code, "script set an invalid status code");
            StatusCode::INTERNAL_SERVER_ERROR
        });

        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;

        let mut has_content_type = false;
        for (name, value) in &self.headers {
            let header_name = match HeaderName::from_bytes(name.as_bytes()) {
                Ok(n) => n,
                Err(_) => {
                    tracing::warn!(name, "script set an invalid header name");
                    continue;
                }
            };
            let header_value = match HeaderValue::from_str(value) {
                Ok(v) => v,
                Err(_) => {
                    tracing::warn!(name, "script set an invalid header value");
                    continue;
                }
            };
            if header_name == CONTENT_TYPE {
                has_content_type = true;
            }
            response.headers_mut().append(header_name, header_value);
        }

        if !has_content_type {
            let fallback = self
                .content_type
                .as_deref()
                .filter(|ct| !ct.is_empty())
                .unwrap_or("text/plain");
            if let Ok(v) = HeaderValue::from_str(fallback) {
                response.headers_mut().insert(CONTENT_TYPE, v);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let state = ResponseState::new();
        assert_eq!(state.code, 200);
        assert!(state.headers().is_empty());
        assert_eq!(state.content, "");
        assert!(state.content_type.is_none());
    }

    #[test]
    fn test_set_header_last_write_wins() {
        let mut state = ResponseState::new();
        state.set_header("X-Tag", "one");
        state.set_header("x-tag", "two");
        state.set_header("X-TAG", "three");
        assert_eq!(state.headers().len(), 1);
        assert_eq!(state.get_header("x-tag"), Some("three"));
    }

    #[test]
    fn test_set_cookie_accumulates() {
        let mut state = ResponseState::new();
        state.set_header("Set-Cookie", "a=1");
        state.set_header("Set-Cookie", "b=2");
        assert_eq!(state.headers().len(), 2);
    }

    #[test]
    fn test_set_content_replaces() {
        let mut state = ResponseState::new();
        state.set_content("first");
        state.set_content("second");
        assert_eq!(state.content, "second");
    }

    #[test]
    fn test_merge_headers_object_form() {
        let mut state = ResponseState::new();
        state.merge_headers_value(&json!({"Content-Type": "text/html", "X-A": "1"}));
        assert_eq!(state.get_header("content-type"), Some("text/html"));
        assert_eq!(state.get_header("X-A"), Some("1"));
    }

    #[test]
    fn test_merge_headers_array_of_objects_form() {
        let mut state = ResponseState::new();
        state.merge_headers_value(&json!([
            {"Content-Type": "text/html"},
            {"X-B": "2"}
        ]));
        assert_eq!(state.get_header("Content-Type"), Some("text/html"));
        assert_eq!(state.get_header("x-b"), Some("2"));
    }

    #[test]
    fn test_merge_headers_matches_set_header_calls() {
        let mut via_merge = ResponseState::new();
        via_merge.merge_headers_value(&json!([{"Content-Type": "text/html"}, {"X-C": "3"}]));

        let mut via_calls = ResponseState::new();
        via_calls.set_header("Content-Type", "text/html");
        via_calls.set_header("X-C", "3");

        assert_eq!(via_merge.headers(), via_calls.headers());
    }

    #[test]
    fn test_finalize_returned_body_wins() {
        let mut state = ResponseState::new();
        state.set_content("staged body");
        let response = state.finalize(Some("returned body".to_string()));
        assert_eq!(response.status(), StatusCode::OK);
        // Body content checked at the integration level; here the header
        // default still applies.
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_finalize_default_content_type() {
        let state = ResponseState::new();
        let response = state.finalize(None);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_finalize_content_type_field_fallback() {
        let mut state = ResponseState::new();
        state.content_type = Some("application/json".to_string());
        let response = state.finalize(None);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_finalize_explicit_header_beats_content_type_field() {
        let mut state = ResponseState::new();
        state.set_header("Content-Type", "text/html");
        state.content_type = Some("application/json".to_string());
        let response = state.finalize(None);
        let values: Vec<_> = response.headers().get_all(CONTENT_TYPE).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "text/html");
    }

    #[test]
    fn test_finalize_single_content_type_entry() {
        let mut state = ResponseState::new();
        state.set_header("Content-Type", "text/plain");
        state.set_header("Content-Type", "application/json");
        let response = state.finalize(None);
        let values: Vec<_> = response.headers().get_all(CONTENT_TYPE).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "application/json");
    }

    #[test]
    fn test_finalize_invalid_status_becomes_500() {
        let mut state = ResponseState::new();
        state.code = 20;
        let response = state.finalize(None);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_finalize_skips_invalid_header_names() {
        let mut state = ResponseState::new();
        state.set_header("bad name", "value");
        state.set_header("X-Good", "ok");
        let response = state.finalize(None);
        assert!(response.headers().get("X-Good").is_some());
        assert_eq!(response.headers().len(), 2); // x-good + content-type
    }

    #[test]
    fn test_finalize_set_cookie_multiple_values() {
        let mut state = ResponseState::new();
        state.set_header("Set-Cookie", "a=1");
        state.set_header("Set-Cookie", "b=2");
        let response = state.finalize(None);
        let cookies: Vec<_> = response.headers().get_all("set-cookie").iter().collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
    }
}
