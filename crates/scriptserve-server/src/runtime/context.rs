//! Per-request Boa context
//!
//! [`ScriptContext`] wraps a fresh Boa `Context` with the request and
//! response objects already installed under both their long and short
//! names. One context serves exactly one request and is dropped when the
//! run finishes, so scripts can never observe state left behind by an
//! earlier request.
//!
//! Boa's `Context` is not `Send`; a `ScriptContext` must be created, run
//! and harvested on the same thread (in practice, inside one
//! `spawn_blocking` closure).

use boa_engine::{
    error::JsNativeErrorKind, js_string, object::JsObject, property::Attribute, value::JsValue,
    Context, JsError, Source,
};
use serde_json::Value as JsonValue;

use scriptserve_common::error::{EngineError, Result};

use crate::request::RequestAdapter;
use crate::resource_limits::ResourceLimits;
use crate::response::ResponseState;
use crate::runtime::bindings;
use crate::runtime::conversions::js_to_json;

/// Fresh JavaScript context bound to a single request.
pub struct ScriptContext {
    ctx: Context,
    response: JsObject,
    timeout_ms: u64,
}

impl ScriptContext {
    /// Creates a context with the engine limits applied and the
    /// `Request`/`req`, `Response`/`res` and `console` globals installed.
    pub fn new(adapter: &RequestAdapter, limits: &ResourceLimits) -> Result<Self> {
        let mut ctx = Context::default();
        ctx.runtime_limits_mut()
            .set_loop_iteration_limit(limits.loop_iteration_limit);
        ctx.runtime_limits_mut()
            .set_recursion_limit(limits.recursion_limit);

        let request = bindings::build_request_object(&mut ctx, adapter)?;
        ctx.register_global_property(js_string!("Request"), request.clone(), Attribute::all())
            .map_err(|e| EngineError::ScriptFault(e.to_string()))?;
        ctx.register_global_property(js_string!("req"), request, Attribute::all())
            .map_err(|e| EngineError::ScriptFault(e.to_string()))?;

        let response = bindings::build_response_object(&mut ctx)?;
        ctx.register_global_property(js_string!("Response"), response.clone(), Attribute::all())
            .map_err(|e| EngineError::ScriptFault(e.to_string()))?;
        ctx.register_global_property(js_string!("res"), response.clone(), Attribute::all())
            .map_err(|e| EngineError::ScriptFault(e.to_string()))?;

        bindings::install_console(&mut ctx)?;

        Ok(Self {
            ctx,
            response,
            timeout_ms: limits.timeout_ms(),
        })
    }

    /// Evaluates the handler source and returns its completion value.
    pub fn eval(&mut self, source: &str) -> Result<JsValue> {
        let timeout_ms = self.timeout_ms;
        self.ctx
            .eval(Source::from_bytes(source))
            .map_err(|e| classify(e, timeout_ms))
    }

    /// Extracts the script's explicit body, when it produced one.
    ///
    /// A string completion value is the body verbatim. An array completion
    /// value becomes one line per element, joined with newlines. Any other
    /// value leaves the staged `content` in charge.
    pub fn returned_body(&mut self, value: &JsValue) -> Result<Option<String>> {
        if let Some(s) = value.as_string() {
            return Ok(Some(s.to_std_string_escaped()));
        }

        let is_array = value.as_object().is_some_and(|o| o.is_array());
        if !is_array {
            return Ok(None);
        }

        let json = js_to_json(value, &mut self.ctx)?;
        let JsonValue::Array(items) = json else {
            return Ok(None);
        };

        let lines: Vec<String> = items
            .into_iter()
            .map(|item| match item {
                JsonValue::String(s) => s,
                other => other.to_string(),
            })
            .collect();
        Ok(Some(lines.join("\n")))
    }

    /// Reads the response object's fields into a [`ResponseState`].
    ///
    /// Only runs after a successful evaluation; a failed run never reaches
    /// this point, so its partial writes are discarded with the context.
    pub fn harvest(&mut self) -> Result<ResponseState> {
        let mut state = ResponseState::new();

        let code = self
            .response
            .get(js_string!("code"), &mut self.ctx)
            .map_err(|e| EngineError::ScriptFault(e.to_string()))?;
        if let Some(n) = code.as_number() {
            state.code = n as u16;
        }

        let headers = self
            .response
            .get(js_string!("headers"), &mut self.ctx)
            .map_err(|e| EngineError::ScriptFault(e.to_string()))?;
        if headers.is_object() {
            let json = js_to_json(&headers, &mut self.ctx)?;
            state.merge_headers_value(&json);
        }

        let content = self
            .response
            .get(js_string!("content"), &mut self.ctx)
            .map_err(|e| EngineError::ScriptFault(e.to_string()))?;
        if let Some(s) = content.as_string() {
            state.content = s.to_std_string_escaped();
        } else if !content.is_undefined() && !content.is_null() {
            state.content = content
                .to_string(&mut self.ctx)
                .map_err(|e| EngineError::ScriptFault(e.to_string()))?
                .to_std_string_escaped();
        }

        let content_type = self
            .response
            .get(js_string!("ContentType"), &mut self.ctx)
            .map_err(|e| EngineError::ScriptFault(e.to_string()))?;
        if let Some(s) = content_type.as_string() {
            let ct = s.to_std_string_escaped();
            if !ct.is_empty() {
                state.content_type = Some(ct);
            }
        }

        Ok(state)
    }
}

/// Maps a Boa error onto the engine error taxonomy.
///
/// Syntax errors surface as compile failures, runtime-limit trips as
/// timeouts (the loop budget is the in-engine counterpart of the
/// wall-clock deadline), everything else as a script fault.
fn classify(error: JsError, timeout_ms: u64) -> EngineError {
    if let Some(native) = error.as_native() {
        match native.kind {
            JsNativeErrorKind::Syntax => {
                return EngineError::CompileFailure(native.to_string());
            }
            JsNativeErrorKind::RuntimeLimit => {
                return EngineError::Timeout(timeout_ms);
            }
            _ => {}
        }
    }
    EngineError::ScriptFault(error.to_string())
}
