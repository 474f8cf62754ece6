//! JavaScript bindings for route handler scripts
//!
//! This module builds the objects a script sees in scope and the native
//! functions hanging off them:
//!
//! - the request object (`Request`/`req`) with its `GET()`/`POST()`/`PUT()`
//!   lazy parsers
//! - the response object (`Response`/`res`) with `setHeader`, `getHeader`
//!   and `setContent`
//! - a `console` object whose output goes to the host log, never into the
//!   HTTP response
//!
//! All native functions are copy closures that operate on `this`; per-request
//! data lives in non-enumerable properties on the request object
//! (`__query`, `__body` and the parse caches), so `JSON.stringify(req)`
//! only ever sees the documented surface.

use boa_engine::{
    js_string,
    native_function::NativeFunction,
    object::{builtins::JsArray, FunctionObjectBuilder, JsObject},
    property::{Attribute, PropertyDescriptor, PropertyKey},
    value::JsValue,
    Context, JsError, JsNativeError, JsResult, JsString,
};

use scriptserve_common::error::{EngineError, Result};

use crate::request::{parse_form_encoded, RequestAdapter};
use crate::response::is_multi_value_header;
use crate::runtime::conversions::json_to_js;

fn js_fault(e: JsError) -> EngineError {
    EngineError::ScriptFault(e.to_string())
}

/// Builds the script-visible request object from the adapter.
///
/// The object carries the public fields (`Method`, `URL`, `Proto`,
/// `Headers`, `Referrer`, `UserAgent`), a non-enumerable `Header` alias
/// for `Headers`, and the three parameter accessors.
pub(crate) fn build_request_object(
    ctx: &mut Context,
    adapter: &RequestAdapter,
) -> Result<JsObject> {
    let surface = json_to_js(&adapter.public_json(), ctx)?;
    let object = surface
        .as_object()
        .cloned()
        .ok_or_else(|| EngineError::ScriptFault("request surface is not an object".into()))?;

    let headers = object
        .get(js_string!("Headers"), ctx)
        .map_err(js_fault)?;
    object
        .define_property_or_throw(
            js_string!("Header"),
            PropertyDescriptor::builder()
                .value(headers)
                .writable(false)
                .enumerable(false)
                .configurable(true),
            ctx,
        )
        .map_err(js_fault)?;

    define_hidden_string(ctx, &object, "__query", adapter.query())?;
    define_hidden_string(
        ctx,
        &object,
        "__body",
        &String::from_utf8_lossy(adapter.body()),
    )?;

    install_param_accessor(ctx, &object, "GET", "__query")?;
    install_param_accessor(ctx, &object, "POST", "__body")?;
    install_param_accessor(ctx, &object, "PUT", "__body")?;

    Ok(object)
}

/// Builds the script-visible response object with its default fields and
/// mutator methods.
pub(crate) fn build_response_object(ctx: &mut Context) -> Result<JsObject> {
    let object = JsObject::with_object_proto(ctx.intrinsics());

    object
        .create_data_property_or_throw(js_string!("code"), 200, ctx)
        .map_err(js_fault)?;

    let headers = JsObject::with_object_proto(ctx.intrinsics());
    object
        .create_data_property_or_throw(js_string!("headers"), headers, ctx)
        .map_err(js_fault)?;

    object
        .create_data_property_or_throw(js_string!("content"), js_string!(""), ctx)
        .map_err(js_fault)?;
    object
        .create_data_property_or_throw(js_string!("ContentType"), js_string!(""), ctx)
        .map_err(js_fault)?;

    install_method(ctx, &object, "setHeader", 2, set_header)?;
    install_method(ctx, &object, "getHeader", 1, get_header)?;
    install_method(ctx, &object, "setContent", 1, set_content)?;

    Ok(object)
}

/// Registers a `console` global whose methods emit host log events.
pub(crate) fn install_console(ctx: &mut Context) -> Result<()> {
    let console = JsObject::with_object_proto(ctx.intrinsics());
    install_method(ctx, &console, "log", 1, console_log)?;
    install_method(ctx, &console, "warn", 1, console_warn)?;
    install_method(ctx, &console, "error", 1, console_error)?;

    ctx.register_global_property(js_string!("console"), console, Attribute::all())
        .map_err(js_fault)?;
    Ok(())
}

fn define_hidden_string(
    ctx: &mut Context,
    object: &JsObject,
    name: &'static str,
    value: &str,
) -> Result<()> {
    object
        .define_property_or_throw(
            JsString::from(name),
            PropertyDescriptor::builder()
                .value(JsString::from(value))
                .writable(false)
                .enumerable(false)
                .configurable(true),
            ctx,
        )
        .map_err(js_fault)?;
    Ok(())
}

fn install_method(
    ctx: &mut Context,
    object: &JsObject,
    name: &'static str,
    length: usize,
    body: fn(&JsValue, &[JsValue], &mut Context) -> JsResult<JsValue>,
) -> Result<()> {
    let function = FunctionObjectBuilder::new(ctx.realm(), NativeFunction::from_copy_closure(body))
        .name(js_string!(name))
        .length(length)
        .build();
    object
        .create_data_property_or_throw(JsString::from(name), function, ctx)
        .map_err(js_fault)?;
    Ok(())
}

fn install_param_accessor(
    ctx: &mut Context,
    object: &JsObject,
    method: &'static str,
    source_prop: &'static str,
) -> Result<()> {
    let function = FunctionObjectBuilder::new(
        ctx.realm(),
        NativeFunction::from_copy_closure(move |this, _args, context| {
            lazy_params(this, method, source_prop, context)
        }),
    )
    .name(js_string!(method))
    .length(0)
    .build();
    object
        .create_data_property_or_throw(JsString::from(method), function, ctx)
        .map_err(js_fault)?;
    Ok(())
}

/// Shared body of `GET()`/`POST()`/`PUT()`.
///
/// Parses the relevant source into a field mapping the first time it is
/// called and caches the result on the request object. When the request
/// method does not match, the mapping is empty; callers are expected to
/// check `Method` before parsing.
fn lazy_params(
    this: &JsValue,
    expected_method: &'static str,
    source_prop: &'static str,
    context: &mut Context,
) -> JsResult<JsValue> {
    let object = this.as_object().ok_or_else(|| {
        JsNativeError::typ().with_message("receiver is not the request object")
    })?;

    let cache_prop = JsString::from(format!("__{}_params", expected_method.to_lowercase()));
    let cached = object.get(cache_prop.clone(), context)?;
    if !cached.is_undefined() {
        return Ok(cached);
    }

    let method = object
        .get(js_string!("Method"), context)?
        .as_string()
        .map(|s| s.to_std_string_escaped())
        .unwrap_or_default();

    let pairs = if method == expected_method {
        let raw = object.get(JsString::from(source_prop), context)?;
        let text = raw
            .as_string()
            .map(|s| s.to_std_string_escaped())
            .unwrap_or_default();
        parse_form_encoded(&text)
    } else {
        Vec::new()
    };

    let mapping = JsObject::with_object_proto(context.intrinsics());
    for (name, value) in pairs {
        mapping.create_data_property_or_throw(
            JsString::from(name),
            JsString::from(value),
            context,
        )?;
    }

    object.define_property_or_throw(
        cache_prop,
        PropertyDescriptor::builder()
            .value(mapping.clone())
            .writable(true)
            .enumerable(false)
            .configurable(true),
        context,
    )?;

    Ok(mapping.into())
}

/// `res.setHeader(name, value)`
///
/// Stores the value under the lowercased name in `this.headers`. Last
/// write wins, except for multi-value headers whose values accumulate in
/// an array. Works against both header shapes a script may have assigned
/// (plain object or array of single-entry objects).
fn set_header(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let object = this.as_object().ok_or_else(|| {
        JsNativeError::typ().with_message("receiver is not the response object")
    })?;

    let name = args
        .first()
        .and_then(|v| v.as_string())
        .ok_or_else(|| JsNativeError::typ().with_message("header name must be a string"))?
        .to_std_string_escaped()
        .to_lowercase();

    let value: JsValue = match args.get(1) {
        Some(v) => v.to_string(context)?.into(),
        None => {
            return Err(JsNativeError::typ()
                .with_message("header value is required")
                .into())
        }
    };

    let headers_val = object.get(js_string!("headers"), context)?;
    let headers = match headers_val.as_object() {
        Some(h) => h.clone(),
        None => {
            // the script assigned a non-object; start over with a fresh map
            let fresh = JsObject::with_object_proto(context.intrinsics());
            object.set(js_string!("headers"), fresh.clone(), true, context)?;
            fresh
        }
    };

    if headers.is_array() {
        let entry = JsObject::with_object_proto(context.intrinsics());
        entry.create_data_property_or_throw(JsString::from(name), value, context)?;
        JsArray::from_object(headers)?.push(entry, context)?;
        return Ok(JsValue::new(true));
    }

    if is_multi_value_header(&name) {
        let key = JsString::from(name);
        let existing = headers.get(key.clone(), context)?;
        match existing.as_object().filter(|o| o.is_array()) {
            Some(list) => {
                JsArray::from_object(list.clone())?.push(value, context)?;
            }
            None if existing.is_undefined() => {
                headers.set(key, value, true, context)?;
            }
            None => {
                let list = JsArray::new(context);
                list.push(existing, context)?;
                list.push(value, context)?;
                headers.set(key, list, true, context)?;
            }
        }
        return Ok(JsValue::new(true));
    }

    headers.set(JsString::from(name), value, true, context)?;
    Ok(JsValue::new(true))
}

/// `res.getHeader(name)`
///
/// Case-insensitive lookup against `this.headers`; returns `false` when
/// the header has not been set.
fn get_header(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let object = this.as_object().ok_or_else(|| {
        JsNativeError::typ().with_message("receiver is not the response object")
    })?;

    let name = args
        .first()
        .and_then(|v| v.as_string())
        .ok_or_else(|| JsNativeError::typ().with_message("header name must be a string"))?
        .to_std_string_escaped()
        .to_lowercase();

    let headers_val = object.get(js_string!("headers"), context)?;
    let Some(headers) = headers_val.as_object() else {
        return Ok(JsValue::new(false));
    };

    if headers.is_array() {
        let array = JsArray::from_object(headers.clone())?;
        let length = array.length(context)?;
        for i in (0..length).rev() {
            let entry = array.get(i, context)?;
            let Some(entry) = entry.as_object() else {
                continue;
            };
            for key in entry.own_property_keys(context)? {
                if let PropertyKey::String(s) = &key {
                    if s.to_std_string_escaped().to_lowercase() == name {
                        return entry.get(key, context);
                    }
                }
            }
        }
        return Ok(JsValue::new(false));
    }

    let value = headers.get(JsString::from(name), context)?;
    if value.is_undefined() {
        return Ok(JsValue::new(false));
    }
    Ok(value)
}

/// `res.setContent(body)` replaces the staged body.
fn set_content(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let object = this.as_object().ok_or_else(|| {
        JsNativeError::typ().with_message("receiver is not the response object")
    })?;

    let body = match args.first() {
        Some(v) => v.to_string(context)?,
        None => js_string!(""),
    };
    object.set(js_string!("content"), body, true, context)?;
    Ok(JsValue::undefined())
}

fn console_line(args: &[JsValue], context: &mut Context) -> JsResult<String> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(arg.to_string(context)?.to_std_string_escaped());
    }
    Ok(parts.join(" "))
}

fn console_log(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let line = console_line(args, context)?;
    tracing::info!(target: "script", "{line}");
    Ok(JsValue::undefined())
}

fn console_warn(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let line = console_line(args, context)?;
    tracing::warn!(target: "script", "{line}");
    Ok(JsValue::undefined())
}

fn console_error(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let line = console_line(args, context)?;
    tracing::error!(target: "script", "{line}");
    Ok(JsValue::undefined())
}
