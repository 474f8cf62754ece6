//! JSON <-> JavaScript value conversions
//!
//! Bidirectional conversion between `serde_json::Value` and Boa's `JsValue`,
//! used to build the script-visible `Request` object and to harvest what a
//! script left behind on the `Response` object.
//!
//! # Type Mapping
//!
//! | JSON | JavaScript |
//! |------|------------|
//! | null | null |
//! | boolean | Boolean |
//! | number | Number |
//! | string | String |
//! | array | Array |
//! | object | Object |
//!
//! Harvesting is lenient where scripts can reach: `undefined` and symbols
//! become JSON `null`, and function-valued properties (the `setHeader`
//! family living on the response object) convert to `null` instead of being
//! walked.

use boa_engine::{
    js_string,
    object::{builtins::JsArray, JsObject},
    property::PropertyKey,
    value::JsValue,
    Context,
};
use serde_json::Value as JsonValue;

use scriptserve_common::error::{EngineError, Result};

/// Converts a JSON value into its JavaScript equivalent.
pub fn json_to_js(json: &JsonValue, ctx: &mut Context) -> Result<JsValue> {
    match json {
        JsonValue::Null => Ok(JsValue::null()),
        JsonValue::Bool(b) => Ok(JsValue::new(*b)),
        JsonValue::Number(n) => n
            .as_f64()
            .map(JsValue::new)
            .or_else(|| n.as_i64().map(JsValue::new))
            .ok_or_else(|| EngineError::ScriptFault("number out of range".into())),
        JsonValue::String(s) => Ok(JsValue::new(js_string!(s.clone()))),
        JsonValue::Array(items) => {
            let array = JsArray::new(ctx);
            for item in items {
                let element = json_to_js(item, ctx)?;
                array
                    .push(element, ctx)
                    .map_err(|e| EngineError::ScriptFault(format!("array build failed: {e}")))?;
            }
            Ok(array.into())
        }
        JsonValue::Object(map) => {
            let object = JsObject::with_object_proto(ctx.intrinsics());
            for (key, value) in map {
                let element = json_to_js(value, ctx)?;
                object
                    .create_data_property_or_throw(js_string!(key.clone()), element, ctx)
                    .map_err(|e| {
                        EngineError::ScriptFault(format!("property '{key}' build failed: {e}"))
                    })?;
            }
            Ok(object.into())
        }
    }
}

/// Converts a JavaScript value into JSON.
///
/// `undefined`, `null`, symbols and callables all map to JSON `null`;
/// arrays and plain objects convert recursively.
pub fn js_to_json(value: &JsValue, ctx: &mut Context) -> Result<JsonValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(JsonValue::Null);
    }

    if let Some(b) = value.as_boolean() {
        return Ok(JsonValue::Bool(b));
    }

    if value.is_integer() {
        let i = value.as_number().expect("is_integer implies number") as i32;
        return Ok(JsonValue::Number(i.into()));
    }

    if let Some(n) = value.as_number() {
        return serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .ok_or_else(|| EngineError::ScriptFault(format!("non-finite number {n}")));
    }

    if let Some(s) = value.as_string() {
        return Ok(JsonValue::String(s.to_std_string_escaped()));
    }

    if let Some(obj) = value.as_object() {
        if obj.is_callable() {
            return Ok(JsonValue::Null);
        }

        if obj.is_array() {
            let array = JsArray::from_object(obj.clone())
                .map_err(|e| EngineError::ScriptFault(format!("not an array: {e}")))?;
            let length: usize = array
                .length(ctx)
                .map_err(|e| EngineError::ScriptFault(format!("array length failed: {e}")))?
                .try_into()
                .map_err(|_| EngineError::ScriptFault("array length overflow".into()))?;

            let mut items = Vec::with_capacity(length);
            for i in 0..length {
                let element = array
                    .get(i, ctx)
                    .map_err(|e| EngineError::ScriptFault(format!("array read failed: {e}")))?;
                items.push(js_to_json(&element, ctx)?);
            }
            return Ok(JsonValue::Array(items));
        }

        let keys = obj
            .own_property_keys(ctx)
            .map_err(|e| EngineError::ScriptFault(format!("object keys failed: {e}")))?;

        let mut map = serde_json::Map::new();
        for key in keys {
            let name = match &key {
                PropertyKey::String(s) => s.to_std_string_escaped(),
                PropertyKey::Index(i) => i.get().to_string(),
                PropertyKey::Symbol(_) => continue,
            };
            let property = obj
                .get(key, ctx)
                .map_err(|e| EngineError::ScriptFault(format!("property read failed: {e}")))?;
            map.insert(name, js_to_json(&property, ctx)?);
        }
        return Ok(JsonValue::Object(map));
    }

    Ok(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::Source;
    use serde_json::json;

    #[test]
    fn test_json_to_js_round_trip_scalars() {
        let mut ctx = Context::default();
        for value in [json!(null), json!(true), json!(42), json!(2.5), json!("hi")] {
            let js = json_to_js(&value, &mut ctx).unwrap();
            let back = js_to_json(&js, &mut ctx).unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_json_to_js_nested_structure() {
        let mut ctx = Context::default();
        let value = json!({
            "name": "test",
            "tags": ["a", "b"],
            "inner": {"count": 3}
        });
        let js = json_to_js(&value, &mut ctx).unwrap();
        let back = js_to_json(&js, &mut ctx).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_js_to_json_from_script_value() {
        let mut ctx = Context::default();
        let result = ctx
            .eval(Source::from_bytes(r#"({greeting: "hello", n: 7})"#))
            .unwrap();
        let json = js_to_json(&result, &mut ctx).unwrap();
        assert_eq!(json, json!({"greeting": "hello", "n": 7}));
    }

    #[test]
    fn test_js_to_json_array_from_script() {
        let mut ctx = Context::default();
        let result = ctx.eval(Source::from_bytes("[1, 'two', false]")).unwrap();
        let json = js_to_json(&result, &mut ctx).unwrap();
        assert_eq!(json, json!([1, "two", false]));
    }

    #[test]
    fn test_js_to_json_undefined_and_functions_become_null() {
        let mut ctx = Context::default();
        let undef = ctx.eval(Source::from_bytes("undefined")).unwrap();
        assert_eq!(js_to_json(&undef, &mut ctx).unwrap(), json!(null));

        let func = ctx.eval(Source::from_bytes("(function () {})")).unwrap();
        assert_eq!(js_to_json(&func, &mut ctx).unwrap(), json!(null));
    }
}
