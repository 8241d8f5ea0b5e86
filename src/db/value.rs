use serde_json::{json, Map, Value};

use crate::error::{SdkError, SdkResult};

/// Encode plain JSON into the database's typed value representation.
pub fn encode_value(value: &Value) -> SdkResult<Value> {
    Ok(match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // 64-bit integers travel as strings.
                json!({ "integerValue": i.to_string() })
            } else if n.is_u64() {
                return Err(SdkError::UnsupportedValue(format!(
                    "integer {} does not fit in 64 signed bits",
                    n
                )));
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values = items.iter().map(encode_value).collect::<SdkResult<Vec<_>>>()?;
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map)? } }),
    })
}

pub fn encode_fields(map: &Map<String, Value>) -> SdkResult<Map<String, Value>> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), encode_value(v)?)))
        .collect()
}

/// Decode a typed value back into plain JSON. Timestamps, references and
/// bytes come back as their string forms.
pub fn decode_value(value: &Value) -> SdkResult<Value> {
    let obj = value
        .as_object()
        .ok_or_else(|| SdkError::UnsupportedValue(value.to_string()))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| SdkError::UnsupportedValue("empty value".to_string()))?;

    Ok(match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" | "doubleValue" | "stringValue" | "timestampValue" | "referenceValue"
        | "bytesValue" | "geoPointValue" => inner.clone(),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| SdkError::UnsupportedValue(format!("integerValue {}", inner)))?
        }
        "arrayValue" => {
            let values = match inner["values"].as_array() {
                Some(values) => values.iter().map(decode_value).collect::<SdkResult<Vec<_>>>()?,
                None => Vec::new(),
            };
            Value::Array(values)
        }
        "mapValue" => Value::Object(decode_fields(&inner["fields"])?),
        other => return Err(SdkError::UnsupportedValue(format!("value kind '{}'", other))),
    })
}

/// Decode a `fields` object. A missing or null `fields` is an empty map.
pub fn decode_fields(fields: &Value) -> SdkResult<Map<String, Value>> {
    match fields {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
            .collect(),
        other => Err(SdkError::UnsupportedValue(format!("fields {}", other))),
    }
}
