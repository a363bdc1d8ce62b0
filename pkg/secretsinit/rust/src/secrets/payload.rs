// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use serde_json::{Map, Value};

/// Parse `payload` as a JSON object. Any other JSON value, or invalid JSON,
/// yields `None`.
pub(crate) fn json_object(payload: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Render a JSON member as an environment value: strings verbatim, anything
/// else as compact JSON text.
pub(crate) fn member_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_object_accepts_objects_only() {
        assert!(json_object(r#"{"A":"1"}"#).is_some());
        assert!(json_object("{\n  \"A\": \"1\"\n}").is_some());
        assert!(json_object("[1,2]").is_none());
        assert!(json_object("42").is_none());
        assert!(json_object("\"quoted\"").is_none());
        assert!(json_object("plain-text").is_none());
        assert!(json_object("").is_none());
    }

    #[test]
    fn test_member_text() {
        assert_eq!(member_text(&json!("s3cr3t")), "s3cr3t");
        assert_eq!(member_text(&json!(5432)), "5432");
        assert_eq!(member_text(&json!(true)), "true");
        assert_eq!(member_text(&json!(null)), "null");
        assert_eq!(member_text(&json!({"a": [1, 2]})), r#"{"a":[1,2]}"#);
    }
}
