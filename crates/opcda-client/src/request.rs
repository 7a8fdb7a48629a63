// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Input events.

use serde_json::Value;

use opcda_core::{ItemId, ValidationError};

/// What an input event asks the reader to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadRequest {
    /// Read the configured group.
    Group,
    /// Read these tags, in this order.
    Tags(Vec<ItemId>),
}

impl ReadRequest {
    /// Interprets a JSON payload.
    ///
    /// An object whose `tags` field is an array selects a tag read. Anything
    /// else selects a group read.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotAString`] or
    /// [`ValidationError::EmptyTag`] for a bad element of `tags`.
    pub fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let Some(tags) = payload.get("tags").and_then(Value::as_array) else {
            return Ok(Self::Group);
        };

        tags.iter()
            .enumerate()
            .map(|(index, tag)| match tag {
                Value::String(s) if s.trim().is_empty() => Err(ValidationError::EmptyTag { index }),
                Value::String(s) => Ok(ItemId::new(s.as_str())),
                other => Err(ValidationError::NotAString {
                    index,
                    found: json_type(other),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::Tags)
    }

    /// Parses a JSON text. Blank input selects a group read.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        if input.trim().is_empty() {
            return Ok(Self::Group);
        }
        let payload: Value =
            serde_json::from_str(input).map_err(|e| ValidationError::MalformedPayload {
                message: e.to_string(),
            })?;
        Self::from_payload(&payload)
    }

    /// Returns `true` for a group read.
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tags_payload() {
        let request = ReadRequest::from_payload(&json!({"tags": ["A", "B"]})).unwrap();
        assert_eq!(
            request,
            ReadRequest::Tags(vec![ItemId::new("A"), ItemId::new("B")])
        );
    }

    #[test]
    fn test_group_payloads() {
        assert!(ReadRequest::from_payload(&json!({})).unwrap().is_group());
        assert!(ReadRequest::from_payload(&json!({"tags": "A"})).unwrap().is_group());
        assert!(ReadRequest::from_payload(&json!(42)).unwrap().is_group());
        assert!(ReadRequest::parse("").unwrap().is_group());
    }

    #[test]
    fn test_rejects_non_string_tag() {
        let err = ReadRequest::from_payload(&json!({"tags": ["A", 3]})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotAString {
                index: 1,
                found: "number"
            }
        );
    }

    #[test]
    fn test_rejects_blank_tag() {
        let err = ReadRequest::parse(r#"{"tags": [" "]}"#).unwrap_err();
        assert_eq!(err, ValidationError::EmptyTag { index: 0 });
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ReadRequest::parse("{tags"),
            Err(ValidationError::MalformedPayload { .. })
        ));
    }
}
