//! Config validation against a [`Schema`].
//!
//! Runs before any remote call so that malformed configuration (a missing
//! `domain`, a `redirect_status_code` of 303) is reported as diagnostics
//! instead of reaching the Vercel API.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_vercel::schema::{Attribute, AttributeValidator, Schema};
//! use hemmer_provider_vercel::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("domain", Attribute::required_string())
//!     .with_attribute(
//!         "redirect_status_code",
//!         Attribute::optional_int64()
//!             .with_validator(AttributeValidator::Int64OneOf(vec![301, 302, 307, 308])),
//!     );
//!
//! assert!(validate(&schema, &json!({"domain": "example.com"})).is_empty());
//!
//! let diagnostics = validate(
//!     &schema,
//!     &json!({"domain": "example.com", "redirect_status_code": 303}),
//! );
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("redirect_status_code".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, DiagnosticSeverity, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics; an empty list means the value is valid.
///
/// # Validation Rules
///
/// - The value must be an object (or null, which is treated as empty)
/// - Attributes not declared in the schema are rejected
/// - Required attributes must be present and non-null
/// - Computed-only attributes are skipped (the provider sets these)
/// - Attribute types must match the schema
/// - Attribute validators run on non-null values of the right type
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => Some(map),
        Value::Null => None,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        }
    };

    if let Some(obj) = obj {
        let mut unknown: Vec<&String> = obj
            .keys()
            .filter(|name| schema.attribute(name).is_none())
            .collect();
        unknown.sort();
        for name in unknown {
            diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", name))
                    .with_detail("An attribute with this name is not expected here")
                    .with_attribute(name.as_str()),
            );
        }
    }

    let mut names: Vec<&String> = schema.block.attributes.keys().collect();
    names.sort();
    for name in names {
        let attr = &schema.block.attributes[name];
        let attr_value = obj.and_then(|o| o.get(name));
        validate_attribute(attr, attr_value, name, &mut diagnostics);
    }

    diagnostics
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        if value.is_some_and(|v| !v.is_null()) {
            diagnostics.push(
                Diagnostic::error(format!("Computed attribute '{}' cannot be set", path))
                    .with_detail("This attribute is computed by the provider and cannot be configured")
                    .with_attribute(path),
            );
        }
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if diagnostics.len() > before {
                return;
            }
            for validator in &attr.validators {
                if let Some(detail) = validator.check(v) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                            .with_detail(detail)
                            .with_attribute(path),
                    );
                }
            }
        }
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64(),
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic {
        severity: DiagnosticSeverity::Error,
        summary: format!("Invalid type for attribute '{}'", path),
        detail: Some(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        )),
        attribute: Some(path.to_string()),
    }
}
