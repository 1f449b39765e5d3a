//! Value validators referenced from schema declarations.
//!
//! Each function inspects a single JSON value and returns a human readable
//! message on failure. The field path is added by the caller.

use crate::azure::{validate as azure_validate, ResourceId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A validation predicate attached to a schema field.
///
/// Validators are plain data so that the schema can be rendered and compared;
/// [`Validator::check`] runs the predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "args", rename_all = "snake_case")]
pub enum Validator {
    /// String must contain at least one non-whitespace character
    NoEmptyStrings,
    /// String must parse as an Azure Resource Manager identifier
    ResourceId,
    /// String must contain a JSON document
    JsonString,
    /// Integer must be one of the listed values
    IntInSlice(Vec<i64>),
    /// Integer must be within the inclusive range
    IntBetween(i64, i64),
    /// String must be one of the listed values (case-sensitive)
    StringInSlice(Vec<String>),
    /// Number must not be zero
    NoZeroValues,
    /// String must be a valid resource group name
    ResourceGroupName,
    /// Map must satisfy the Azure tag limits
    Tags,
}

impl Validator {
    /// Convenience constructor for [`Validator::StringInSlice`].
    pub fn one_of(values: &[&str]) -> Self {
        Self::StringInSlice(values.iter().map(|v| (*v).to_string()).collect())
    }

    /// Run the validator against a value.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Self::NoEmptyStrings => no_empty_strings(value),
            Self::ResourceId => resource_id(value),
            Self::JsonString => json_string(value),
            Self::IntInSlice(allowed) => int_in_slice(value, allowed),
            Self::IntBetween(min, max) => int_between(value, *min, *max),
            Self::StringInSlice(allowed) => string_in_slice(value, allowed),
            Self::NoZeroValues => no_zero_values(value),
            Self::ResourceGroupName => {
                azure_validate::resource_group_name(expect_str(value)?)
            }
            Self::Tags => match value {
                Value::Object(map) => azure_validate::tags(map),
                _ => Err("expected a map of strings".to_string()),
            },
        }
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEmptyStrings => write!(f, "not empty"),
            Self::ResourceId => write!(f, "resource ID"),
            Self::JsonString => write!(f, "JSON"),
            Self::IntInSlice(allowed) => {
                let values: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                write!(f, "one of [{}]", values.join(", "))
            }
            Self::IntBetween(min, max) => write!(f, "between {} and {}", min, max),
            Self::StringInSlice(allowed) => write!(f, "one of [{}]", allowed.join(", ")),
            Self::NoZeroValues => write!(f, "non-zero"),
            Self::ResourceGroupName => write!(f, "resource group name"),
            Self::Tags => write!(f, "tags"),
        }
    }
}

fn expect_str(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {}", value))
}

/// Reject empty and whitespace-only strings.
pub fn no_empty_strings(value: &Value) -> Result<(), String> {
    if expect_str(value)?.trim().is_empty() {
        return Err("must not be empty or consist only of whitespace".to_string());
    }
    Ok(())
}

/// Accept only parseable ARM identifiers.
pub fn resource_id(value: &Value) -> Result<(), String> {
    let id = expect_str(value)?;
    ResourceId::parse(id)
        .map(|_| ())
        .map_err(|e| format!("expected a resource ID: {}", e))
}

/// Accept only strings that hold a JSON document.
pub fn json_string(value: &Value) -> Result<(), String> {
    let raw = expect_str(value)?;
    serde_json::from_str::<Value>(raw)
        .map(|_| ())
        .map_err(|e| format!("contains an invalid JSON: {}", e))
}

/// Accept integers from a fixed set.
pub fn int_in_slice(value: &Value, allowed: &[i64]) -> Result<(), String> {
    let n = value
        .as_i64()
        .ok_or_else(|| format!("expected an integer, got {}", value))?;
    if allowed.contains(&n) {
        Ok(())
    } else {
        let values: Vec<String> = allowed.iter().map(ToString::to_string).collect();
        Err(format!("expected to be one of [{}], got {}", values.join(", "), n))
    }
}

/// Accept integers within an inclusive range.
pub fn int_between(value: &Value, min: i64, max: i64) -> Result<(), String> {
    let n = value
        .as_i64()
        .ok_or_else(|| format!("expected an integer, got {}", value))?;
    if (min..=max).contains(&n) {
        Ok(())
    } else {
        Err(format!("expected to be in the range ({} - {}), got {}", min, max, n))
    }
}

/// Accept strings from a fixed set, compared case-sensitively.
pub fn string_in_slice(value: &Value, allowed: &[String]) -> Result<(), String> {
    let s = expect_str(value)?;
    if allowed.iter().any(|a| a == s) {
        Ok(())
    } else {
        Err(format!("expected to be one of [{}], got {}", allowed.join(", "), s))
    }
}

/// Reject numeric zero (and empty strings, for string fields).
pub fn no_zero_values(value: &Value) -> Result<(), String> {
    let zero = match value {
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Bool(b) => !b,
        _ => false,
    };
    if zero {
        Err("must not be zero".to_string())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_empty_strings() {
        assert!(no_empty_strings(&json!("r1")).is_ok());
        assert!(no_empty_strings(&json!("")).is_err());
        assert!(no_empty_strings(&json!("   ")).is_err());
        assert!(no_empty_strings(&json!(5)).is_err());
    }

    #[test]
    fn test_json_string() {
        assert!(json_string(&json!("{}")).is_ok());
        assert!(json_string(&json!(r#"{"text": "alert"}"#)).is_ok());
        assert!(json_string(&json!("{not json")).is_err());
    }

    #[test]
    fn test_int_in_slice() {
        let allowed = [0, 1, 2, 3, 4];
        for severity in 0..=4 {
            assert!(int_in_slice(&json!(severity), &allowed).is_ok());
        }
        assert!(int_in_slice(&json!(5), &allowed).is_err());
        assert!(int_in_slice(&json!(-1), &allowed).is_err());
        assert!(int_in_slice(&json!(1.5), &allowed).is_err());
    }

    #[test]
    fn test_int_between() {
        assert!(int_between(&json!(5), 5, 1440).is_ok());
        assert!(int_between(&json!(1440), 5, 1440).is_ok());
        assert!(int_between(&json!(4), 5, 1440).is_err());
    }

    #[test]
    fn test_string_in_slice_is_case_sensitive() {
        let allowed = vec!["Include".to_string()];
        assert!(string_in_slice(&json!("Include"), &allowed).is_ok());
        assert!(string_in_slice(&json!("include"), &allowed).is_err());
        assert!(string_in_slice(&json!("Exclude"), &allowed).is_err());
    }

    #[test]
    fn test_no_zero_values() {
        assert!(no_zero_values(&json!(0)).is_err());
        assert!(no_zero_values(&json!(0.0)).is_err());
        assert!(no_zero_values(&json!(0.5)).is_ok());
        assert!(no_zero_values(&json!(-3)).is_ok());
    }

    #[test]
    fn test_resource_id_validator() {
        assert!(resource_id(&json!(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.OperationalInsights/workspaces/ws"
        ))
        .is_ok());
        assert!(resource_id(&json!("not-an-id")).is_err());
    }

    #[test]
    fn test_validator_display() {
        assert_eq!(Validator::IntInSlice(vec![0, 1]).to_string(), "one of [0, 1]");
        assert_eq!(Validator::one_of(&["A", "B"]).to_string(), "one of [A, B]");
    }
}
