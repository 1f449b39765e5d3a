//! Azure naming and tagging rules.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Maximum number of tags on a single resource.
pub const MAX_TAGS: usize = 50;
/// Maximum length of a tag name.
pub const MAX_TAG_KEY_LEN: usize = 512;
/// Maximum length of a tag value.
pub const MAX_TAG_VALUE_LEN: usize = 256;

static RESOURCE_GROUP_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-\w._()]+$").expect("Invalid resource group regex"));

/// Validate a resource group name: 1-90 characters of letters, digits,
/// underscores, hyphens, periods and parentheses, not ending in a period.
pub fn resource_group_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("cannot be blank".to_string());
    }
    if name.chars().count() > 90 {
        return Err("may not exceed 90 characters in length".to_string());
    }
    if name.ends_with('.') {
        return Err("may not end with a period".to_string());
    }
    if !RESOURCE_GROUP_NAME.is_match(name) {
        return Err(
            "may only contain alphanumeric characters, dash, underscores, parentheses and periods"
                .to_string(),
        );
    }
    Ok(())
}

/// Validate a tag map against the ARM limits.
pub fn tags(map: &Map<String, Value>) -> Result<(), String> {
    if map.len() > MAX_TAGS {
        return Err(format!("a maximum of {} tags can be applied to each ARM resource", MAX_TAGS));
    }

    for (key, value) in map {
        if key.chars().count() > MAX_TAG_KEY_LEN {
            return Err(format!(
                "the maximum length for a tag key is {} characters: '{}'",
                MAX_TAG_KEY_LEN, key
            ));
        }
        let Some(value) = value.as_str() else {
            return Err(format!("the value of tag '{}' must be a string", key));
        };
        if value.chars().count() > MAX_TAG_VALUE_LEN {
            return Err(format!(
                "the maximum length for a tag value is {} characters: '{}'",
                MAX_TAG_VALUE_LEN, key
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_group_name() {
        assert!(resource_group_name("rg1").is_ok());
        assert!(resource_group_name("my-rg_(prod).v2").is_ok());
        assert!(resource_group_name("").is_err());
        assert!(resource_group_name("ends.").is_err());
        assert!(resource_group_name("has space").is_err());
        assert!(resource_group_name("slash/rg").is_err());
        assert!(resource_group_name(&"a".repeat(90)).is_ok());
        assert!(resource_group_name(&"a".repeat(91)).is_err());
    }

    #[test]
    fn test_tags_limits() {
        let ok = json!({"env": "prod", "team": "ops"});
        assert!(tags(ok.as_object().unwrap()).is_ok());

        let mut many = Map::new();
        for i in 0..51 {
            many.insert(format!("k{}", i), json!("v"));
        }
        assert!(tags(&many).is_err());

        let long_value = json!({"env": "x".repeat(257)});
        assert!(tags(long_value.as_object().unwrap()).is_err());

        let not_string = json!({"env": 1});
        assert!(tags(not_string.as_object().unwrap()).is_err());
    }
}
