//! Azure Resource Manager identifiers.
//!
//! An ARM identifier is a `/`-separated list of key/value segments:
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{type}/{name}...]
//! ```
//!
//! [`ResourceId::parse`] splits such a string into its subscription, resource
//! group and provider namespace, and keeps the remaining type/name pairs in
//! [`ResourceId::path`] so callers can pull out the segment they manage.

use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

/// Errors produced while parsing an ARM identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("cannot parse an empty resource ID")]
    Empty,

    #[error("resource ID '{0}' must start with '/'")]
    NotAbsolute(String),

    #[error("the number of path segments is not divisible by 2 in '{0}'")]
    OddSegments(String),

    #[error("key '{key}' has an empty value in resource ID '{id}'")]
    EmptyValue { key: String, id: String },

    #[error("no subscription ID found in '{0}'")]
    MissingSubscription(String),

    #[error("no resource group found in '{0}'")]
    MissingResourceGroup(String),

    #[error("resource ID '{id}' does not contain a '{segment}' segment")]
    MissingSegment { segment: String, id: String },
}

/// A parsed Azure Resource Manager identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: Option<String>,
    pub provider: Option<String>,
    /// Remaining `type -> name` segments, in the order they appeared.
    pub path: IndexMap<String, String>,
}

impl ResourceId {
    /// Parse an identifier string.
    ///
    /// The `subscriptions` segment is mandatory. `resourceGroups` is matched
    /// case-insensitively since the API returns both spellings.
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        if id.trim().is_empty() {
            return Err(ResourceIdError::Empty);
        }
        let Some(rest) = id.strip_prefix('/') else {
            return Err(ResourceIdError::NotAbsolute(id.to_string()));
        };

        let segments: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
        if segments.len() % 2 != 0 {
            return Err(ResourceIdError::OddSegments(id.to_string()));
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut path = IndexMap::new();

        for pair in segments.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(ResourceIdError::EmptyValue {
                    key: key.to_string(),
                    id: id.to_string(),
                });
            }

            match key.to_ascii_lowercase().as_str() {
                "subscriptions" if subscription_id.is_none() => {
                    subscription_id = Some(value.to_string());
                }
                "resourcegroups" if resource_group.is_none() => {
                    resource_group = Some(value.to_string());
                }
                "providers" if provider.is_none() => provider = Some(value.to_string()),
                _ => {
                    path.insert(key.to_string(), value.to_string());
                }
            }
        }

        let subscription_id =
            subscription_id.ok_or_else(|| ResourceIdError::MissingSubscription(id.to_string()))?;

        Ok(Self {
            subscription_id,
            resource_group,
            provider,
            path,
        })
    }

    /// Look up a path segment by type name, ignoring ASCII case.
    pub fn segment(&self, key: &str) -> Option<&str> {
        self.path
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Like [`segment`](Self::segment) but fails when the segment is absent.
    pub fn require_segment(&self, key: &str) -> Result<&str, ResourceIdError> {
        self.segment(key)
            .ok_or_else(|| ResourceIdError::MissingSegment {
                segment: key.to_string(),
                id: self.to_string(),
            })
    }

    /// The resource group, or an error for subscription-scoped ids.
    pub fn require_resource_group(&self) -> Result<&str, ResourceIdError> {
        self.resource_group
            .as_deref()
            .ok_or_else(|| ResourceIdError::MissingResourceGroup(self.to_string()))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription_id)?;
        if let Some(rg) = &self.resource_group {
            write!(f, "/resourceGroups/{}", rg)?;
        }
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{}", provider)?;
        }
        for (key, value) in &self.path {
            write!(f, "/{}/{}", key, value)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULE_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Insights/scheduledqueryrules/r1";

    #[test]
    fn test_parse_full_id() {
        let id = ResourceId::parse(RULE_ID).unwrap();
        assert_eq!(id.subscription_id, "00000000-0000-0000-0000-000000000000");
        assert_eq!(id.resource_group.as_deref(), Some("rg1"));
        assert_eq!(id.provider.as_deref(), Some("Microsoft.Insights"));
        assert_eq!(id.segment("scheduledQueryRules"), Some("r1"));
        assert_eq!(id.segment("scheduledqueryrules"), Some("r1"));
    }

    #[test]
    fn test_parse_lowercase_resource_groups() {
        let id = ResourceId::parse("/subscriptions/sub/resourcegroups/RG/providers/Microsoft.Web/sites/app")
            .unwrap();
        assert_eq!(id.resource_group.as_deref(), Some("RG"));
        assert_eq!(id.segment("sites"), Some("app"));
    }

    #[test]
    fn test_parse_trailing_slash() {
        let id = ResourceId::parse("/subscriptions/sub/resourceGroups/rg/").unwrap();
        assert_eq!(id.resource_group.as_deref(), Some("rg"));
        assert!(id.path.is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(ResourceId::parse(""), Err(ResourceIdError::Empty));
        assert!(matches!(
            ResourceId::parse("subscriptions/sub"),
            Err(ResourceIdError::NotAbsolute(_))
        ));
        assert!(matches!(
            ResourceId::parse("/subscriptions/sub/resourceGroups"),
            Err(ResourceIdError::OddSegments(_))
        ));
        assert!(matches!(
            ResourceId::parse("/resourceGroups/rg"),
            Err(ResourceIdError::MissingSubscription(_))
        ));
        assert!(matches!(
            ResourceId::parse("/subscriptions//resourceGroups/rg"),
            Err(ResourceIdError::EmptyValue { .. })
        ));
    }

    #[test]
    fn test_require_segment() {
        let id = ResourceId::parse("/subscriptions/sub/resourceGroups/rg").unwrap();
        assert!(id.require_segment("scheduledQueryRules").is_err());
        assert_eq!(id.require_resource_group().unwrap(), "rg");

        let sub_only = ResourceId::parse("/subscriptions/sub").unwrap();
        assert!(sub_only.require_resource_group().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let id = ResourceId::parse(RULE_ID).unwrap();
        assert_eq!(id.to_string(), RULE_ID);
        let reparsed: ResourceId = id.to_string().parse().unwrap();
        assert_eq!(reparsed, id);
    }
}
