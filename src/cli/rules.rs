//! Rule files.
//!
//! A rule file is YAML or JSON and holds either one rule:
//!
//! ```yaml
//! name: cpu-alert
//! resource_group_name: monitoring
//! # ...
//! ```
//!
//! or several rules keyed by address:
//!
//! ```yaml
//! rules:
//!   cpu-alert:
//!     name: cpu-alert
//!     # ...
//!   requests-metric:
//!     name: requests
//!     # ...
//! ```
//!
//! A single rule is addressed by its `name`.

use azmon_rules::schema::ResourceParams;
use azmon_rules::{Error, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One declared rule.
#[derive(Debug, Clone)]
pub struct RuleDocument {
    /// Stable key in the state file
    pub address: String,
    pub params: ResourceParams,
    /// File the rule was read from
    pub source: PathBuf,
}

/// Parse every rule in `path`.
pub fn load_rule_file(path: &Path) -> Result<Vec<RuleDocument>> {
    if !path.exists() {
        return Err(Error::RuleFileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let document: Value = match extension {
        "json" => serde_json::from_str(&content).map_err(|e| {
            Error::rule_parse(path, e.to_string(), Some(Box::new(e)))
        })?,
        _ => serde_yaml::from_str(&content).map_err(|e| {
            Error::rule_parse(path, e.to_string(), Some(Box::new(e)))
        })?,
    };

    let Value::Object(mut root) = document else {
        return Err(Error::rule_parse(path, "expected a mapping at the top level", None));
    };

    if let Some(rules) = root.remove("rules") {
        let Value::Object(rules) = rules else {
            return Err(Error::rule_parse(path, "'rules' must be a mapping of address to rule", None));
        };
        if let Some(key) = root.keys().next() {
            return Err(Error::rule_parse(
                path,
                format!("unexpected top-level key '{}' next to 'rules'", key),
                None,
            ));
        }
        return rules
            .into_iter()
            .map(|(address, rule)| match rule {
                Value::Object(params) => Ok(RuleDocument {
                    address,
                    params: params.into_iter().collect(),
                    source: path.to_path_buf(),
                }),
                _ => Err(Error::rule_parse(
                    path,
                    format!("rule '{}' must be a mapping", address),
                    None,
                )),
            })
            .collect();
    }

    let address = match root.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => {
            return Err(Error::rule_parse(
                path,
                "a single rule needs a string 'name'",
                None,
            ))
        }
    };

    Ok(vec![RuleDocument {
        address,
        params: root.into_iter().collect(),
        source: path.to_path_buf(),
    }])
}

/// Parse several files. Addresses must be unique across all of them.
pub fn load_rule_files(paths: &[PathBuf]) -> Result<Vec<RuleDocument>> {
    let mut documents = Vec::new();
    let mut seen = HashSet::new();

    for path in paths {
        for document in load_rule_file(path)? {
            if !seen.insert(document.address.clone()) {
                return Err(Error::rule_parse(
                    path,
                    format!("duplicate rule address '{}'", document.address),
                    None,
                ));
            }
            documents.push(document);
        }
    }

    Ok(documents)
}
