//! Declarative resource schemas.
//!
//! A [`BlockSchema`] lists every configuration field of a resource (or of a
//! nested block) together with its type, presence, default and validators.
//! Schemas are plain data: the same table drives validation of user input,
//! replacement planning ([`FieldSchema::force_new`]) and the `schema`
//! command output.
//!
//! [`BlockSchema::validate`] is the single entry point for raw parameters. It
//! type-checks and coerces values, applies defaults, runs validators and
//! collects every problem it finds before returning, so a user sees all
//! mistakes in one pass.

pub mod validate;

pub use validate::Validator;

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Raw resource parameters as handed over by the host.
pub type ResourceParams = HashMap<String, Value>;

/// Scalar value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Int,
    Float,
    Bool,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Bool => write!(f, "bool"),
        }
    }
}

/// Shape of a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// A single scalar value
    Primitive { elem: ValueType },
    /// Ordered list of scalars
    List { elem: ValueType },
    /// Unordered, de-duplicated collection of scalars
    Set { elem: ValueType },
    /// String-keyed map of scalars
    Map { elem: ValueType },
    /// Unordered collection of nested blocks
    Block {
        schema: BlockSchema,
        min_items: usize,
        max_items: Option<usize>,
    },
}

/// Whether the user must, may, or may not supply a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Required,
    Optional,
    /// Set by the remote API only
    Computed,
}

/// Declaration of one configuration field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSchema {
    pub name: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
    /// Changing this field requires replacing the remote object.
    pub force_new: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// For lists and sets the validators run on every element.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
    pub description: &'static str,
}

impl FieldSchema {
    fn new(name: &'static str, kind: FieldKind, presence: Presence) -> Self {
        Self {
            name,
            kind,
            presence,
            force_new: false,
            default: None,
            validators: Vec::new(),
            description: "",
        }
    }

    pub fn required(name: &'static str, elem: ValueType) -> Self {
        Self::new(name, FieldKind::Primitive { elem }, Presence::Required)
    }

    pub fn optional(name: &'static str, elem: ValueType) -> Self {
        Self::new(name, FieldKind::Primitive { elem }, Presence::Optional)
    }

    pub fn computed(name: &'static str, elem: ValueType) -> Self {
        Self::new(name, FieldKind::Primitive { elem }, Presence::Computed)
    }

    pub fn list(name: &'static str, elem: ValueType, presence: Presence) -> Self {
        Self::new(name, FieldKind::List { elem }, presence)
    }

    pub fn set(name: &'static str, elem: ValueType, presence: Presence) -> Self {
        Self::new(name, FieldKind::Set { elem }, presence)
    }

    pub fn map(name: &'static str, elem: ValueType, presence: Presence) -> Self {
        Self::new(name, FieldKind::Map { elem }, presence)
    }

    pub fn block(name: &'static str, schema: BlockSchema, presence: Presence) -> Self {
        let min_items = usize::from(presence == Presence::Required);
        Self::new(
            name,
            FieldKind::Block {
                schema,
                min_items,
                max_items: None,
            },
            presence,
        )
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        if let FieldKind::Block { max_items, .. } = &mut self.kind {
            *max_items = Some(max);
        }
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }
}

/// An ordered set of field declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlockSchema {
    pub fields: Vec<FieldSchema>,
}

/// One problem found while validating parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path, e.g. `trigger.0.metric_trigger.0.threshold`
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// All problems found in one set of parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single error for one field.
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(path, message);
        errors
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True if any error is reported for exactly this path.
    pub fn contains_path(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }

    /// `Ok(value)` when no errors were collected.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

impl BlockSchema {
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        Self { fields }
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of fields whose change forces replacement.
    pub fn force_new_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.force_new)
            .map(|f| f.name)
            .collect()
    }

    /// Validate and normalize raw parameters.
    ///
    /// Returns the parameters with defaults applied and values coerced to
    /// their declared types. `null` values are treated as absent.
    pub fn validate(&self, params: &ResourceParams) -> Result<Map<String, Value>, ValidationErrors> {
        let object: Map<String, Value> = params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let mut errors = ValidationErrors::new();
        let normalized = self.validate_object(&object, "", &mut errors);
        errors.into_result(normalized)
    }

    fn validate_object(
        &self,
        object: &Map<String, Value>,
        prefix: &str,
        errors: &mut ValidationErrors,
    ) -> Map<String, Value> {
        let mut out = Map::new();

        for key in object.keys() {
            if self.field(key).is_none() {
                errors.push(join_path(prefix, key), "unknown field");
            }
        }

        for field in &self.fields {
            let path = join_path(prefix, field.name);
            let value = object.get(field.name).filter(|v| !v.is_null());

            match (value, field.presence) {
                (Some(_), Presence::Computed) => {
                    errors.push(path, "is computed and cannot be set");
                }
                (None, Presence::Required) => {
                    errors.push(path, "is required");
                }
                (None, _) => {
                    if let Some(default) = &field.default {
                        out.insert(field.name.to_string(), default.clone());
                    }
                }
                (Some(value), _) => {
                    if let Some(normalized) = field.validate_value(value, &path, errors) {
                        out.insert(field.name.to_string(), normalized);
                    }
                }
            }
        }

        out
    }
}

impl FieldSchema {
    fn validate_value(
        &self,
        value: &Value,
        path: &str,
        errors: &mut ValidationErrors,
    ) -> Option<Value> {
        match &self.kind {
            FieldKind::Primitive { elem } => {
                let coerced = coerce(value, *elem).map_err(|m| errors.push(path, m)).ok()?;
                self.run_validators(&coerced, path, errors);
                Some(coerced)
            }
            FieldKind::List { elem } | FieldKind::Set { elem } => {
                let Some(items) = value.as_array() else {
                    errors.push(path, format!("expected a list of {}", elem));
                    return None;
                };
                let mut out: Vec<Value> = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = join_path(path, &i.to_string());
                    if let Ok(coerced) = coerce(item, *elem).map_err(|m| errors.push(&item_path, m)) {
                        self.run_validators(&coerced, &item_path, errors);
                        let duplicate = matches!(self.kind, FieldKind::Set { .. }) && out.contains(&coerced);
                        if !duplicate {
                            out.push(coerced);
                        }
                    }
                }
                Some(Value::Array(out))
            }
            FieldKind::Map { elem } => {
                let Some(entries) = value.as_object() else {
                    errors.push(path, format!("expected a map of {}", elem));
                    return None;
                };
                let mut out = Map::new();
                for (key, item) in entries {
                    match coerce(item, *elem) {
                        Ok(coerced) => {
                            out.insert(key.clone(), coerced);
                        }
                        Err(m) => errors.push(join_path(path, key), m),
                    }
                }
                let out = Value::Object(out);
                self.run_validators(&out, path, errors);
                Some(out)
            }
            FieldKind::Block {
                schema,
                min_items,
                max_items,
            } => {
                // A single block may be written without the surrounding list.
                let items: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    Value::Object(_) => vec![value],
                    _ => {
                        errors.push(path, "expected a block or a list of blocks");
                        return None;
                    }
                };

                if items.len() < *min_items {
                    errors.push(path, format!("at least {} block(s) required", min_items));
                }
                if let Some(max) = max_items {
                    if items.len() > *max {
                        errors.push(path, format!("at most {} block(s) allowed, got {}", max, items.len()));
                    }
                }

                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    let item_path = join_path(path, &i.to_string());
                    match item.as_object() {
                        Some(object) => {
                            out.push(Value::Object(schema.validate_object(object, &item_path, errors)));
                        }
                        None => errors.push(item_path, "expected a block"),
                    }
                }
                Some(Value::Array(out))
            }
        }
    }

    fn run_validators(&self, value: &Value, path: &str, errors: &mut ValidationErrors) {
        for validator in &self.validators {
            if let Err(message) = validator.check(value) {
                errors.push(path, message);
            }
        }
    }
}

/// Coerce a JSON value to a scalar type.
///
/// Numbers and booleans written as strings (common in YAML input) are
/// accepted and converted.
fn coerce(value: &Value, elem: ValueType) -> Result<Value, String> {
    match (elem, value) {
        (ValueType::String, Value::String(_)) => Ok(value.clone()),
        (ValueType::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (ValueType::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),
        (ValueType::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => {
            n.as_i64().map(Value::from).ok_or_else(|| format!("{} is out of range", n))
        }
        (ValueType::Int, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("expected an integer, got '{}'", s)),
        (ValueType::Float, Value::Number(n)) => n
            .as_f64()
            .map(Value::from)
            .ok_or_else(|| format!("{} is not a valid float", n)),
        (ValueType::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::from)
            .ok_or_else(|| format!("expected a number, got '{}'", s)),
        (ValueType::Bool, Value::Bool(_)) => Ok(value.clone()),
        (ValueType::Bool, Value::String(s)) => match s.to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(Value::Bool(true)),
            "false" | "no" | "0" | "off" => Ok(Value::Bool(false)),
            _ => Err(format!("expected a boolean, got '{}'", s)),
        },
        (elem, other) => Err(format!("expected {}, got {}", elem, other)),
    }
}
