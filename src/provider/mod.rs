//! Host contract for resource implementations.
//!
//! A [`Resource`] exposes the four lifecycle verbs plus import over a
//! [`ResourceData`] handle. The host owns the data between calls: it persists
//! the identifier and refreshes everything else through `read`.
//!
//! Provider-wide settings ([`ProviderFeatures`]) and the stop token travel in
//! a [`ProviderContext`]; per-phase deadlines live in [`ResourceTimeouts`].

pub mod timeouts;

pub use timeouts::{run_with_timeout, Phase, ResourceTimeouts};

use crate::azure::ResourceIdError;
use crate::monitor::client::{ApiError, ScheduledQueryRulesApi};
use crate::monitor::ScheduledQueryRulesResource;
use crate::schema::{BlockSchema, Presence, ResourceParams, ValidationErrors};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors surfaced by lifecycle handlers.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("parsing resource ID: {0}")]
    InvalidId(#[from] ResourceIdError),

    #[error(
        "a resource with the ID {id:?} already exists - to be managed it needs to be imported into the state (resource type {resource_type})"
    )]
    AlreadyExists { resource_type: String, id: String },

    #[error("{name:?} (resource group {resource_group:?}) ID is empty")]
    MissingId { name: String, resource_group: String },

    #[error("error {action} {name:?} (resource group {resource_group:?}): {source}")]
    Api {
        action: &'static str,
        name: String,
        resource_group: String,
        #[source]
        source: ApiError,
    },

    #[error("{name:?} (resource group {resource_group:?}) was not found")]
    NotFound { name: String, resource_group: String },

    #[error("{phase} timed out after {timeout:?}")]
    Timeout { phase: Phase, timeout: Duration },

    #[error("{phase} was cancelled")]
    Cancelled { phase: Phase },

    #[error("unknown resource type: {0}")]
    UnknownResource(String),
}

impl ResourceError {
    pub fn api(
        action: &'static str,
        name: impl Into<String>,
        resource_group: impl Into<String>,
        source: ApiError,
    ) -> Self {
        Self::Api {
            action,
            name: name.into(),
            resource_group: resource_group.into(),
            source,
        }
    }
}

/// Result type for lifecycle handlers
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Provider-wide behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderFeatures {
    /// Refuse to adopt an existing remote object on create.
    pub resources_must_be_imported: bool,
}

impl Default for ProviderFeatures {
    fn default() -> Self {
        Self {
            resources_must_be_imported: true,
        }
    }
}

/// Context passed to every handler call.
#[derive(Debug, Clone, Default)]
pub struct ProviderContext {
    pub features: ProviderFeatures,
    /// Cancelled when the host is shutting down
    pub stop: CancellationToken,
}

impl ProviderContext {
    pub fn new(features: ProviderFeatures) -> Self {
        Self {
            features,
            stop: CancellationToken::new(),
        }
    }

    pub fn with_stop(mut self, stop: CancellationToken) -> Self {
        self.stop = stop;
        self
    }
}

/// One resource instance as seen by its handlers.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: Option<String>,
    params: ResourceParams,
    attributes: Map<String, Value>,
    new_resource: bool,
}

impl ResourceData {
    /// A resource about to be created from declared parameters.
    pub fn new(params: ResourceParams) -> Self {
        Self {
            params,
            new_resource: true,
            ..Default::default()
        }
    }

    /// A resource already tracked under `id`.
    pub fn existing(id: impl Into<String>, params: ResourceParams) -> Self {
        Self {
            id: Some(id.into()),
            params,
            ..Default::default()
        }
    }

    /// A resource known only by its identifier, as during import.
    pub fn from_id(id: impl Into<String>) -> Self {
        Self::existing(id, ResourceParams::new())
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Mark the resource as gone. Attributes are dropped with the id.
    pub fn clear_id(&mut self) {
        self.id = None;
        self.attributes.clear();
    }

    pub fn is_new_resource(&self) -> bool {
        self.new_resource
    }

    pub fn params(&self) -> &ResourceParams {
        &self.params
    }

    pub fn set_params(&mut self, params: ResourceParams) {
        self.params = params;
    }

    /// Last state read from the remote object.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn set_attributes(&mut self, attributes: Map<String, Value>) {
        self.attributes = attributes;
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// A managed resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name the host addresses this resource by
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> &'static BlockSchema;

    fn timeouts(&self) -> &ResourceTimeouts;

    /// Check declared parameters without touching the remote API.
    fn validate(&self, params: &ResourceParams) -> ResourceResult<()> {
        self.schema().validate(params)?;
        Ok(())
    }

    async fn create(&self, data: &mut ResourceData, ctx: &ProviderContext) -> ResourceResult<()>;

    /// Refresh attributes. A vanished remote object clears the id and
    /// returns `Ok`.
    async fn read(&self, data: &mut ResourceData, ctx: &ProviderContext) -> ResourceResult<()>;

    async fn update(&self, data: &mut ResourceData, ctx: &ProviderContext) -> ResourceResult<()>;

    /// Remove the remote object. An already missing object is not an error.
    async fn delete(&self, data: &mut ResourceData, ctx: &ProviderContext) -> ResourceResult<()>;

    /// Adopt an existing object by id. Defaults to a plain read.
    async fn import(&self, data: &mut ResourceData, ctx: &ProviderContext) -> ResourceResult<()> {
        self.read(data, ctx).await
    }

    /// Force-new fields that differ between stored attributes and the
    /// planned parameters.
    fn requires_replace(
        &self,
        prior: &Map<String, Value>,
        planned: &ResourceParams,
    ) -> ResourceResult<Vec<&'static str>> {
        let planned = self.schema().validate(planned)?;
        Ok(force_new_changes(self.schema(), prior, &planned))
    }

    /// Whether applying `planned` would change any configurable field of
    /// the object described by `prior`.
    fn has_changes(
        &self,
        prior: &Map<String, Value>,
        planned: &ResourceParams,
    ) -> ResourceResult<bool> {
        let planned = self.schema().validate(planned)?;
        match self.schema().validate(&configurable_params(self.schema(), prior)) {
            Ok(prior) => Ok(prior != planned),
            Err(_) => Ok(true),
        }
    }
}

/// The subset of stored attributes a user could have declared.
pub fn configurable_params(schema: &BlockSchema, attributes: &Map<String, Value>) -> ResourceParams {
    schema
        .fields
        .iter()
        .filter(|field| field.presence != Presence::Computed)
        .filter_map(|field| {
            attributes
                .get(field.name)
                .map(|value| (field.name.to_string(), value.clone()))
        })
        .collect()
}

/// Names of force-new fields whose values differ.
pub fn force_new_changes(
    schema: &BlockSchema,
    prior: &Map<String, Value>,
    planned: &Map<String, Value>,
) -> Vec<&'static str> {
    schema
        .force_new_fields()
        .into_iter()
        .filter(|field| prior.get(*field) != planned.get(*field))
        .collect()
}

/// Registry of resource types by name
pub struct ResourceRegistry {
    resources: HashMap<String, Arc<dyn Resource>>,
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            resources: HashMap::new(),
        }
    }

    /// Create a registry with every built-in resource bound to `client`
    pub fn with_builtins(client: Arc<dyn ScheduledQueryRulesApi>, timeouts: ResourceTimeouts) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(
            ScheduledQueryRulesResource::new(client).with_timeouts(timeouts),
        ));
        registry
    }

    pub fn register(&mut self, resource: Arc<dyn Resource>) {
        self.resources
            .insert(resource.type_name().to_string(), resource);
    }

    pub fn get(&self, type_name: &str) -> ResourceResult<Arc<dyn Resource>> {
        self.resources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ResourceError::UnknownResource(type_name.to_string()))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.resources.contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
