//! Azure Resource Manager helpers shared by resource implementations.
//!
//! - [`ResourceId`]: parsing of ARM identifiers
//! - [`normalize_location`]: canonical region names
//! - [`validate`]: name, identifier and tag validators used by schemas

pub mod resource_id;
pub mod validate;

pub use resource_id::{ResourceId, ResourceIdError};

/// Normalize an Azure region to the form the API returns.
///
/// `"West Europe"` and `"westeurope"` name the same region; the API always
/// answers with the lowercase, space-free spelling.
pub fn normalize_location(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
