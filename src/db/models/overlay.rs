//! User-authored overlay records.
//!
//! Annotations and component overrides are keyed by `projectId:componentKey`,
//! where the component key is the signature the engine derived. They change
//! labels only; grouping never reads them.

use serde::{Deserialize, Serialize};

/// Deterministic compound id shared by annotations and overrides.
pub fn compound_key(project_id: &str, component_key: &str) -> String {
    format!("{project_id}:{component_key}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    pub project_id: String,
    pub component_key: String,
    pub notes: String,
    pub tags: Vec<String>,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Input for an annotation upsert. Absent `notes`/`tags` are written as
/// `""`/`[]`, so every upsert replaces both fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationInput {
    pub project_id: String,
    pub component_key: String,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOverride {
    pub id: String,
    pub project_id: String,
    pub component_key: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub category_override: Option<String>,
    pub type_override: Option<String>,
    pub status_override: Option<String>,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideInput {
    pub project_id: String,
    pub component_key: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub category_override: Option<String>,
    pub type_override: Option<String>,
    pub status_override: Option<String>,
}

/// Usage counter for an annotation tag within a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTag {
    pub id: String,
    pub project_id: String,
    pub tag: String,
    pub usage_count: u64,
    pub updated_at: i64,
}
