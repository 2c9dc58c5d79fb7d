//! Read-time merge of user overlays onto derived components.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::models::{Annotation, ComponentOverride};

use super::inventory::Component;

pub const UNKNOWN_STATUS: &str = "Unknown";

/// A component as a reviewer sees it. `id` keeps the derived group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedComponent {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub status: String,
    pub description: Option<String>,
    pub source: String,
    pub captures_count: usize,
    pub notes: String,
    pub tags: Vec<String>,
}

pub fn resolve_component(
    component: &Component,
    component_override: Option<&ComponentOverride>,
    annotation: Option<&Annotation>,
) -> ResolvedComponent {
    let over =
        |field: fn(&ComponentOverride) -> Option<String>| component_override.and_then(field);

    ResolvedComponent {
        id: component.id.clone(),
        name: over(|o| o.display_name.clone()).unwrap_or_else(|| component.name.clone()),
        category: over(|o| o.category_override.clone())
            .unwrap_or_else(|| component.category.clone()),
        component_type: over(|o| o.type_override.clone())
            .unwrap_or_else(|| component.component_type.clone()),
        status: over(|o| o.status_override.clone())
            .or_else(|| component.status.clone())
            .unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
        description: over(|o| o.description.clone()),
        source: component.source.clone(),
        captures_count: component.captures_count,
        notes: annotation.map(|a| a.notes.clone()).unwrap_or_default(),
        tags: annotation.map(|a| a.tags.clone()).unwrap_or_default(),
    }
}

/// Resolve a whole inventory against a project's overrides and annotations,
/// matched by component key.
pub fn resolve_inventory(
    components: &[Component],
    overrides: &[ComponentOverride],
    annotations: &[Annotation],
) -> Vec<ResolvedComponent> {
    let overrides: HashMap<&str, &ComponentOverride> = overrides
        .iter()
        .map(|o| (o.component_key.as_str(), o))
        .collect();
    let annotations: HashMap<&str, &Annotation> = annotations
        .iter()
        .map(|a| (a.component_key.as_str(), a))
        .collect();

    components
        .iter()
        .map(|component| {
            resolve_component(
                component,
                overrides.get(component.id.as_str()).copied(),
                annotations.get(component.id.as_str()).copied(),
            )
        })
        .collect()
}
