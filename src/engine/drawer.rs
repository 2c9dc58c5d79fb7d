//! Drawer queries: the relational views behind the detail panes.
//!
//! Inputs are already scoped and filtered. Nothing here touches storage and
//! nothing is cached between calls.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::models::CaptureRecord;

use super::{
    grouping::CaptureGroup,
    inventory::{derive_component, Component},
    signature::{group_key, GroupingMode},
    source::source_label,
    styles::{capture_uses_style, StyleKind},
};

pub const RELATED_COMPONENTS_LIMIT: usize = 12;

/// Captures whose signature under `mode` is `component_id`, ordered by source
/// label and then URL.
pub fn component_captures<'a>(
    captures: &'a [CaptureRecord],
    component_id: &str,
    mode: GroupingMode,
) -> Vec<&'a CaptureRecord> {
    let mut matched: Vec<(String, &CaptureRecord)> = captures
        .iter()
        .filter(|capture| group_key(capture, mode) == component_id)
        .map(|capture| (source_label(&capture.url), capture))
        .collect();

    matched.sort_by(|(label_a, a), (label_b, b)| {
        label_a.cmp(label_b).then_with(|| a.url.cmp(&b.url))
    });
    matched.into_iter().map(|(_, capture)| capture).collect()
}

/// One page a style was seen on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleLocation {
    pub source_label: String,
    pub url: String,
    pub uses: usize,
}

/// Where a style is used, busiest page first.
pub fn style_locations(captures: &[CaptureRecord], kind: StyleKind, value: &str) -> Vec<StyleLocation> {
    let mut index_by_page: HashMap<(String, String), usize> = HashMap::new();
    let mut locations: Vec<StyleLocation> = Vec::new();

    for capture in captures.iter().filter(|c| capture_uses_style(c, kind, value)) {
        let page = (source_label(&capture.url), capture.url.clone());
        match index_by_page.get(&page) {
            Some(&index) => locations[index].uses += 1,
            None => {
                index_by_page.insert(page.clone(), locations.len());
                locations.push(StyleLocation {
                    source_label: page.0,
                    url: page.1,
                    uses: 1,
                });
            }
        }
    }

    locations.sort_by(|a, b| {
        b.uses
            .cmp(&a.uses)
            .then_with(|| a.source_label.cmp(&b.source_label))
    });
    locations
}

/// Components with at least one member using the style. At most
/// [`RELATED_COMPONENTS_LIMIT`], largest first, then by name.
pub fn related_components(groups: &[CaptureGroup<'_>], kind: StyleKind, value: &str) -> Vec<Component> {
    let mut related: Vec<Component> = groups
        .iter()
        .filter(|group| {
            group
                .members
                .iter()
                .any(|capture| capture_uses_style(capture, kind, value))
        })
        .map(derive_component)
        .collect();

    related.sort_by(|a, b| {
        b.captures_count
            .cmp(&a.captures_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    related.truncate(RELATED_COMPONENTS_LIMIT);
    related
}
