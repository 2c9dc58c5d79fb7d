use serde::Serialize;

use crate::db::models::CaptureRecord;

use super::{
    grouping::{group_captures, CaptureGroup},
    signature::GroupingMode,
    source::{representative_source, source_label},
    styles::{build_style_inventory, StyleEntry},
};

/// A derived component. `id` is the group key, so it only changes when the
/// captures or the grouping mode change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(rename = "type")]
    pub component_type: String,
    /// Never derived; overrides may supply one.
    pub status: Option<String>,
    pub source: String,
    pub captures_count: usize,
}

/// Coarse category from role first, then tag.
pub fn infer_category(tag: Option<&str>, role: Option<&str>) -> &'static str {
    let role = role.map(|r| r.trim().to_ascii_lowercase()).unwrap_or_default();
    match role.as_str() {
        "button" => return "Action",
        "link" | "menuitem" | "tab" | "navigation" => return "Navigation",
        "textbox" | "checkbox" | "radio" | "combobox" | "switch" | "slider" | "searchbox"
        | "spinbutton" | "listbox" => return "Form",
        "img" | "figure" => return "Media",
        "heading" => return "Typography",
        "banner" | "contentinfo" | "main" | "region" | "dialog" | "complementary" => {
            return "Layout"
        }
        _ => {}
    }

    let tag = tag.map(|t| t.trim().to_ascii_lowercase()).unwrap_or_default();
    match tag.as_str() {
        "button" => "Action",
        "a" | "nav" => "Navigation",
        "input" | "select" | "textarea" | "label" | "form" | "option" | "fieldset" => "Form",
        "img" | "svg" | "video" | "audio" | "picture" | "canvas" | "figure" => "Media",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "span" | "strong" | "em" | "blockquote" => {
            "Typography"
        }
        "header" | "footer" | "main" | "section" | "article" | "aside" | "div" | "dialog" => {
            "Layout"
        }
        _ => "Other",
    }
}

/// Role when present, otherwise the tag.
pub fn component_type(capture: &CaptureRecord) -> String {
    [capture.role.as_deref(), capture.tag_name.as_deref()]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_lowercase())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn derive_component(group: &CaptureGroup<'_>) -> Component {
    let first = group.members[0];
    Component {
        id: group.key.clone(),
        name: first.display_name().to_string(),
        category: infer_category(first.tag_name.as_deref(), first.role.as_deref()).to_string(),
        component_type: component_type(first),
        status: None,
        source: representative_source(group.members.iter().map(|c| source_label(&c.url))),
        captures_count: group.count(),
    }
}

pub fn derive_components(groups: &[CaptureGroup<'_>]) -> Vec<Component> {
    groups.iter().map(derive_component).collect()
}

/// Everything derived from one capture set under one grouping mode.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory<'a> {
    pub mode: GroupingMode,
    pub groups: Vec<CaptureGroup<'a>>,
    pub components: Vec<Component>,
    pub styles: Vec<StyleEntry>,
}

pub fn derive_inventory(captures: &[CaptureRecord], mode: GroupingMode) -> Inventory<'_> {
    let groups = group_captures(captures, mode);
    let components = derive_components(&groups);
    Inventory {
        mode,
        groups,
        components,
        styles: build_style_inventory(captures),
    }
}
