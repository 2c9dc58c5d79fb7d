//! Project scoping and capture filters. Both run before grouping.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::db::models::CaptureRecord;

use super::inventory::infer_category;

/// Which captures belong to a project.
///
/// A capture stamped with a project id belongs to that project only. Older
/// captures without one belong to every project their session is linked to.
#[derive(Debug, Clone)]
pub struct ProjectScope {
    project_id: String,
    linked_sessions: HashSet<String>,
}

impl ProjectScope {
    pub fn new(project_id: String, linked_sessions: impl IntoIterator<Item = String>) -> Self {
        Self {
            project_id,
            linked_sessions: linked_sessions.into_iter().collect(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn contains(&self, capture: &CaptureRecord) -> bool {
        match capture.project_id.as_deref() {
            Some(project_id) => project_id == self.project_id,
            None => self.linked_sessions.contains(&capture.session_id),
        }
    }

    pub fn retain(&self, mut captures: Vec<CaptureRecord>) -> Vec<CaptureRecord> {
        captures.retain(|capture| self.contains(capture));
        captures
    }
}

/// Conjunctive list filters. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureFilter {
    /// Case-insensitive substring over name, URL, tag and role.
    pub search: Option<String>,
    /// Derived category, e.g. `"Form"`.
    pub category: Option<String>,
    /// Tag name, e.g. `"button"`.
    pub tag: Option<String>,
    pub has_screenshot: Option<bool>,
}

impl CaptureFilter {
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.category.is_none()
            && self.tag.is_none()
            && self.has_screenshot.is_none()
    }

    pub fn matches(&self, capture: &CaptureRecord) -> bool {
        if let Some(needle) = non_blank(&self.search) {
            let needle = needle.to_lowercase();
            let haystacks = [
                Some(capture.display_name()),
                Some(capture.url.as_str()),
                capture.tag_name.as_deref(),
                capture.role.as_deref(),
            ];
            let found = haystacks
                .into_iter()
                .flatten()
                .any(|hay| hay.to_lowercase().contains(&needle));
            if !found {
                return false;
            }
        }

        if let Some(category) = non_blank(&self.category) {
            let derived = infer_category(capture.tag_name.as_deref(), capture.role.as_deref());
            if !derived.eq_ignore_ascii_case(category) {
                return false;
            }
        }

        if let Some(tag) = non_blank(&self.tag) {
            let matches_tag = capture
                .tag_name
                .as_deref()
                .is_some_and(|name| name.trim().eq_ignore_ascii_case(tag));
            if !matches_tag {
                return false;
            }
        }

        match self.has_screenshot {
            Some(wanted) => capture.has_screenshot() == wanted,
            None => true,
        }
    }

    pub fn apply(&self, captures: Vec<CaptureRecord>) -> Vec<CaptureRecord> {
        if self.is_empty() {
            return captures;
        }
        captures
            .into_iter()
            .filter(|capture| self.matches(capture))
            .collect()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
