use std::collections::HashMap;

use serde::Serialize;

use crate::db::models::{CaptureRecord, NO_NAME};

use super::signature::{variant_key, GroupingMode, KeyParts};

/// Why a set of captures ended up in the same group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupExplanation {
    pub tag: String,
    pub role: Option<String>,
    pub name: String,
    pub primitives: Vec<String>,
    pub summary: String,
}

impl GroupExplanation {
    fn from_parts(parts: &KeyParts) -> Self {
        let primitives = parts
            .primitives
            .as_ref()
            .map(|buckets| buckets.tokens())
            .unwrap_or_default();

        let shown_name = if parts.name.is_empty() {
            NO_NAME
        } else {
            parts.name.as_str()
        };
        let mut summary = format!("Same tag <{}>", parts.tag);
        if let Some(role) = &parts.role {
            summary.push_str(&format!(", role \"{role}\""));
        }
        summary.push_str(&format!(" and name \"{shown_name}\""));
        if let Some(buckets) = &parts.primitives {
            summary.push_str(&format!(
                "; padding {}, background {}, border {}, text {}, shadow {}",
                buckets.padding.join("/"),
                buckets.background,
                buckets.border,
                buckets.color,
                buckets.shadow
            ));
        }

        Self {
            tag: parts.tag.clone(),
            role: parts.role.clone(),
            name: parts.name.clone(),
            primitives,
            summary,
        }
    }
}

/// Captures sharing one group key, in the order they were encountered.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureGroup<'a> {
    pub key: String,
    pub members: Vec<&'a CaptureRecord>,
    pub explanation: GroupExplanation,
}

impl CaptureGroup<'_> {
    pub fn count(&self) -> usize {
        self.members.len()
    }
}

/// Partition captures by group key.
///
/// Groups are ordered by member count, largest first. Equal counts keep the
/// order in which their first member was seen.
pub fn group_captures(captures: &[CaptureRecord], mode: GroupingMode) -> Vec<CaptureGroup<'_>> {
    let mut index_by_key: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<CaptureGroup<'_>> = Vec::new();

    for capture in captures {
        let parts = KeyParts::from_capture(capture, mode);
        let key = parts.to_key();
        match index_by_key.get(&key) {
            Some(&index) => groups[index].members.push(capture),
            None => {
                index_by_key.insert(key.clone(), groups.len());
                groups.push(CaptureGroup {
                    key,
                    members: vec![capture],
                    explanation: GroupExplanation::from_parts(&parts),
                });
            }
        }
    }

    // sort_by is stable, which keeps first-seen order among ties.
    groups.sort_by(|a, b| b.count().cmp(&a.count()));
    groups
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant<'a> {
    /// 1-based position after sorting. Not stable across membership changes.
    pub index: usize,
    pub key: String,
    pub members: Vec<&'a CaptureRecord>,
}

impl Variant<'_> {
    pub fn count(&self) -> usize {
        self.members.len()
    }
}

/// Split a group's members by variant key, sorted by count (desc) then key
/// (asc), and numbered from 1 in that order.
pub fn derive_variants<'a>(members: &[&'a CaptureRecord]) -> Vec<Variant<'a>> {
    let mut index_by_key: HashMap<String, usize> = HashMap::new();
    let mut variants: Vec<Variant<'a>> = Vec::new();

    for &capture in members {
        let key = variant_key(capture);
        match index_by_key.get(&key) {
            Some(&index) => variants[index].members.push(capture),
            None => {
                index_by_key.insert(key.clone(), variants.len());
                variants.push(Variant {
                    index: 0,
                    key,
                    members: vec![capture],
                });
            }
        }
    }

    variants.sort_by(|a, b| b.count().cmp(&a.count()).then_with(|| a.key.cmp(&b.key)));
    for (position, variant) in variants.iter_mut().enumerate() {
        variant.index = position + 1;
    }
    variants
}
