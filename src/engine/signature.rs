//! Group and variant keys.
//!
//! A group key (signature) decides which component a capture belongs to; a
//! variant key splits one component by its bucketed visual primitives.

use std::{fmt, str::FromStr};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::db::models::{CaptureRecord, StylePrimitives};

use super::normalize::{bucket_padding, bucket_rgba, bucket_shadow, normalize_accessible_name};

pub const KEY_SEPARATOR: &str = "::";
pub const UNKNOWN_TAG: &str = "unknown";
pub const NO_ROLE: &str = "norole";
pub const UNKNOWN_VARIANT: &str = "unknown";
/// Bumped whenever the key layout changes; stamped on exported records.
pub const SIGNATURE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupingMode {
    NameOnly,
    #[default]
    NamePlusType,
    NameTypePrimitives,
}

impl GroupingMode {
    pub const ALL: [GroupingMode; 3] = [
        GroupingMode::NameOnly,
        GroupingMode::NamePlusType,
        GroupingMode::NameTypePrimitives,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingMode::NameOnly => "nameOnly",
            GroupingMode::NamePlusType => "namePlusType",
            GroupingMode::NameTypePrimitives => "nameTypePrimitives",
        }
    }
}

impl fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupingMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match GroupingMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(value.trim()))
        {
            Some(mode) => Ok(mode),
            None => bail!("unknown grouping mode '{value}'"),
        }
    }
}

/// Bucketed visual primitives of one capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveBuckets {
    /// top, right, bottom, left
    pub padding: [String; 4],
    pub background: String,
    pub border: String,
    pub color: String,
    pub shadow: String,
}

impl PrimitiveBuckets {
    pub fn from_primitives(primitives: &StylePrimitives) -> Self {
        let padding = &primitives.padding;
        Self {
            padding: [
                bucket_padding(padding.top.as_deref()),
                bucket_padding(padding.right.as_deref()),
                bucket_padding(padding.bottom.as_deref()),
                bucket_padding(padding.left.as_deref()),
            ],
            background: bucket_rgba(primitives.background_color.as_ref()),
            border: bucket_rgba(primitives.border_color.as_ref()),
            color: bucket_rgba(primitives.color.as_ref()),
            shadow: bucket_shadow(
                primitives.shadow.box_shadow_presence.as_deref(),
                primitives.shadow.shadow_layer_count,
            ),
        }
    }

    /// Buckets for a capture without a primitives bag: everything at its
    /// empty bucket.
    pub fn empty() -> Self {
        Self::from_primitives(&StylePrimitives::default())
    }

    /// `p<t>-<r>-<b>-<l>`, `bg..`, `bd..`, `c..`, `sh..`
    pub fn tokens(&self) -> Vec<String> {
        vec![
            format!("p{}", self.padding.join("-")),
            format!("bg{}", self.background),
            format!("bd{}", self.border),
            format!("c{}", self.color),
            format!("sh{}", self.shadow),
        ]
    }
}

/// Structural parts a group key is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParts {
    pub tag: String,
    /// `None` in `nameOnly` mode.
    pub role: Option<String>,
    pub name: String,
    /// `Some` only in `nameTypePrimitives` mode.
    pub primitives: Option<PrimitiveBuckets>,
}

impl KeyParts {
    pub fn from_capture(capture: &CaptureRecord, mode: GroupingMode) -> Self {
        let tag = capture
            .tag_name
            .as_deref()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .unwrap_or_else(|| UNKNOWN_TAG.to_string());
        let name = normalize_accessible_name(capture.accessible_name.as_deref());

        let role = match mode {
            GroupingMode::NameOnly => None,
            GroupingMode::NamePlusType | GroupingMode::NameTypePrimitives => Some(
                capture
                    .role
                    .as_deref()
                    .map(|role| role.trim().to_lowercase())
                    .filter(|role| !role.is_empty())
                    .unwrap_or_else(|| NO_ROLE.to_string()),
            ),
        };

        let primitives = match mode {
            GroupingMode::NameTypePrimitives => Some(
                capture
                    .primitives
                    .as_ref()
                    .map(PrimitiveBuckets::from_primitives)
                    .unwrap_or_else(PrimitiveBuckets::empty),
            ),
            _ => None,
        };

        Self {
            tag,
            role,
            name,
            primitives,
        }
    }

    pub fn to_key(&self) -> String {
        let mut parts = vec![self.tag.clone()];
        if let Some(role) = &self.role {
            parts.push(role.clone());
        }
        parts.push(self.name.clone());
        if let Some(primitives) = &self.primitives {
            parts.extend(primitives.tokens());
        }
        parts.join(KEY_SEPARATOR)
    }
}

/// Signature of a capture under `mode`. Total over every capture shape.
pub fn group_key(capture: &CaptureRecord, mode: GroupingMode) -> String {
    KeyParts::from_capture(capture, mode).to_key()
}

/// Key over the bucketed primitives only, whatever the grouping mode.
/// Captures without a primitives bag all share `"unknown"`.
pub fn variant_key(capture: &CaptureRecord) -> String {
    match &capture.primitives {
        Some(primitives) => PrimitiveBuckets::from_primitives(primitives)
            .tokens()
            .join(KEY_SEPARATOR),
        None => UNKNOWN_VARIANT.to_string(),
    }
}
