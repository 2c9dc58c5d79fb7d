//! Style inventory.
//!
//! Every primitive value a capture carries counts as one use of the style
//! `(kind, value)`. Tokens come only from the authored source text.

use std::{collections::HashMap, fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::db::models::CaptureRecord;

use super::{
    normalize::{bucket_shadow, NO_SHADOW},
    source::{representative_source, source_label},
};

/// Shown when a style has no authored `var(--..)` reference.
pub const NO_TOKEN: &str = "—";

static CSS_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var\(\s*(--[A-Za-z0-9_-]+)").expect("valid var regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleKind {
    Background,
    Border,
    Color,
    Padding,
    Shadow,
}

impl StyleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleKind::Background => "background",
            StyleKind::Border => "border",
            StyleKind::Color => "color",
            StyleKind::Padding => "padding",
            StyleKind::Shadow => "shadow",
        }
    }

    /// Key of the matching entry in a primitives `sources` map.
    fn source_key(&self) -> &'static str {
        match self {
            StyleKind::Background => "backgroundColor",
            StyleKind::Border => "borderColor",
            StyleKind::Color => "color",
            StyleKind::Padding => "padding",
            StyleKind::Shadow => "boxShadow",
        }
    }
}

impl fmt::Display for StyleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for StyleKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "background" => Ok(StyleKind::Background),
            "border" => Ok(StyleKind::Border),
            "color" => Ok(StyleKind::Color),
            "padding" => Ok(StyleKind::Padding),
            "shadow" => Ok(StyleKind::Shadow),
            other => anyhow::bail!("unknown style kind '{other}'"),
        }
    }
}

/// One primitive value on one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleUsage {
    pub kind: StyleKind,
    pub value: String,
    pub token: String,
}

/// The variable name from the first `var(--name)` in `source`, or `"—"`.
pub fn extract_token(source: Option<&str>) -> String {
    source
        .and_then(|text| CSS_VAR.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|name| name.as_str().to_string())
        .unwrap_or_else(|| NO_TOKEN.to_string())
}

/// Style usages carried by a capture, in kind order.
pub fn style_usages(capture: &CaptureRecord) -> Vec<StyleUsage> {
    let Some(primitives) = &capture.primitives else {
        return Vec::new();
    };

    let mut values: Vec<(StyleKind, String)> = Vec::new();
    if let Some(color) = &primitives.background_color {
        values.push((StyleKind::Background, color.raw()));
    }
    if let Some(color) = &primitives.border_color {
        values.push((StyleKind::Border, color.raw()));
    }
    if let Some(color) = &primitives.color {
        values.push((StyleKind::Color, color.raw()));
    }
    if !primitives.padding.is_empty() {
        values.push((StyleKind::Padding, primitives.padding.raw()));
    }
    let shadow = bucket_shadow(
        primitives.shadow.box_shadow_presence.as_deref(),
        primitives.shadow.shadow_layer_count,
    );
    if shadow != NO_SHADOW {
        values.push((StyleKind::Shadow, shadow));
    }

    values
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(kind, value)| StyleUsage {
            kind,
            token: extract_token(primitives.sources.get(kind.source_key()).map(String::as_str)),
            value,
        })
        .collect()
}

pub fn capture_uses_style(capture: &CaptureRecord, kind: StyleKind, value: &str) -> bool {
    style_usages(capture)
        .iter()
        .any(|usage| usage.kind == kind && usage.value == value)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleEntry {
    pub kind: StyleKind,
    pub value: String,
    pub token: String,
    pub uses: usize,
    /// Source label of the page this style is seen on most.
    pub source: String,
}

/// Aggregate style usages across captures, most used first, then by kind and
/// value. The token is the first real one seen for the style, if any.
pub fn build_style_inventory(captures: &[CaptureRecord]) -> Vec<StyleEntry> {
    struct Accumulator {
        kind: StyleKind,
        value: String,
        token: Option<String>,
        uses: usize,
        sources: Vec<String>,
    }

    let mut index_by_key: HashMap<(StyleKind, String), usize> = HashMap::new();
    let mut accumulators: Vec<Accumulator> = Vec::new();

    for capture in captures {
        let label = source_label(&capture.url);
        for usage in style_usages(capture) {
            let key = (usage.kind, usage.value.clone());
            let index = *index_by_key.entry(key).or_insert_with(|| {
                accumulators.push(Accumulator {
                    kind: usage.kind,
                    value: usage.value.clone(),
                    token: None,
                    uses: 0,
                    sources: Vec::new(),
                });
                accumulators.len() - 1
            });

            let entry = &mut accumulators[index];
            entry.uses += 1;
            entry.sources.push(label.clone());
            if entry.token.is_none() && usage.token != NO_TOKEN {
                entry.token = Some(usage.token);
            }
        }
    }

    let mut entries: Vec<StyleEntry> = accumulators
        .into_iter()
        .map(|acc| StyleEntry {
            kind: acc.kind,
            value: acc.value,
            token: acc.token.unwrap_or_else(|| NO_TOKEN.to_string()),
            uses: acc.uses,
            source: representative_source(acc.sources),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.uses
            .cmp(&a.uses)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.value.cmp(&b.value))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{ColorValue, Padding, Shadow, StylePrimitives};

    fn capture(id: &str, url: &str, primitives: Option<StylePrimitives>) -> CaptureRecord {
        CaptureRecord {
            id: id.into(),
            session_id: "s".into(),
            project_id: None,
            url: url.into(),
            created_at: 0,
            tag_name: Some("button".into()),
            role: None,
            accessible_name: None,
            selector: None,
            screenshot: None,
            primitives,
            is_draft: false,
        }
    }

    fn blue_background(source: Option<&str>) -> StylePrimitives {
        let mut primitives = StylePrimitives {
            background_color: Some(ColorValue::Text("rgb(0, 0, 255)".into())),
            ..StylePrimitives::default()
        };
        if let Some(source) = source {
            primitives
                .sources
                .insert("backgroundColor".into(), source.into());
        }
        primitives
    }

    #[test]
    fn token_extraction_never_guesses() {
        assert_eq!(extract_token(Some("var(--color-primary)")), "--color-primary");
        assert_eq!(
            extract_token(Some("calc(var( --space_2 ) * 2)")),
            "--space_2"
        );
        assert_eq!(extract_token(Some("#0000ff")), NO_TOKEN);
        assert_eq!(extract_token(None), NO_TOKEN);
    }

    #[test]
    fn usages_cover_each_present_primitive() {
        let primitives = StylePrimitives {
            padding: Padding {
                top: Some("4px".into()),
                ..Padding::default()
            },
            color: Some(ColorValue::Channels {
                r: 1.0,
                g: 2.0,
                b: 3.0,
                a: None,
            }),
            shadow: Shadow {
                box_shadow_presence: Some("some".into()),
                shadow_layer_count: Some(2),
            },
            ..StylePrimitives::default()
        };
        let usages = style_usages(&capture("1", "https://a.test/", Some(primitives)));
        let kinds: Vec<(StyleKind, &str)> =
            usages.iter().map(|u| (u.kind, u.value.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (StyleKind::Color, "rgba(1, 2, 3, 1)"),
                (StyleKind::Padding, "4px 0 0 0"),
                (StyleKind::Shadow, "some-2"),
            ]
        );
        assert!(style_usages(&capture("2", "https://a.test/", None)).is_empty());
    }

    #[test]
    fn inventory_counts_uses_and_keeps_real_tokens() {
        let captures = vec![
            capture("1", "https://a.test/", Some(blue_background(None))),
            capture("2", "https://b.test/", Some(blue_background(Some("var(--brand)")))),
            capture("3", "https://b.test/", Some(blue_background(None))),
            capture("4", "https://a.test/", None),
        ];

        let inventory = build_style_inventory(&captures);
        assert_eq!(inventory.len(), 1);
        let entry = &inventory[0];
        assert_eq!(entry.kind, StyleKind::Background);
        assert_eq!(entry.value, "rgb(0, 0, 255)");
        assert_eq!(entry.uses, 3);
        assert_eq!(entry.token, "--brand");
        assert_eq!(entry.source, "b.test");
        assert!(capture_uses_style(&captures[0], StyleKind::Background, "rgb(0, 0, 255)"));
        assert!(!capture_uses_style(&captures[3], StyleKind::Background, "rgb(0, 0, 255)"));
    }

    #[test]
    fn style_without_any_source_keeps_sentinel_token() {
        let captures = vec![capture("1", "https://a.test/", Some(blue_background(Some("blue"))))];
        assert_eq!(build_style_inventory(&captures)[0].token, NO_TOKEN);
    }
}
