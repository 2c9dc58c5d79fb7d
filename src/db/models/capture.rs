//! Capture record model.
//!
//! A capture is one observed UI element on one page visit. Stored documents
//! exist in two shapes (the flat v1 layout and the nested v2.2 layout); both are
//! converted into the single canonical [`CaptureRecord`] right here at the
//! storage boundary so nothing downstream has to care which one it came from.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use log::debug;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const NO_NAME: &str = "(no name)";

/// Style leaves of the wrong JSON type read as absent, so they bucket to the
/// usual sentinels instead of failing the whole capture.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Some(raw) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match serde_json::from_value::<T>(raw.clone()) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => {
            debug!("ignoring malformed style value {raw}: {err}");
            Ok(None)
        }
    }
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// A colour primitive as the capture pipeline recorded it: either separate
/// channels or a CSS colour string (`rgba(..)`, `rgb(..)`, or bare `r,g,b,a`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ColorValue {
    Channels {
        r: f64,
        g: f64,
        b: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        a: Option<f64>,
    },
    Text(String),
}

impl ColorValue {
    /// Raw textual form used as the style inventory value.
    pub fn raw(&self) -> String {
        match self {
            ColorValue::Channels { r, g, b, a } => {
                format!("rgba({}, {}, {}, {})", r, g, b, a.unwrap_or(1.0))
            }
            ColorValue::Text(text) => text.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Padding {
    #[serde(default, deserialize_with = "lenient")]
    pub top: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub right: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub bottom: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub left: Option<String>,
}

impl Padding {
    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.right.is_none() && self.bottom.is_none() && self.left.is_none()
    }

    /// `top right bottom left`, missing sides rendered as `0`.
    pub fn raw(&self) -> String {
        [&self.top, &self.right, &self.bottom, &self.left]
            .iter()
            .map(|side| side.as_deref().unwrap_or("0").trim().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Shadow {
    #[serde(default, deserialize_with = "lenient")]
    pub box_shadow_presence: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub shadow_layer_count: Option<u32>,
}

/// The `styles.primitives` bag.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StylePrimitives {
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub padding: Padding,
    #[serde(default, deserialize_with = "lenient")]
    pub background_color: Option<ColorValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub border_color: Option<ColorValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub color: Option<ColorValue>,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub shadow: Shadow,
    /// Raw authored values keyed by primitive name, e.g.
    /// `"backgroundColor" -> "var(--color-primary)"`.
    #[serde(
        default,
        deserialize_with = "lenient_or_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub sources: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    pub screenshot_blob_id: String,
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Canonical capture shape. Immutable apart from the `is_draft` flip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRecord {
    pub id: String,
    pub session_id: String,
    pub project_id: Option<String>,
    pub url: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub tag_name: Option<String>,
    pub role: Option<String>,
    pub accessible_name: Option<String>,
    pub selector: Option<String>,
    pub screenshot: Option<Screenshot>,
    pub primitives: Option<StylePrimitives>,
    #[serde(default)]
    pub is_draft: bool,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl CaptureRecord {
    /// Name shown in lists: accessible name, then selector, then `(no name)`.
    pub fn display_name(&self) -> &str {
        non_empty(&self.accessible_name)
            .or_else(|| non_empty(&self.selector))
            .unwrap_or(NO_NAME)
    }

    pub fn has_screenshot(&self) -> bool {
        self.screenshot.is_some()
    }

    pub fn screenshot_blob_id(&self) -> Option<&str> {
        self.screenshot
            .as_ref()
            .map(|shot| shot.screenshot_blob_id.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentDocument {
    pub accessible_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDocument {
    pub tag_name: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub intent: IntentDocument,
    pub selector: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylesDocument {
    #[serde(default, deserialize_with = "lenient")]
    pub primitives: Option<StylePrimitives>,
}

/// Nested v2.2 document layout. This is also what new captures are written as.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDocumentV2 {
    pub id: String,
    pub session_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created_at: i64,
    pub element: ElementDocument,
    #[serde(default)]
    pub screenshot: Option<Screenshot>,
    #[serde(default)]
    pub styles: Option<StylesDocument>,
    #[serde(default)]
    pub is_draft: bool,
}

/// Flat v1 document layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDocumentV1 {
    pub id: String,
    pub session_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created_at: i64,
    pub tag_name: Option<String>,
    pub role: Option<String>,
    pub accessible_name: Option<String>,
    pub selector: Option<String>,
    pub screenshot_blob_id: Option<String>,
    pub mime_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub primitives_summary: Option<StylePrimitives>,
    #[serde(default)]
    pub is_draft: bool,
}

/// Any stored capture document.
#[derive(Debug, Clone)]
pub enum CaptureDocument {
    V2(CaptureDocumentV2),
    V1(CaptureDocumentV1),
}

impl CaptureDocument {
    /// The nested layout is the one with an `element` object; anything else is
    /// read as the flat layout. A document that fails its own layout is an
    /// error, never a reinterpretation as the other one.
    pub fn from_value(value: Value) -> Result<Self> {
        if value.get("element").is_some() {
            serde_json::from_value(value)
                .map(CaptureDocument::V2)
                .context("invalid v2.2 capture document")
        } else {
            serde_json::from_value(value)
                .map(CaptureDocument::V1)
                .context("invalid v1 capture document")
        }
    }
}

impl From<CaptureDocument> for CaptureRecord {
    fn from(document: CaptureDocument) -> Self {
        match document {
            CaptureDocument::V2(doc) => CaptureRecord {
                id: doc.id,
                session_id: doc.session_id,
                project_id: doc.project_id,
                url: doc.url,
                created_at: doc.created_at,
                tag_name: doc.element.tag_name,
                role: doc.element.role,
                accessible_name: doc.element.intent.accessible_name,
                selector: doc.element.selector,
                screenshot: doc.screenshot,
                primitives: doc.styles.and_then(|styles| styles.primitives),
                is_draft: doc.is_draft,
            },
            CaptureDocument::V1(doc) => CaptureRecord {
                id: doc.id,
                session_id: doc.session_id,
                project_id: doc.project_id,
                url: doc.url,
                created_at: doc.created_at,
                tag_name: doc.tag_name,
                role: doc.role,
                accessible_name: doc.accessible_name,
                selector: doc.selector,
                screenshot: doc.screenshot_blob_id.map(|blob_id| Screenshot {
                    screenshot_blob_id: blob_id,
                    mime_type: doc.mime_type,
                    width: None,
                    height: None,
                }),
                primitives: doc.primitives_summary,
                is_draft: doc.is_draft,
            },
        }
    }
}

impl From<&CaptureRecord> for CaptureDocumentV2 {
    fn from(record: &CaptureRecord) -> Self {
        CaptureDocumentV2 {
            id: record.id.clone(),
            session_id: record.session_id.clone(),
            project_id: record.project_id.clone(),
            url: record.url.clone(),
            created_at: record.created_at,
            element: ElementDocument {
                tag_name: record.tag_name.clone(),
                role: record.role.clone(),
                intent: IntentDocument {
                    accessible_name: record.accessible_name.clone(),
                },
                selector: record.selector.clone(),
            },
            screenshot: record.screenshot.clone(),
            styles: record.primitives.clone().map(|primitives| StylesDocument {
                primitives: Some(primitives),
            }),
            is_draft: record.is_draft,
        }
    }
}

/// Parse a stored document of either schema version into the canonical record.
pub fn parse_capture_document(json: &str) -> Result<CaptureRecord> {
    let value: Value = serde_json::from_str(json).context("capture document is not valid JSON")?;
    Ok(CaptureDocument::from_value(value)?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{group_key, GroupingMode};

    #[test]
    fn v1_document_is_flattened_into_canonical_record() {
        let json = r##"{
            "id": "c1",
            "sessionId": "s1",
            "url": "https://example.com/login",
            "createdAt": 1700000000000,
            "tagName": "BUTTON",
            "role": "button",
            "accessibleName": "Sign in",
            "selector": "#signin",
            "screenshotBlobId": "b1",
            "primitivesSummary": {
                "padding": { "top": "8px", "right": "12px", "bottom": "8px", "left": "12px" },
                "backgroundColor": { "r": 0, "g": 120, "b": 255, "a": 1 }
            }
        }"##;

        let record = parse_capture_document(json).expect("v1 parses");
        assert_eq!(record.tag_name.as_deref(), Some("BUTTON"));
        assert_eq!(record.accessible_name.as_deref(), Some("Sign in"));
        assert_eq!(record.screenshot_blob_id(), Some("b1"));
        assert!(record.project_id.is_none());
        let primitives = record.primitives.expect("primitives kept");
        assert_eq!(primitives.padding.right.as_deref(), Some("12px"));
        assert!(!record.is_draft);
    }

    #[test]
    fn v2_document_reads_nested_element_and_styles() {
        let json = r#"{
            "id": "c2",
            "sessionId": "s1",
            "projectId": "p1",
            "url": "https://example.com/",
            "createdAt": 1,
            "element": {
                "tagName": "a",
                "role": "link",
                "intent": { "accessibleName": "Docs" },
                "selector": "nav a"
            },
            "styles": { "primitives": { "color": "rgb(10, 20, 30)" } },
            "isDraft": true
        }"#;

        let record = parse_capture_document(json).expect("v2 parses");
        assert_eq!(record.project_id.as_deref(), Some("p1"));
        assert_eq!(record.role.as_deref(), Some("link"));
        assert_eq!(record.accessible_name.as_deref(), Some("Docs"));
        assert!(record.is_draft);
        assert_eq!(
            record.primitives.and_then(|p| p.color),
            Some(ColorValue::Text("rgb(10, 20, 30)".into()))
        );
    }

    #[test]
    fn canonical_record_survives_the_v2_document_layout() {
        let json = r#"{"id":"c3","sessionId":"s9","element":{"tagName":"input"}}"#;
        let record = parse_capture_document(json).expect("minimal v2");
        let written = serde_json::to_string(&CaptureDocumentV2::from(&record)).expect("write");
        assert_eq!(parse_capture_document(&written).expect("reparse"), record);
    }

    #[test]
    fn malformed_v2_style_values_read_as_absent() {
        let json = r#"{
            "id": "c4",
            "sessionId": "s1",
            "url": "https://a.test/",
            "element": {
                "tagName": "button",
                "role": "button",
                "intent": { "accessibleName": "Save" }
            },
            "styles": { "primitives": {
                "backgroundColor": 12345,
                "color": "rgb(0, 0, 255)",
                "padding": { "top": 8, "left": "4px" },
                "shadow": { "boxShadowPresence": "some", "shadowLayerCount": "two" }
            } }
        }"#;

        let record = parse_capture_document(json).expect("v2 with bad leaves parses");
        assert_eq!(record.tag_name.as_deref(), Some("button"));
        assert_eq!(record.role.as_deref(), Some("button"));
        assert_eq!(record.accessible_name.as_deref(), Some("Save"));

        let primitives = record.primitives.clone().expect("primitives kept");
        assert!(primitives.background_color.is_none());
        assert!(primitives.padding.top.is_none());
        assert_eq!(primitives.padding.left.as_deref(), Some("4px"));
        assert!(primitives.shadow.shadow_layer_count.is_none());

        assert_eq!(
            group_key(&record, GroupingMode::NameTypePrimitives),
            "button::button::save::p0-0-0-4::bgnone::bdnone::c0,0,240,1::shsome-0"
        );
    }

    #[test]
    fn malformed_v1_style_values_read_as_absent() {
        let json = r#"{
            "id": "c5",
            "sessionId": "s1",
            "tagName": "a",
            "role": "link",
            "accessibleName": "Docs",
            "primitivesSummary": {
                "padding": "8px",
                "borderColor": true,
                "shadow": 3
            }
        }"#;

        let record = parse_capture_document(json).expect("v1 with bad leaves parses");
        assert_eq!(record.tag_name.as_deref(), Some("a"));
        assert_eq!(record.accessible_name.as_deref(), Some("Docs"));
        let primitives = record.primitives.clone().expect("primitives kept");
        assert!(primitives.padding.is_empty());
        assert!(primitives.border_color.is_none());
        assert_eq!(
            group_key(&record, GroupingMode::NameTypePrimitives),
            "a::link::docs::p0-0-0-0::bgnone::bdnone::cnone::shnoshadow"
        );
    }

    #[test]
    fn broken_nested_document_is_an_error_not_a_flat_one() {
        let json = r#"{"id":"c6","sessionId":"s1","element":{"tagName":["button"]}}"#;
        assert!(parse_capture_document(json).is_err());
        assert!(parse_capture_document("not json").is_err());
    }

    #[test]
    fn display_name_falls_back_to_selector_then_sentinel() {
        let mut record = parse_capture_document(r#"{"id":"x","sessionId":"s","element":{}}"#)
            .expect("parses");
        assert_eq!(record.display_name(), NO_NAME);
        record.selector = Some(".card".into());
        assert_eq!(record.display_name(), ".card");
        record.accessible_name = Some("  ".into());
        assert_eq!(record.display_name(), ".card");
    }
}
