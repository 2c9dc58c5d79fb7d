use serde::Serialize;

use crate::{
    db::{CaptureRecord, Session},
    engine::{group_key, variant_key, GroupingMode, SIGNATURE_VERSION},
};

/// Grouping fields stamped onto an exported capture on request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedFields {
    pub grouping_mode: GroupingMode,
    pub group_key: String,
    pub variant_key: String,
    pub signature_version: u32,
}

impl DerivedFields {
    pub fn for_capture(capture: &CaptureRecord, mode: GroupingMode) -> Self {
        Self {
            grouping_mode: mode,
            group_key: group_key(capture, mode),
            variant_key: variant_key(capture),
            signature_version: SIGNATURE_VERSION,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedCapture {
    #[serde(flatten)]
    pub capture: CaptureRecord,
    #[serde(flatten)]
    pub derived: Option<DerivedFields>,
}

impl ExportedCapture {
    pub fn new(capture: CaptureRecord, derive_with: Option<GroupingMode>) -> Self {
        let derived = derive_with.map(|mode| DerivedFields::for_capture(&capture, mode));
        Self { capture, derived }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    /// RFC 3339.
    pub exported_at: String,
    pub session: Session,
    pub captures: Vec<ExportedCapture>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture() -> CaptureRecord {
        CaptureRecord {
            id: "c1".into(),
            session_id: "s1".into(),
            project_id: None,
            url: "https://a.test/".into(),
            created_at: 7,
            tag_name: Some("button".into()),
            role: None,
            accessible_name: Some("Go".into()),
            selector: None,
            screenshot: None,
            primitives: None,
            is_draft: false,
        }
    }

    #[test]
    fn derived_fields_are_optional_and_flattened() {
        let plain = serde_json::to_value(ExportedCapture::new(capture(), None)).expect("json");
        assert_eq!(plain["id"], "c1");
        assert!(plain.get("groupKey").is_none());

        let derived = serde_json::to_value(ExportedCapture::new(
            capture(),
            Some(GroupingMode::NamePlusType),
        ))
        .expect("json");
        assert_eq!(derived["groupingMode"], "namePlusType");
        assert_eq!(derived["groupKey"], "button::norole::go");
        assert_eq!(derived["variantKey"], "unknown");
        assert_eq!(derived["signatureVersion"], 1);
        assert_eq!(derived["sessionId"], "s1");
    }
}
