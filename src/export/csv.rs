//! CSV flattening with RFC 4180 quoting.

use super::bundle::ExportedCapture;

pub const CSV_COLUMNS: [&str; 12] = [
    "id",
    "sessionId",
    "projectId",
    "url",
    "createdAt",
    "tagName",
    "role",
    "accessibleName",
    "selector",
    "screenshotBlobId",
    "hasPrimitives",
    "isDraft",
];

pub const DERIVED_CSV_COLUMNS: [&str; 4] =
    ["groupingMode", "groupKey", "variantKey", "signatureVersion"];

/// Quote a field when it contains a comma, quote, CR or LF; inner quotes are
/// doubled.
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn row(capture: &ExportedCapture, include_derived: bool) -> Vec<String> {
    let record = &capture.capture;
    let text = |value: &Option<String>| value.clone().unwrap_or_default();

    let mut fields = vec![
        record.id.clone(),
        record.session_id.clone(),
        text(&record.project_id),
        record.url.clone(),
        record.created_at.to_string(),
        text(&record.tag_name),
        text(&record.role),
        text(&record.accessible_name),
        text(&record.selector),
        record.screenshot_blob_id().unwrap_or_default().to_string(),
        record.primitives.is_some().to_string(),
        record.is_draft.to_string(),
    ];

    if include_derived {
        match &capture.derived {
            Some(derived) => fields.extend([
                derived.grouping_mode.to_string(),
                derived.group_key.clone(),
                derived.variant_key.clone(),
                derived.signature_version.to_string(),
            ]),
            None => fields.extend(std::iter::repeat(String::new()).take(DERIVED_CSV_COLUMNS.len())),
        }
    }
    fields
}

/// Header plus one row per capture, CRLF line endings. Derived columns are
/// added when any capture carries derived fields.
pub fn to_csv(captures: &[ExportedCapture]) -> String {
    let include_derived = captures.iter().any(|c| c.derived.is_some());

    let mut header: Vec<&str> = CSV_COLUMNS.to_vec();
    if include_derived {
        header.extend(DERIVED_CSV_COLUMNS);
    }

    let mut out = header.join(",");
    out.push_str("\r\n");
    for capture in captures {
        let line = row(capture, include_derived)
            .iter()
            .map(|field| escape_field(field))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push_str("\r\n");
    }
    out
}
