//! Normalization and bucketing primitives.
//!
//! Captures of the same element taken at different times rarely agree to the
//! pixel or to the last colour bit. Every value that feeds a signature goes
//! through one of these buckets first.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::db::models::ColorValue;

pub const NO_COLOR: &str = "none";
pub const NO_SHADOW: &str = "noshadow";

const PADDING_STEP: f64 = 4.0;
const CHANNEL_STEP: f64 = 16.0;
const CHANNEL_MAX: f64 = 240.0;

static PX_LENGTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d+(?:\.\d+)?)px$").expect("valid px regex"));

/// Lowercase, collapse whitespace, and strip anything that is not a letter or
/// digit from both ends. `None` and empty input give `""`.
pub fn normalize_accessible_name(name: Option<&str>) -> String {
    let Some(name) = name else {
        return String::new();
    };

    let collapsed = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    collapsed
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

/// Round a `<n>px` length to the nearest multiple of 4 (halves round up).
/// `"0"`, missing and unrecognised values all bucket to `"0"`.
pub fn bucket_padding(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return "0".to_string();
    };

    let Some(number) = PX_LENGTH
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    else {
        if raw != "0" {
            debug!("unrecognised padding value {raw:?}, bucketing as 0");
        }
        return "0".to_string();
    };

    let bucket = (number / PADDING_STEP + 0.5).floor() * PADDING_STEP;
    format_number(bucket)
}

/// Bucket a colour to `"R,G,B,A"`: channels to the nearest multiple of 16
/// capped at 240, alpha to one decimal. Unparseable input gives `"none"`.
pub fn bucket_rgba(value: Option<&ColorValue>) -> String {
    let channels = match value {
        Some(ColorValue::Channels { r, g, b, a }) => Some([*r, *g, *b, a.unwrap_or(1.0)]),
        Some(ColorValue::Text(text)) => parse_color_text(text),
        None => None,
    };

    let Some([r, g, b, a]) = channels.filter(|c| c.iter().all(|v| v.is_finite())) else {
        if let Some(value) = value {
            debug!("unparseable colour {value:?}, bucketing as none");
        }
        return NO_COLOR.to_string();
    };

    let alpha = (a * 10.0).round() / 10.0;
    format!(
        "{},{},{},{}",
        bucket_channel(r),
        bucket_channel(g),
        bucket_channel(b),
        format_number(alpha)
    )
}

/// `"noshadow"` when there is no shadow, otherwise `"<presence>-<layers>"`.
pub fn bucket_shadow(presence: Option<&str>, layer_count: Option<u32>) -> String {
    match presence.map(str::trim) {
        None | Some("") | Some("none") => NO_SHADOW.to_string(),
        Some(presence) => format!("{presence}-{}", layer_count.unwrap_or(0)),
    }
}

fn bucket_channel(value: f64) -> String {
    let bucket = ((value / CHANNEL_STEP).round() * CHANNEL_STEP).clamp(0.0, CHANNEL_MAX);
    format_number(bucket)
}

/// Accepts `rgba(r, g, b, a)`, `rgb(r, g, b)` and bare `r,g,b[,a]`.
fn parse_color_text(text: &str) -> Option<[f64; 4]> {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();
    let body = if let Some(rest) = lower.strip_prefix("rgba(") {
        rest.strip_suffix(')')?
    } else if let Some(rest) = lower.strip_prefix("rgb(") {
        rest.strip_suffix(')')?
    } else {
        lower.as_str()
    };

    let parts = body
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [r, g, b] => Some([*r, *g, *b, 1.0]),
        [r, g, b, a] => Some([*r, *g, *b, *a]),
        _ => None,
    }
}

/// Integers print without a fractional part; everything else uses the
/// shortest round-trip representation.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_lowercased_collapsed_and_trimmed() {
        assert_eq!(normalize_accessible_name(Some("  Submit   Order! ")), "submit order");
        assert_eq!(normalize_accessible_name(Some("«Weiter»")), "weiter");
        assert_eq!(normalize_accessible_name(Some("Save & continue")), "save & continue");
        assert_eq!(normalize_accessible_name(Some("")), "");
        assert_eq!(normalize_accessible_name(None), "");
    }

    #[test]
    fn name_normalization_is_idempotent() {
        for raw in ["! ! Hello\tWorld ?", "  ...", "Ünïcode  Näme.", "x"] {
            let once = normalize_accessible_name(Some(raw));
            assert_eq!(normalize_accessible_name(Some(&once)), once, "input {raw:?}");
        }
    }

    #[test]
    fn padding_rounds_to_nearest_four() {
        assert_eq!(bucket_padding(Some("12px")), "12");
        assert_eq!(bucket_padding(Some("12px")), bucket_padding(Some("12px")));
        assert_eq!(bucket_padding(Some("13px")), "12");
        assert_eq!(bucket_padding(Some("14px")), "16");
        assert_eq!(bucket_padding(Some("1.9px")), "0");
        assert_eq!(bucket_padding(Some("0")), "0");
        assert_eq!(bucket_padding(None), "0");
        assert_eq!(bucket_padding(Some("1em")), "0");
        assert_eq!(bucket_padding(Some("auto")), "0");
    }

    #[test]
    fn rgba_channels_clamp_at_240() {
        let red = ColorValue::Channels {
            r: 255.0,
            g: 0.0,
            b: 0.0,
            a: Some(1.0),
        };
        assert_eq!(bucket_rgba(Some(&red)), "240,0,0,1");
    }

    #[test]
    fn rgba_accepts_all_text_forms() {
        let text = |s: &str| ColorValue::Text(s.to_string());
        assert_eq!(bucket_rgba(Some(&text("rgba(17, 33, 100, 0.46)"))), "16,32,96,0.5");
        assert_eq!(bucket_rgba(Some(&text("rgb(8, 24, 250)"))), "16,32,240,1");
        assert_eq!(bucket_rgba(Some(&text("8,24,250,0"))), "16,32,240,0");
        assert_eq!(bucket_rgba(Some(&text("#ff0000"))), NO_COLOR);
        assert_eq!(bucket_rgba(Some(&text("rgb(1,2)"))), NO_COLOR);
        assert_eq!(bucket_rgba(None), NO_COLOR);
    }

    #[test]
    fn shadow_buckets() {
        assert_eq!(bucket_shadow(None, Some(3)), NO_SHADOW);
        assert_eq!(bucket_shadow(Some("none"), Some(1)), NO_SHADOW);
        assert_eq!(bucket_shadow(Some("some"), Some(2)), "some-2");
        assert_eq!(bucket_shadow(Some("some"), None), "some-0");
    }
}
