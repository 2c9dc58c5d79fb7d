use std::convert::TryFrom;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

/// Current time as epoch milliseconds, the unit overlay records use.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Mutating overlay operations must name their key parts; an empty part would
/// produce a compound key that collides with unrelated records.
pub fn require<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    if value.trim().is_empty() {
        bail!("{field} is required");
    }
    Ok(value)
}

/// Project ids are the left half of `projectId:componentKey`, so a `:` in
/// one would make two different pairs share an id.
pub fn require_project_id(value: &str) -> Result<&str> {
    require(value, "projectId")?;
    if value.contains(':') {
        bail!("projectId must not contain ':'");
    }
    Ok(value)
}
