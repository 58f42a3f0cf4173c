//! Millisecond-precision UTC timestamps.
//!
//! Credential dates are rendered as `YYYY-MM-DDTHH:MM:SS.mmmZ` so that every
//! implementation signing or hashing a credential sees the same bytes. Values
//! are truncated to milliseconds when created, which keeps a parse of the
//! rendered form equal to the original value. Timestamps with precision
//! below the millisecond are rejected on both serialization and parsing,
//! since the rendered form could not tell them apart.

use chrono::{DateTime, SecondsFormat, SubsecRound, Timelike, Utc};

/// Current time truncated to millisecond precision.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Render a timestamp in the canonical credential form.
pub fn to_iso_millis(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Whether `ts` has no precision below the millisecond.
pub fn is_millis_precise(ts: &DateTime<Utc>) -> bool {
    ts.nanosecond() % 1_000_000 == 0
}

/// Parse any RFC 3339 timestamp and normalise it to UTC.
pub fn parse_iso(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Parse an RFC 3339 timestamp that must be exact to the millisecond.
pub fn parse_iso_millis(s: &str) -> Result<DateTime<Utc>, String> {
    let ts = parse_iso(s).map_err(|e| format!("invalid timestamp {}: {}", s, e))?;
    if !is_millis_precise(&ts) {
        return Err(format!("timestamp {} has sub-millisecond precision", s));
    }
    Ok(ts)
}

fn render_exact(ts: &DateTime<Utc>) -> Result<String, String> {
    if !is_millis_precise(ts) {
        return Err(format!(
            "timestamp {} has sub-millisecond precision",
            ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
        ));
    }
    Ok(to_iso_millis(ts))
}

/// `#[serde(with = "iso_millis")]` for `DateTime<Utc>` fields.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        let rendered = super::render_exact(ts).map_err(serde::ser::Error::custom)?;
        s.serialize_str(&rendered)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_iso_millis(&raw).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "iso_millis_option")]` for `Option<DateTime<Utc>>` fields.
pub mod iso_millis_option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => {
                let rendered = super::render_exact(ts).map_err(serde::ser::Error::custom)?;
                s.serialize_str(&rendered)
            }
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        raw.map(|r| super::parse_iso_millis(&r).map_err(serde::de::Error::custom))
            .transpose()
    }
}
