//! `#[serde(with = "crate::utils::time")]` support for RFC 3339 timestamps,
//! used for the `saved_at` stamp of saved transcripts.

use serde::{Deserialize, Deserializer, Serializer, de, ser};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Writes `datetime` as an RFC 3339 string.
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let text = datetime.format(&Rfc3339).map_err(ser::Error::custom)?;
    serializer.serialize_str(&text)
}

/// Reads an RFC 3339 string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&text, &Rfc3339).map_err(de::Error::custom)
}
