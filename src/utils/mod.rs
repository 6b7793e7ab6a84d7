/// Serde helpers for RFC 3339 timestamps.
pub mod time;
