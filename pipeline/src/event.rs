//! Resolves the day to cluster from an invocation payload.
//!
//! Accepted shapes:
//! - `{"day": "2024-01-01"}`
//! - a storage event whose first record's object key contains a
//!   `day=<value>/` segment, e.g.
//!   `{"Records": [{"s3": {"object": {"key": "in/day%3D2024-01-01/p.csv.gz"}}}]}`
//!
//! A storage event takes precedence over an explicit `day`.

use percent_encoding::percent_decode_str;
use serde_json::Value;

/// Returns the day named by the payload, or None if there is none.
pub fn resolve_day(payload: &Value) -> Option<String> {
    let day = if let Some(records) = payload.get("Records") {
        let key = records
            .get(0)?
            .pointer("/s3/object/key")?
            .as_str()?;
        day_from_object_key(&decode_object_key(key))?
    } else {
        payload.get("day")?.as_str()?.to_string()
    };
    if day.is_empty() { None } else { Some(day) }
}

/// Decodes an event object key: `+` is a space, `%XX` a byte.
pub fn decode_object_key(key: &str) -> String {
    let spaced = key.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Extracts the value of the last `day=` segment, which must be
/// terminated by `/`.
pub fn day_from_object_key(key: &str) -> Option<String> {
    let start = key.rfind("day=")? + "day=".len();
    let rest = &key[start..];
    let end = rest.find('/')?;
    Some(rest[..end].to_string())
}
