//! Identifier and timestamp helpers.

use bson::{DateTime, oid::ObjectId};
use chrono::Utc;

/// Returns the all-zero identifier.
///
/// This is what [`to_object_id`] yields for input it cannot parse.
pub fn zero_object_id() -> ObjectId {
    ObjectId::from_bytes([0; 12])
}

/// Parses a 24 character hex string into an [`ObjectId`].
///
/// Malformed input does not raise: it degrades to [`zero_object_id`], which never matches a
/// stored document, so lookups by a bad id behave like lookups by an unknown one.
///
/// # Example
///
/// ```ignore
/// let id = to_object_id("64b7f0c2a1d3e4f5a6b7c8d9");
/// assert_eq!(id.to_hex(), "64b7f0c2a1d3e4f5a6b7c8d9");
/// assert_eq!(to_object_id("not-an-id"), zero_object_id());
/// ```
pub fn to_object_id(hex: &str) -> ObjectId {
    ObjectId::parse_str(hex).unwrap_or_else(|_| zero_object_id())
}

/// Current wall-clock time as a BSON datetime.
pub fn now() -> DateTime {
    DateTime::from_chrono(Utc::now())
}
