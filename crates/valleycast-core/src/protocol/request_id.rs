//! Request identifiers.

use uuid::Uuid;

/// Returns a fresh `requestId`.
///
/// Random v4 UUIDs are unique within a session without any shared counter,
/// so concurrent callers never need to coordinate.
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}
