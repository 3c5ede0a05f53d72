//! obs-websocket authentication string.
//!
//! ```text
//! secret = base64(sha256(password + salt))
//! auth   = base64(sha256(secret + challenge))
//! ```
//! Both steps use standard base64 with padding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Computes the `authentication` string sent in Identify.
///
/// Pure: the same inputs always give the same output. An empty password is
/// hashed like any other string.
///
/// # Examples
///
/// ```rust
/// use valleycast_core::protocol::auth::compute_auth_response;
///
/// let auth = compute_auth_response("", "salt", "challenge");
/// assert_eq!(auth, "5fmcrqR0I7snYOpUX/Ac22UdSA81TwCyHqCr6eFQyyI=");
/// ```
pub fn compute_auth_response(password: &str, salt: &str, challenge: &str) -> String {
    let secret = hash_to_base64(password, salt);
    hash_to_base64(&secret, challenge)
}

fn hash_to_base64(first: &str, second: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(first.as_bytes());
    hasher.update(second.as_bytes());
    STANDARD.encode(hasher.finalize())
}
