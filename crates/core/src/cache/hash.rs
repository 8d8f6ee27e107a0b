//! Request-identity keys for stored responses.

use sha2::{Digest, Sha256};

/// Compute the key a response is stored under.
///
/// The identity is the upper-cased method plus the URL without its fragment,
/// so `GET /app.js#v` and `GET /app.js` share an entry.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let url = url.split_once('#').map_or(url, |(head, _)| head);
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
