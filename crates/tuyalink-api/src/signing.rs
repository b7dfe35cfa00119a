// Request signing primitives
//
// Pure functions for the cloud's HMAC-SHA256 request signature. The
// signed material is `prefix + stringToSign`, where the prefix differs
// between token requests and business requests; see `client.rs`.

use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 of the empty byte sequence.
pub const EMPTY_BODY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Value of the `sign_method` header.
pub const SIGN_METHOD: &str = "HMAC-SHA256";

const NONCE_LEN: usize = 16;

/// Lowercase hex SHA-256 of the request body.
///
/// An empty body always yields [`EMPTY_BODY_SHA256`].
pub fn content_digest(body: &[u8]) -> String {
    if body.is_empty() {
        return EMPTY_BODY_SHA256.to_owned();
    }
    hex::encode(Sha256::digest(body))
}

/// Canonical string to sign:
///
/// ```text
/// METHOD
/// content-sha256
/// <optional signed headers, always empty here>
/// /path?query
/// ```
///
/// `path_with_query` is taken verbatim; query parameters are not re-sorted.
pub fn string_to_sign(method: &str, path_with_query: &str, body: &[u8]) -> String {
    [
        method.to_ascii_uppercase(),
        content_digest(body),
        String::new(),
        path_with_query.to_owned(),
    ]
    .join("\n")
}

/// HMAC-SHA256 of `material` keyed with `secret`, as uppercase hex.
pub fn sign(material: &str, secret: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(material.as_bytes());
    hex::encode_upper(mac.finalize().into_bytes())
}

/// Random 16-character alphanumeric nonce.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}
