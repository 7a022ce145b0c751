// ============================
// crates/authsvc/src/auth/token_generator.rs
// ============================
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
/** Secure token generation for session tokens
Tokens are pure CSPRNG output; no timestamp or counter is mixed in, so a
token carries no information about when or for whom it was issued. */
use rand::RngCore;

/// Default token size in bytes (32 bytes = 256 bits of entropy)
pub const DEFAULT_TOKEN_BYTES: usize = 32;

/// Smallest token size the service accepts (128 bits)
pub const MIN_TOKEN_BYTES: usize = 16;

/** Generate a cryptographically secure random token
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token() -> String {
    generate_secure_token_with_size(DEFAULT_TOKEN_BYTES)
}

/** Generate a cryptographically secure random token with specified size
# Arguments
* `bytes` - The size of the random token in bytes
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

/// Short, non-reversible prefix of a token that is safe to put in logs
pub fn fingerprint(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(8)
        .map_or(token.len(), |(idx, _)| idx);
    &token[..end]
}
