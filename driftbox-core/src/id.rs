use crate::error::{DriftError, Result};
use rand::RngCore;
use rand::rngs::OsRng;

/// Number of random bytes behind each identifier (128 bits).
pub const ID_BYTES: usize = 16;

/// Generate an opaque blob identifier from the OS entropy source.
///
/// Entropy failures surface as `IdGeneration` and are never retried here.
pub fn generate_id() -> Result<String> {
    let mut buf = [0u8; ID_BYTES];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| DriftError::IdGeneration(e.to_string()))?;
    Ok(hex::encode(buf))
}

/// Whether `id` has the shape `generate_id` produces. Lets callers reject
/// path-like input before it reaches the store.
pub fn is_well_formed(id: &str) -> bool {
    id.len() == ID_BYTES * 2 && id.bytes().all(|b| b.is_ascii_hexdigit())
}
