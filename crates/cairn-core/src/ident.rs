//! Peer identifier generation.

use rand::Rng;

/// Identifier alphabet: 36 symbols, lowercase so ids survive
/// case-insensitive transports and logs unchanged.
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Identifier length. 36^12 candidate ids make a collision within one
/// hub's live population vanishingly unlikely; the registry still retries
/// on the off chance.
pub const ID_LEN: usize = 12;

/// Generate a fresh peer identifier.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
