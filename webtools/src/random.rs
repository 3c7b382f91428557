//! Random identifiers for renamed uploads.

use rand::prelude::RngExt;
use rand::rng;

/// Characters a generated identifier is drawn from. 64 entries, all safe in file names.
pub const ALPHABET: &[u8; 64] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_+";

/// Generate a random string of exactly `length` characters from [`ALPHABET`].
///
/// Uses the thread-local generator, which panics if the OS cannot provide entropy.
pub fn generate(length: usize) -> String {
    let mut rng = rng();
    (0..length)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}
