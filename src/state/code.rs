use rand::Rng;

/// Number of characters in a room code.
pub const CODE_LENGTH: usize = 6;

/// Alphabet room codes are drawn from (uppercase hexadecimal).
pub const CODE_ALPHABET: &[u8] = b"0123456789ABCDEF";

/// Generate a random room code.
///
/// Stateless; uniqueness among live rooms is the registry's job, which retries
/// with a fresh code on collision.
pub fn generate() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}
