//! Random identifiers: invite codes, slug suffixes and token ids.

use rand::Rng;

/// Characters allowed in an invite code.
pub const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of an invite code.
pub const INVITE_CODE_LENGTH: usize = 8;

/// Length of the random suffix appended to organization slugs.
pub const SLUG_SUFFIX_LENGTH: usize = 6;

const SLUG_SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

fn sample(alphabet: &[u8], length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
        .collect()
}

/// Generates an invite code of [`INVITE_CODE_LENGTH`] characters drawn
/// uniformly from `[A-Z0-9]`.
pub fn generate_invite_code() -> String {
    sample(INVITE_CODE_ALPHABET, INVITE_CODE_LENGTH)
}

/// Trims and uppercases user input, returning `None` unless the result is
/// exactly [`INVITE_CODE_LENGTH`] characters of `[A-Z0-9]`.
///
/// ```rust
/// use tenantry::crypto::normalize_invite_code;
///
/// assert_eq!(normalize_invite_code(" ab12cd34 ").as_deref(), Some("AB12CD34"));
/// assert_eq!(normalize_invite_code("AB12CD3"), None);
/// assert_eq!(normalize_invite_code("AB12-D34"), None);
/// ```
pub fn normalize_invite_code(input: &str) -> Option<String> {
    let code = input.trim().to_ascii_uppercase();
    let valid = code.len() == INVITE_CODE_LENGTH && code.bytes().all(|b| INVITE_CODE_ALPHABET.contains(&b));
    valid.then_some(code)
}

/// Lowercase alphanumeric suffix that keeps organization slugs unique.
pub fn generate_slug_suffix() -> String {
    sample(SLUG_SUFFIX_ALPHABET, SLUG_SUFFIX_LENGTH)
}

/// Generates an alphanumeric token, used for session token ids.
pub fn generate_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_code_format() {
        for _ in 0..200 {
            let code = generate_invite_code();
            assert_eq!(code.len(), 8);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_invite_code_unique() {
        let a = generate_invite_code();
        let b = generate_invite_code();
        assert_ne!(a, b);
    }

    #[test]
    fn test_generated_code_survives_normalization() {
        let code = generate_invite_code();
        assert_eq!(normalize_invite_code(&code), Some(code));
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        assert_eq!(normalize_invite_code(""), None);
        assert_eq!(normalize_invite_code("AB12CD345"), None);
        assert_eq!(normalize_invite_code("ÄB12CD34"), None);
        assert_eq!(normalize_invite_code("AB 2CD34"), None);
    }

    #[test]
    fn test_slug_suffix() {
        let suffix = generate_slug_suffix();
        assert_eq!(suffix.len(), SLUG_SUFFIX_LENGTH);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_token_alphanumeric() {
        let token = generate_token(100);
        assert_eq!(token.len(), 100);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
