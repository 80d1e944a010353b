/// Device key generation and validation utilities
///
/// These work in conjunction with the `models::device_key` module for
/// database operations.
///
/// # Key Format
///
/// Device keys follow the pattern: `gym_abcd1234efgh5678...` (36 chars total)
/// - Prefix: "gym_" (4 chars)
/// - Random part: 32 alphanumeric chars (base62: [A-Za-z0-9])
///
/// # Example
///
/// ```
/// use gymgate_shared::auth::device_key::{generate_device_key, hash_device_key, validate_device_key_format};
///
/// // Generate a new device key
/// let (key, hash) = generate_device_key();
/// assert!(key.starts_with("gym_"));
/// assert_eq!(key.len(), 36);
///
/// // Validate format
/// assert!(validate_device_key_format(&key));
///
/// // Hash matches
/// let computed_hash = hash_device_key(&key);
/// assert_eq!(hash, computed_hash);
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the random part of the device key (characters)
const KEY_RANDOM_LENGTH: usize = 32;

/// Device key prefix
const KEY_PREFIX: &str = "gym_";

/// Total length of a device key (prefix + random)
pub const DEVICE_KEY_LENGTH: usize = KEY_PREFIX.len() + KEY_RANDOM_LENGTH;

/// Generates a new device key
///
/// Creates a cryptographically random key with the format `gym_{32_chars}`
/// and returns it together with its SHA-256 hash for database storage.
/// The plaintext is shown to the operator exactly once at provisioning
/// time and never stored.
pub fn generate_device_key() -> (String, String) {
    let random_part = generate_random_string(KEY_RANDOM_LENGTH);
    let key = format!("{}{}", KEY_PREFIX, random_part);
    let hash = hash_device_key(&key);

    (key, hash)
}

/// Generates a random alphanumeric string
///
/// Uses base62 encoding (A-Z, a-z, 0-9) for URL-safe keys.
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Hashes a device key using SHA-256
///
/// Returns the hex-encoded SHA-256 hash (64 characters).
pub fn hash_device_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Validates device key format
///
/// Checks that the key:
/// - Starts with "gym_"
/// - Has correct length (36 chars)
/// - Contains only alphanumeric characters after the prefix
pub fn validate_device_key_format(key: &str) -> bool {
    if key.len() != DEVICE_KEY_LENGTH {
        return false;
    }

    let Some(random_part) = key.strip_prefix(KEY_PREFIX) else {
        return false;
    };

    random_part.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Verifies a device key against a stored hash
///
/// Hashes the presented key and compares in constant time.
pub fn verify_device_key(key: &str, stored_hash: &str) -> bool {
    let computed = hash_device_key(key);
    constant_time_compare(&computed, stored_hash)
}

/// Constant-time string comparison
///
/// Both inputs are compared byte-for-byte regardless of where the first
/// difference is, so timing does not leak the hash prefix.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_device_key_format() {
        let (key, hash) = generate_device_key();
        assert!(key.starts_with("gym_"));
        assert_eq!(key.len(), DEVICE_KEY_LENGTH);
        assert_eq!(hash.len(), 64);
        assert!(validate_device_key_format(&key));
    }

    #[test]
    fn test_generated_keys_are_unique() {
        let (a, _) = generate_device_key();
        let (b, _) = generate_device_key();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let hash1 = hash_device_key("gym_test123");
        let hash2 = hash_device_key("gym_test123");
        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash_device_key("gym_test124"));
    }

    #[test]
    fn test_validate_device_key_format() {
        let (key, _) = generate_device_key();
        assert!(validate_device_key_format(&key));

        assert!(!validate_device_key_format("gym_short"));
        // Right length, wrong prefix
        assert!(!validate_device_key_format("gym-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
        assert!(!validate_device_key_format("gym_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa!!"));
        assert!(!validate_device_key_format(""));
    }

    #[test]
    fn test_verify_device_key() {
        let (key, hash) = generate_device_key();
        assert!(verify_device_key(&key, &hash));
        assert!(!verify_device_key("gym_wrongwrongwrongwrongwrongwrong12", &hash));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(constant_time_compare("", ""));
    }
}
