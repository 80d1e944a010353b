/// Scanner device authentication
///
/// Kiosks and turnstile scanners authenticate with per-device API keys.
/// A key is bound to one gym; the gym becomes the tenant scope for every
/// attendance operation the device performs.
///
/// # Modules
///
/// - [`device_key`]: Key generation and validation utilities
/// - [`middleware`]: Axum middleware resolving `X-Api-Key` to a [`middleware::DeviceContext`]
///
/// # Security
///
/// - **Format**: `gym_{32_chars}` (prefix + 32 random alphanumeric chars)
/// - **Storage**: Keys are hashed with SHA-256 before storage
/// - **Validation**: Constant-time comparison to prevent timing attacks

pub mod device_key;
pub mod middleware;
