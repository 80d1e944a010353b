/// Device authentication middleware for Axum
///
/// Validates the `X-Api-Key` header against the `device_keys` table and
/// adds a [`DeviceContext`] to request extensions. Every `/v1` route runs
/// behind this middleware; the context's `gym_id` is the tenant scope for
/// the request.
///
/// # Example
///
/// ```no_run
/// use axum::Extension;
/// use gymgate_shared::auth::middleware::DeviceContext;
///
/// async fn handler(Extension(device): Extension<DeviceContext>) -> String {
///     format!("Scanning for gym {}", device.gym_id)
/// }
/// ```

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::device_key::{hash_device_key, validate_device_key_format};
use crate::models::device_key::DeviceKey;

/// Header carrying the device key
pub const DEVICE_KEY_HEADER: &str = "x-api-key";

/// Authenticated device context added to request extensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceContext {
    /// Device key ID that authenticated the request
    pub device_key_id: Uuid,

    /// Gym the device is bound to; the tenant scope for the request
    pub gym_id: Uuid,

    /// Operator-facing device name
    pub device_name: String,
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing X-Api-Key header
    MissingCredentials,

    /// Header present but not a well-formed device key
    InvalidFormat(String),

    /// Key unknown or revoked
    InvalidKey(String),

    /// Database error during lookup
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing device key").into_response()
            }
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AuthError::InvalidKey(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            AuthError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// Device key authentication middleware
///
/// Validates the device key from the `X-Api-Key` header, looks it up by
/// hash, rejects revoked keys, and records the use timestamp.
///
/// # Errors
///
/// Returns 401 Unauthorized if the header is missing, the key is unknown,
/// or the key has been revoked; 400 if the header is malformed.
pub async fn device_key_auth_middleware(
    pool: PgPool,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let presented = req
        .headers()
        .get(DEVICE_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    if !validate_device_key_format(presented) {
        return Err(AuthError::InvalidFormat(
            "Malformed device key".to_string(),
        ));
    }

    let hash = hash_device_key(presented);
    let key = DeviceKey::find_by_hash(&pool, &hash)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or_else(|| AuthError::InvalidKey("Unknown device key".to_string()))?;

    if key.is_revoked() {
        tracing::warn!(device_key_id = %key.id, gym_id = %key.gym_id, "Revoked device key presented");
        return Err(AuthError::InvalidKey("Device key revoked".to_string()));
    }

    // Best-effort bookkeeping; an error here must not fail the scan
    if let Err(e) = DeviceKey::touch(&pool, key.id).await {
        tracing::debug!(device_key_id = %key.id, error = %e, "Failed to update last_used_at");
    }

    let context = DeviceContext {
        device_key_id: key.id,
        gym_id: key.gym_id,
        device_name: key.name.clone(),
    };
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}
