/// Attendance endpoints
///
/// The scan endpoint is what kiosks hit on every badge read or typed
/// code; the auto-checkout endpoint is the on-demand form of the
/// overnight sweep (an operator pressing "close stale sessions" in the
/// back office).
///
/// # Endpoints
///
/// `POST /v1/attendance/scan`
/// `POST /v1/attendance/auto-checkout`
///
/// # Authentication
///
/// Device key (`X-Api-Key: gym_…`); the key's gym scopes the operation.
///
/// # Example Scan Request
///
/// ```json
/// { "input": "MEM001" }
/// ```
///
/// or the full badge payload as scanned:
///
/// ```json
/// { "input": "{\"type\":\"gym_attendance\",\"member_id\":\"MEM001\",...}" }
/// ```
///
/// # Example Scan Response
///
/// Every business outcome is HTTP 200; the kiosk branches on the body.
///
/// ```json
/// {
///   "success": true,
///   "action": "check_in",
///   "member": { "...": "..." },
///   "membership": { "...": "..." },
///   "session": { "...": "..." },
///   "message": "Welcome, Dana! You are checked in."
/// }
/// ```

use crate::app::AppState;
use crate::error::ApiError;
use axum::{extract::State, Extension, Json};
use chrono::Utc;
use gymgate_shared::auth::middleware::DeviceContext;
use gymgate_shared::checkin::{ScanResult, SweepResult};
use serde::Deserialize;
use validator::Validate;

/// Scan request: whatever the scanner read or the member typed
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScanRequest {
    /// Raw scan text: a bare member code or a serialized badge payload
    #[validate(length(min = 1, max = 4096))]
    pub input: String,
}

/// Scan endpoint handler
///
/// Resolves the input to a member and toggles today's session. Refusals
/// (unknown code, suspended member, lapsed membership, wrong gym) are
/// part of the 200 response, not HTTP errors.
///
/// # Errors
///
/// - 400/422: malformed or empty request body
/// - 401: missing or invalid device key
pub async fn scan(
    State(state): State<AppState>,
    Extension(device): Extension<DeviceContext>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResult>, ApiError> {
    request.validate()?;

    tracing::info!(
        gym_id = %device.gym_id,
        device = %device.device_name,
        "Processing attendance scan"
    );

    let result = state
        .engine
        .process_scan(&request.input, Some(device.gym_id), Utc::now())
        .await;

    Ok(Json(result))
}

/// On-demand auto-checkout sweep for the device's gym
///
/// Closes sessions left open past the end of yesterday. Safe to call
/// repeatedly; a second run reports zero closures.
///
/// # Errors
///
/// - 401: missing or invalid device key
pub async fn auto_checkout(
    State(state): State<AppState>,
    Extension(device): Extension<DeviceContext>,
) -> Result<Json<SweepResult>, ApiError> {
    tracing::info!(
        gym_id = %device.gym_id,
        device = %device.device_name,
        "Running on-demand auto-checkout sweep"
    );

    let result = state.engine.auto_checkout(device.gym_id, Utc::now()).await;

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_request_validation() {
        let valid = ScanRequest {
            input: "MEM001".to_string(),
        };
        assert!(valid.validate().is_ok());

        let empty = ScanRequest {
            input: "".to_string(),
        };
        assert!(empty.validate().is_err());

        let oversized = ScanRequest {
            input: "x".repeat(5000),
        };
        assert!(oversized.validate().is_err());
    }
}
