/// Badge generation endpoint
///
/// Produces the QR payload for a member plus a ready-to-embed PNG data
/// URI. If the image pipeline faults the response still succeeds with a
/// visibly-marked placeholder; a reception screen must never crash
/// because one badge failed to render.
///
/// # Endpoint
///
/// `GET /v1/members/:code/badge`
///
/// # Example Response
///
/// ```json
/// {
///   "payload": {
///     "type": "gym_attendance",
///     "member_id": "MEM001",
///     "gym_id": "550e8400-e29b-41d4-a716-446655440000",
///     "name": "Dana Park",
///     "generated_at": "2026-01-10T12:00:00Z"
///   },
///   "image": "data:image/png;base64,iVBORw0K..."
/// }
/// ```

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use gymgate_shared::auth::middleware::DeviceContext;
use gymgate_shared::models::member::Member;
use gymgate_shared::qr::{badge_data_uri, BadgePayload};
use serde::Serialize;

/// Badge response: the payload and its rendered image
#[derive(Debug, Clone, Serialize)]
pub struct BadgeResponse {
    /// The payload encoded in the QR image
    pub payload: BadgePayload,

    /// PNG data URI of the QR code (placeholder on render fault)
    pub image: String,
}

/// Badge endpoint handler
///
/// Looks the member up within the device's gym and renders their badge.
///
/// # Errors
///
/// - 401: missing or invalid device key
/// - 404: no member with this code at this gym
pub async fn member_badge(
    State(state): State<AppState>,
    Extension(device): Extension<DeviceContext>,
    Path(code): Path<String>,
) -> Result<Json<BadgeResponse>, ApiError> {
    let member = Member::find_by_code(&state.db, &code, Some(device.gym_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No member with code \"{code}\"")))?;

    let payload = BadgePayload::new(
        member.member_code.clone(),
        member.gym_id,
        member.full_name(),
        Utc::now(),
    );
    let image = badge_data_uri(&payload);

    tracing::info!(
        member_code = %member.member_code,
        gym_id = %member.gym_id,
        "Generated badge"
    );

    Ok(Json(BadgeResponse { payload, image }))
}
