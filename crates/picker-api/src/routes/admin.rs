//! Administrative routes.
//!
//! `POST /api/v1/admin/reset` clears every reservation in the sheet.
//! Guarded by a single shared secret supplied in the `X-Admin-Secret`
//! header; when no secret is configured the endpoint is disabled.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ApiError, ApiErrorBody};
use crate::server::AppState;

/// Header carrying the shared admin secret.
pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Reset response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResetResponse {
    /// Number of reservations cleared.
    pub cleared: usize,
}

/// Routes served by this module.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/admin/reset", post(reset_reservations))
}

/// Clear all reservations.
///
/// POST /api/v1/admin/reset
#[utoipa::path(
    post,
    path = "/api/v1/admin/reset",
    tag = "admin",
    responses(
        (status = 200, description = "Reservations cleared", body = ResetResponse),
        (status = 401, description = "Invalid admin secret", body = ApiErrorBody),
        (status = 503, description = "Admin reset not configured", body = ApiErrorBody),
    ),
    security(
        ("adminSecret" = [])
    )
)]
pub(crate) async fn reset_reservations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ResetResponse>, ApiError> {
    let Some(secret) = state.config.admin_secret.as_deref() else {
        return Err(ApiError::service_unavailable("admin reset is not configured"));
    };

    let provided = headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if provided != secret {
        tracing::warn!("admin reset rejected: invalid secret");
        return Err(ApiError::unauthorized("invalid admin secret"));
    }

    let cleared = state.coordinator.clear_reservations().await?;
    tracing::info!(cleared, "admin reset completed");
    Ok(Json(ResetResponse { cleared }))
}
