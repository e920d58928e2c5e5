//! Card reservation route.
//!
//! `POST /api/v1/select-card` — reserves a named card for a user. The
//! cheap policy pre-check (duplicate color, max count) runs here against
//! a cache-backed read; the authoritative availability check happens
//! inside the coordinator against a fresh read. The two tiers are a
//! deliberate latency/correctness tradeoff and must not be collapsed.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use picker_core::query::user_holdings;
use picker_core::Error as CoreError;

use super::parse_color;
use crate::error::{ApiError, ApiErrorBody};
use crate::server::AppState;

/// Reservation request payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectCardRequest {
    /// The user making the reservation.
    pub user_name: String,
    /// The card to reserve.
    pub card_name: String,
    /// The card's color.
    pub card_color: String,
}

/// Successful reservation response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectCardResponse {
    /// Always `"success"`.
    pub message: String,
    /// The reserved card.
    pub card_name: String,
    /// The reserved card's color.
    pub card_color: String,
    /// The holder as recorded in the sheet (lowercased).
    pub user_name: String,
}

/// Routes served by this module.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/select-card", post(select_card))
}

/// Reserve a card.
///
/// POST /api/v1/select-card
#[utoipa::path(
    post,
    path = "/api/v1/select-card",
    tag = "cards",
    request_body = SelectCardRequest,
    responses(
        (status = 200, description = "Reservation recorded", body = SelectCardResponse),
        (status = 400, description = "Invalid payload", body = ApiErrorBody),
        (status = 404, description = "Card not found", body = ApiErrorBody),
        (status = 409, description = "Already reserved or limit reached", body = ApiErrorBody),
        (status = 500, description = "Data source or update failure", body = ApiErrorBody),
    )
)]
pub(crate) async fn select_card(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectCardRequest>,
) -> Result<Json<SelectCardResponse>, ApiError> {
    let user = req.user_name.trim();
    if user.is_empty() {
        return Err(ApiError::bad_request("userName must not be blank"));
    }
    let card = req.card_name.trim();
    if card.is_empty() {
        return Err(ApiError::bad_request("cardName must not be blank"));
    }
    let color = parse_color(&req.card_color)?;

    let user_lower = user.to_lowercase();
    tracing::info!(user = %user_lower, card, %color, "reservation requested");

    // Cheap pre-check against the cached snapshot; the coordinator makes
    // the authoritative call against a fresh read.
    let snapshot = state.cache.read().await?;
    let (_, colors_held) = user_holdings(snapshot.records(), user);

    if colors_held.contains(color.as_str()) {
        tracing::warn!(user = %user_lower, %color, "duplicate color reservation rejected");
        return Err(CoreError::reservation_limit(format!(
            "You have already reserved a card of this color ({color})"
        ))
        .into());
    }
    if colors_held.len() >= state.config.max_reservations {
        tracing::warn!(
            user = %user_lower,
            max = state.config.max_reservations,
            "reservation limit reached"
        );
        return Err(CoreError::reservation_limit(format!(
            "Maximum reservations reached ({})",
            state.config.max_reservations
        ))
        .into());
    }

    state.coordinator.reserve(card, color, user).await?;

    Ok(Json(SelectCardResponse {
        message: "success".to_string(),
        card_name: card.to_string(),
        card_color: color.to_string(),
        user_name: user_lower,
    }))
}
