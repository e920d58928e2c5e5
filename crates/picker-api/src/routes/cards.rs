//! Card listing route.
//!
//! `GET /api/v1/cards/{color}?userName=…` — lists the cards to offer for
//! a color, honoring the requesting user's holdings and the per-user
//! reservation limit, each decorated with a resolved image URL.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use picker_core::query::pick_cards;

use super::parse_color;
use crate::error::{ApiError, ApiErrorBody};
use crate::server::AppState;

/// A card offered to the client.
#[derive(Debug, Serialize, ToSchema)]
pub struct CardResponse {
    /// Card name.
    pub name: String,
    /// URL of the card image (local cache path or placeholder).
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CardsQuery {
    #[serde(rename = "userName")]
    user_name: Option<String>,
}

/// Routes served by this module.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/cards/:color", get(list_cards))
}

/// List cards for a color.
///
/// GET /api/v1/cards/{color}
#[utoipa::path(
    get,
    path = "/api/v1/cards/{color}",
    tag = "cards",
    params(
        ("color" = String, Path, description = "Card color (white, blue, black, red, green)"),
        ("userName" = Option<String>, Query, description = "Requesting user, if known"),
    ),
    responses(
        (status = 200, description = "Cards to offer", body = [CardResponse]),
        (status = 400, description = "Invalid color", body = ApiErrorBody),
        (status = 500, description = "Data source failure", body = ApiErrorBody),
    )
)]
pub(crate) async fn list_cards(
    Path(color): Path<String>,
    Query(query): Query<CardsQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CardResponse>>, ApiError> {
    let color = parse_color(&color)?;
    let user = query.user_name.as_deref();
    tracing::info!(%color, user = user.unwrap_or(""), "listing cards");

    let snapshot = state.cache.read().await?;
    let picks = pick_cards(
        snapshot.records(),
        color,
        user,
        state.config.max_reservations,
    );

    let mut cards = Vec::with_capacity(picks.len());
    for record in picks {
        let image = state.images.resolve(&record.name).await;
        cards.push(CardResponse {
            name: record.name,
            image,
        });
    }
    Ok(Json(cards))
}
