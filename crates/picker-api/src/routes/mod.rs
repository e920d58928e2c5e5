//! HTTP route handlers.

pub mod admin;
pub mod cards;
pub mod select;

use std::sync::Arc;

use axum::Router;

use picker_core::card::Color;

use crate::error::ApiError;
use crate::server::AppState;

/// `/api/v1` routes.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(cards::routes())
        .merge(select::routes())
        .merge(admin::routes())
}

/// Parses a color from client input, rejecting anything outside the
/// closed vocabulary before any service call.
pub(crate) fn parse_color(value: &str) -> Result<Color, ApiError> {
    value
        .parse::<Color>()
        .map_err(|err| ApiError::bad_request(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_color_accepts_the_closed_vocabulary() {
        assert_eq!(parse_color("Red").unwrap(), Color::Red);
        assert_eq!(parse_color(" blue ").unwrap(), Color::Blue);
    }

    #[test]
    fn parse_color_rejects_unknown_values() {
        let err = parse_color("pink").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(err.message().contains("valid colors"));
    }
}
