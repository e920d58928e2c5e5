//! `OpenAPI` (3.x) specification generation for the picker API.

use std::sync::OnceLock;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// `OpenAPI` documentation for the picker API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Commander Picker API",
        description = "Card listing and reservation backend over an external sheet."
    ),
    paths(
        crate::openapi::get_openapi_json,
        crate::routes::cards::list_cards,
        crate::routes::select::select_card,
        crate::routes::admin::reset_reservations,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::routes::cards::CardResponse,
            crate::routes::select::SelectCardRequest,
            crate::routes::select::SelectCardResponse,
            crate::routes::admin::ResetResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "cards", description = "Card listing and reservation"),
        (name = "admin", description = "Administrative operations"),
    ),
)]
pub struct PickerApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "adminSecret",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Admin-Secret"))),
            );
        }
    }
}

/// Returns the generated `OpenAPI` spec.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    PickerApiDoc::openapi()
}

static OPENAPI_JSON_CACHE: OnceLock<String> = OnceLock::new();

/// Returns the generated `OpenAPI` spec serialized as pretty JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen).
pub fn openapi_json() -> Result<String, serde_json::Error> {
    if let Some(spec) = OPENAPI_JSON_CACHE.get() {
        return Ok(spec.clone());
    }
    let spec = serde_json::to_string_pretty(&openapi())?;
    Ok(OPENAPI_JSON_CACHE.get_or_init(|| spec).clone())
}

/// Serve the OpenAPI specification.
///
/// GET /openapi.json
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "OpenAPI",
    responses(
        (status = 200, description = "OpenAPI specification", content_type = "application/json"),
    )
)]
pub(crate) async fn get_openapi_json() -> Response {
    match openapi_json() {
        Ok(spec) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            spec,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize OpenAPI spec");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
