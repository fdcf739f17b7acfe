use axum::{Json, Router, response::IntoResponse, routing};
use serde::Serialize;
use utoipa::{
    ToSchema,
    openapi::{
        Components, InfoBuilder, OpenApi,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{app_error::AppError, app_state::AppState};

pub mod auth;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod settings;

pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Full HTTP surface, with the generated OpenAPI document served at
/// [`OPENAPI_PATH`].
pub fn app(state: AppState) -> Router {
    let routes = OpenApiRouter::new()
        .routes(routes!(health))
        .merge(auth::routes_with_openapi())
        .merge(orders::routes_with_openapi(&state))
        .merge(products::routes_with_openapi(&state))
        .merge(reviews::routes_with_openapi(&state))
        .merge(notifications::routes_with_openapi(&state))
        .merge(settings::routes_with_openapi(&state));

    let (router, openapi) = routes.split_for_parts();
    let openapi = document(openapi);

    router
        .route(OPENAPI_PATH, routing::get(move || async move { Json(openapi) }))
        .with_state(state)
}

fn document(mut openapi: OpenApi) -> OpenApi {
    openapi.info = InfoBuilder::new()
        .title("Adunni Foods Storefront API")
        .version(env!("CARGO_PKG_VERSION"))
        .build();
    openapi
        .components
        .get_or_insert_with(Components::default)
        .add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    openapi
}

/// Row offset of a 1-indexed page. Pages past the addressable range are a
/// client error.
pub(crate) fn page_offset(page: i64, limit: i64) -> Result<i64, AppError> {
    page.checked_sub(1)
        .and_then(|skipped| skipped.checked_mul(limit))
        .ok_or_else(|| AppError::BadRequest("Page is out of range".into()))
}

#[derive(Serialize, ToSchema)]
struct HealthRes {
    status: &'static str,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tags = ["Health"],
    responses(
        (status = 200, description = "Service is up", body = HealthRes)
    )
)]
async fn health() -> impl IntoResponse {
    Json(HealthRes { status: "ok" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_skips_whole_pages() {
        assert_eq!(page_offset(1, 10).unwrap(), 0);
        assert_eq!(page_offset(3, 25).unwrap(), 50);
    }

    #[test]
    fn page_offset_rejects_unaddressable_pages() {
        assert!(matches!(page_offset(i64::MAX, 10), Err(AppError::BadRequest(_))));
        assert!(matches!(page_offset(i64::MIN, 1), Err(AppError::BadRequest(_))));
    }
}
