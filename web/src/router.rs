use crate::controller::{health_check_controller, oauth_controller};
use crate::AppState;
use axum::{response::IntoResponse, routing::get, Json, Router};
use tower_http::services::ServeDir;

use utoipa::OpenApi;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Creator Connect API"
        ),
        paths(
            health_check_controller::health_check,
            oauth_controller::start,
            oauth_controller::callback,
        ),
        tags(
            (name = "creator_connect", description = "Link creators to their TikTok accounts")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    let dashboard_dir = app_state.config.dashboard_dir().to_string();

    Router::new()
        .merge(health_routes())
        .merge(oauth_routes(app_state))
        .merge(api_doc_routes())
        .fallback_service(static_routes(&dashboard_dir))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn oauth_routes(app_state: AppState) -> Router {
    // Neither route requires auth: the user agent arrives by browser redirect
    Router::new()
        .route("/api/oauth/start", get(oauth_controller::start))
        .route("/api/oauth/callback", get(oauth_controller::callback))
        .with_state(app_state)
}

fn api_doc_routes() -> Router {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// The dashboard is plain static files; the connected redirect lands on its index.
pub fn static_routes(dashboard_dir: &str) -> ServeDir {
    ServeDir::new(dashboard_dir)
}
