pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::resolve_user;
pub use rest::{chat_handler, health_handler, recommend_handler, ApiDoc};
pub use state::AppState;

/// Builds the application router: the assistant routes, the health probe and Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/chefcito/chat", post(chat_handler))
        .route("/recipes/recommend", post(recommend_handler))
        .layer(axum_middleware::from_fn(resolve_user))
        .route("/health", get(health_handler))
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
