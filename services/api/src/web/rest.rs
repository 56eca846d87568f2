//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::protocol::{
    ChatRequest, ChatResponse, HealthResponse, HistoryEntry, RecipeCardView, RecommendRequest,
    RecommendationView, UsedTool,
};
use crate::web::state::AppState;
use axum::{extract::State, http::StatusCode, response::Json, Extension};
use chefcito_core::tools::summarize_recipes_by_ids;
use chefcito_core::{ChatError, CurrentUser, Macro, RecommendError, RecommendationQuery};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        chat_handler,
        recommend_handler,
        health_handler,
    ),
    components(
        schemas(
            ChatRequest,
            ChatResponse,
            HistoryEntry,
            RecipeCardView,
            UsedTool,
            RecommendRequest,
            RecommendationView,
            HealthResponse
        )
    ),
    tags(
        (name = "Chefcito API", description = "Conversational recipe assistant and ingredient-based recommendations.")
    )
)]
pub struct ApiDoc;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Run one turn of the recipe assistant.
///
/// The conversation history is supplied by the client; the server keeps no chat state.
/// An optional `x-user-id` header applies that user's dietary restrictions.
#[utoipa::path(
    post,
    path = "/chefcito/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Blank message or malformed x-user-id header"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Option<Uuid>, Header, description = "The unique ID of the signed-in user.")
    )
)]
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    if request.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message is required".to_string()));
    }
    let history = request.conversation();

    // The turn runs on its own task; dropping this handler (client gone) cancels it.
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let agent = app_state.agent.clone();
    let message = request.message;
    let turn = tokio::spawn(async move {
        agent
            .chat_with_cancellation(&user, &message, &history, &cancel)
            .await
    });

    let joined = turn.await;
    let _ = guard.disarm();
    let reply = match joined {
        Ok(Ok(reply)) => reply,
        Ok(Err(ChatError::EmptyMessage)) => {
            return Err((StatusCode::BAD_REQUEST, "message is required".to_string()))
        }
        Err(e) => {
            error!("Agent turn panicked or was aborted: {:?}", e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to run the assistant".to_string(),
            ));
        }
    };
    info!(
        outcome = ?reply.outcome,
        tools = reply.used_tools.len(),
        recipes = reply.recipe_ids.len(),
        "chat turn finished"
    );

    let ids: Vec<String> = reply.recipe_ids.iter().map(|id| id.to_string()).collect();
    let cards = match summarize_recipes_by_ids(app_state.catalog.as_ref(), &ids).await {
        Ok(cards) => cards,
        Err(e) => {
            error!("Failed to load recipe cards for a chat reply: {:?}", e);
            Vec::new()
        }
    };

    Ok(Json(ChatResponse::new(reply, cards)))
}

/// Recommend recipes from the ingredients at hand.
///
/// Recipes are ranked by how few ingredients are missing. Recipes using an ingredient
/// tagged with a listed restriction, or one of the caller's own, are never returned.
#[utoipa::path(
    post,
    path = "/recipes/recommend",
    request_body = RecommendRequest,
    responses(
        (status = 200, description = "Ranked recipes", body = [RecommendationView]),
        (status = 400, description = "No ingredients, unknown macro or malformed x-user-id header"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Option<Uuid>, Header, description = "The unique ID of the signed-in user.")
    )
)]
pub async fn recommend_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<RecommendRequest>,
) -> ApiResult<Vec<RecommendationView>> {
    let macro_key = match request.macro_key.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(Macro::parse(raw).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("Unknown macro '{}'", raw),
            )
        })?),
    };

    let mut forbidden = request.dietary_restriction_ids;
    if let Some(user_id) = user.user_id() {
        let own = app_state
            .catalog
            .dietary_restriction_ids_for_user(user_id)
            .await
            .map_err(|e| {
                error!("Failed to load dietary restrictions: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to load dietary restrictions".to_string(),
                )
            })?;
        for id in own {
            if !forbidden.contains(&id) {
                forbidden.push(id);
            }
        }
    }

    let query = RecommendationQuery {
        ingredients: request.ingredients,
        categories: request.categories,
        macro_key,
        dietary_restriction_ids: forbidden,
    };

    match app_state.recommender.recommend(&query).await {
        Ok(rows) => Ok(Json(rows.into_iter().map(RecommendationView::from).collect())),
        Err(RecommendError::NoIngredients) => Err((
            StatusCode::BAD_REQUEST,
            "At least one ingredient is required".to_string(),
        )),
        Err(RecommendError::Port(e)) => {
            error!("Failed to compute recommendations: {:?}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to compute recommendations".to_string(),
            ))
        }
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "The service is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
