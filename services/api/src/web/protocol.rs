//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the web client and the API server.

use chefcito_core::{
    ChatReply, ChatRole, ConversationTurn, RecipeCard, RecommendedRecipe, ToolUsage, TurnOutcome,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Requests
//=========================================================================================

/// A previous message of the conversation, as stored by the client.
#[derive(Deserialize, Debug, Clone, ToSchema)]
pub struct HistoryEntry {
    /// `user`, `assistant` or `tool`. Unknown roles are ignored.
    pub role: String,
    pub content: String,
}

/// Request payload of one chat turn.
#[derive(Deserialize, Debug, ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl ChatRequest {
    /// The history entries with a known role, in their original order.
    pub fn conversation(&self) -> Vec<ConversationTurn> {
        self.history
            .iter()
            .filter_map(|entry| {
                Some(ConversationTurn {
                    role: ChatRole::parse(&entry.role)?,
                    content: entry.content.clone(),
                    metadata: None,
                })
            })
            .collect()
    }
}

/// Request payload of a direct recommendation.
#[derive(Deserialize, Debug, ToSchema)]
pub struct RecommendRequest {
    /// Ingredients at hand, by id or name.
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// One of `calories`, `protein`, `carbs`, `fat`, `sugar`.
    #[serde(default, rename = "macro")]
    pub macro_key: Option<String>,
    #[serde(default)]
    pub dietary_restriction_ids: Vec<Uuid>,
}

//=========================================================================================
// Responses
//=========================================================================================

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct RecipeCardView {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub total_time: u32,
    pub servings: u32,
    pub primary_image: Option<String>,
    pub rating_avg: Option<f64>,
    pub rating_count: u32,
}

impl From<RecipeCard> for RecipeCardView {
    fn from(card: RecipeCard) -> Self {
        Self {
            id: card.id,
            slug: card.slug,
            name: card.name,
            total_time: card.total_time,
            servings: card.servings,
            primary_image: card.primary_image,
            rating_avg: card.rating_avg,
            rating_count: card.rating_count,
        }
    }
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct UsedTool {
    pub tool: String,
    #[schema(value_type = Object)]
    pub args: serde_json::Value,
}

impl From<ToolUsage> for UsedTool {
    fn from(usage: ToolUsage) -> Self {
        Self {
            tool: usage.tool,
            args: usage.args,
        }
    }
}

/// Response payload of one chat turn.
#[derive(Serialize, Debug, ToSchema)]
pub struct ChatResponse {
    /// Markdown text to show to the user.
    pub reply: String,
    /// Ids of the recipes the reply refers to.
    pub recipes: Vec<Uuid>,
    /// Cards for `recipes`, in the same order.
    pub recipe_cards: Vec<RecipeCardView>,
    pub ingredients: Vec<String>,
    pub used_tools: Vec<UsedTool>,
    /// `final`, `fallback`, `need_more_input` or `cancelled`.
    pub outcome: String,
}

impl ChatResponse {
    pub fn new(reply: ChatReply, recipe_cards: Vec<RecipeCard>) -> Self {
        Self {
            reply: reply.reply,
            recipes: reply.recipe_ids,
            recipe_cards: recipe_cards.into_iter().map(RecipeCardView::from).collect(),
            ingredients: reply.ingredient_names,
            used_tools: reply.used_tools.into_iter().map(UsedTool::from).collect(),
            outcome: outcome_name(reply.outcome).to_string(),
        }
    }
}

fn outcome_name(outcome: TurnOutcome) -> &'static str {
    match outcome {
        TurnOutcome::Final => "final",
        TurnOutcome::Fallback => "fallback",
        TurnOutcome::NeedMoreInput => "need_more_input",
        TurnOutcome::Cancelled => "cancelled",
    }
}

/// A ranked recommendation row.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct RecommendationView {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub missing_count: usize,
    pub total_ingredients: usize,
    pub available_ingredients: usize,
    pub total_time: u32,
    pub servings: u32,
    pub primary_image: Option<String>,
    pub rating_avg: Option<f64>,
    pub rating_count: u32,
}

impl From<RecommendedRecipe> for RecommendationView {
    fn from(row: RecommendedRecipe) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            missing_count: row.missing_count,
            total_ingredients: row.total_ingredients,
            available_ingredients: row.available_ingredients,
            total_time: row.total_time,
            servings: row.servings,
            primary_image: row.primary_image,
            rating_avg: row.rating_avg,
            rating_count: row.rating_count,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}
