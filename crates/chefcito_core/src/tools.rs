//! crates/chefcito_core/src/tools.rs
//!
//! The four deterministic catalog queries the model may request, and the dispatch
//! table that runs them. Arguments come from the model, not from a trusted caller,
//! so every field is normalized leniently: missing or mistyped fields mean "no filter".

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::GroundingContext;
use crate::contract::TOOL_REQUEST_SCHEMA;
use crate::domain::{Ingredient, Macro, Recipe, RecipeLookup};
use crate::ports::{CatalogReader, PortError, PortResult};
use crate::recommend::{
    desc_f64, non_blank, rating_desc, RecommendError, RecommendationEngine, RecommendationQuery,
    RecommendedRecipe,
};
use crate::settings::ToolLimits;

//=========================================================================================
// Tool names, errors and the result envelope
//=========================================================================================

/// The closed set of tools the model can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    FindRecipes,
    GetRecipeDetail,
    FindIngredients,
    Recommend,
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "find_recipes" => Ok(ToolName::FindRecipes),
            "get_recipe_detail" => Ok(ToolName::GetRecipeDetail),
            "find_ingredients" => Ok(ToolName::FindIngredients),
            "recommend" => Ok(ToolName::Recommend),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("recommend failed: {0}")]
    Recommend(#[from] RecommendError),
    #[error("catalog lookup failed: {0}")]
    Port(#[from] PortError),
    #[error("could not encode tool output: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The envelope fed back to the model after every dispatch.
/// `data` is present exactly when `ok` is true, `error` exactly when it is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub status: &'static str,
    pub tool: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ToolResult {
    pub fn success(tool: &str, data: Value) -> Self {
        Self {
            status: "tool_result",
            tool: tool.to_string(),
            ok: true,
            data: Some(data),
            error: None,
            hint: None,
        }
    }

    pub fn failure(tool: &str, error: &ToolError) -> Self {
        Self {
            status: "tool_result",
            tool: tool.to_string(),
            ok: false,
            data: None,
            error: Some(error.to_string()),
            hint: Some(format!("Follow the schema {TOOL_REQUEST_SCHEMA}")),
        }
    }
}

/// One entry of the per-turn tool log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolUsage {
    pub tool: String,
    pub args: Value,
}

//=========================================================================================
// Output views
//=========================================================================================

/// Compact recipe row returned by searches and used to hydrate final answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeCard {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub total_time: u32,
    pub servings: u32,
    pub primary_image: Option<String>,
    pub rating_avg: Option<f64>,
    pub rating_count: u32,
}

impl From<&Recipe> for RecipeCard {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            slug: recipe.slug.clone(),
            name: recipe.name.clone(),
            total_time: recipe.total_time(),
            servings: recipe.servings,
            primary_image: recipe.primary_image(),
            rating_avg: recipe.rating.average,
            rating_count: recipe.rating.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientLine {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageView {
    pub url: String,
    pub alt_text: String,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDetail {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub servings: u32,
    pub prep_time: u32,
    pub cook_time: u32,
    pub total_time: u32,
    pub calories_per_serving: f64,
    pub protein_per_serving: f64,
    pub carbs_per_serving: f64,
    pub fat_per_serving: f64,
    pub sugar_per_serving: f64,
    pub categories: Vec<String>,
    pub ingredients: Vec<IngredientLine>,
    pub images: Vec<ImageView>,
    pub primary_image: Option<String>,
}

impl From<&Recipe> for RecipeDetail {
    fn from(recipe: &Recipe) -> Self {
        let mut images: Vec<ImageView> = recipe
            .images
            .iter()
            .map(|img| ImageView {
                url: img.url.clone(),
                alt_text: img.alt_text.clone(),
                order: img.order,
            })
            .collect();
        images.sort_by_key(|img| img.order);

        Self {
            id: recipe.id,
            slug: recipe.slug.clone(),
            name: recipe.name.clone(),
            description: recipe.description.clone(),
            instructions: recipe.instructions.clone(),
            servings: recipe.servings,
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            total_time: recipe.total_time(),
            calories_per_serving: recipe.nutrition.calories,
            protein_per_serving: recipe.nutrition.protein,
            carbs_per_serving: recipe.nutrition.carbs,
            fat_per_serving: recipe.nutrition.fat,
            sugar_per_serving: recipe.nutrition.sugar,
            categories: recipe
                .categories
                .iter()
                .map(|c| c.friendly_name.clone())
                .collect(),
            ingredients: recipe
                .ingredients
                .iter()
                .map(|line| IngredientLine {
                    name: line.name.clone(),
                    amount: line.amount,
                    unit: line.unit.clone(),
                })
                .collect(),
            images,
            primary_image: recipe.primary_image(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientView {
    pub id: Uuid,
    pub name: String,
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,
    pub carbs_per_100g: f64,
    pub fat_per_100g: f64,
    pub sugar_per_100g: f64,
}

impl From<&Ingredient> for IngredientView {
    fn from(ingredient: &Ingredient) -> Self {
        let n = ingredient.nutrition_per_100g;
        Self {
            id: ingredient.id,
            name: ingredient.name.clone(),
            calories_per_100g: n.calories,
            protein_per_100g: n.protein,
            carbs_per_100g: n.carbs,
            fat_per_100g: n.fat,
            sugar_per_100g: n.sugar,
        }
    }
}

//=========================================================================================
// Normalized arguments
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindRecipesArgs {
    pub query: String,
    pub categories: Vec<String>,
    pub include_ingredients: Vec<String>,
    pub exclude_ingredients: Vec<String>,
    pub macro_key: Option<Macro>,
    pub time_max: Option<u32>,
}

impl FindRecipesArgs {
    pub fn from_args(args: &Value) -> Self {
        Self {
            query: string_arg(args, "query"),
            categories: string_list_arg(args, "categories"),
            include_ingredients: string_list_arg(args, "include_ingredients"),
            exclude_ingredients: string_list_arg(args, "exclude_ingredients"),
            macro_key: Macro::parse(&string_arg(args, "macro")),
            time_max: args
                .get("time_max")
                .and_then(Value::as_f64)
                .filter(|t| t.is_finite() && *t >= 0.0)
                .map(|t| t.min(f64::from(u32::MAX)) as u32),
        }
    }
}

/// Lookup keys of `get_recipe_detail`; the first non-blank one in id > slug > name wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeDetailArgs {
    pub id: String,
    pub slug: String,
    pub name: String,
}

impl RecipeDetailArgs {
    pub fn from_args(args: &Value) -> Self {
        Self {
            id: string_arg(args, "id"),
            slug: string_arg(args, "slug"),
            name: string_arg(args, "name"),
        }
    }

    /// `None` when no key is given; an id that is not a UUID yields `Err`, which can never match.
    fn lookup(&self) -> Option<Result<RecipeLookup, ()>> {
        if !self.id.is_empty() {
            return Some(Uuid::parse_str(&self.id).map(RecipeLookup::Id).map_err(|_| ()));
        }
        if !self.slug.is_empty() {
            return Some(Ok(RecipeLookup::Slug(self.slug.clone())));
        }
        if !self.name.is_empty() {
            return Some(Ok(RecipeLookup::Name(self.name.clone())));
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendArgs {
    pub ingredients: Vec<String>,
    pub categories: Vec<String>,
    pub macro_key: Option<Macro>,
    pub dietary_restriction_ids: Vec<Uuid>,
}

impl RecommendArgs {
    pub fn from_args(args: &Value) -> Self {
        Self {
            ingredients: string_list_arg(args, "ingredients"),
            categories: string_list_arg(args, "categories"),
            macro_key: Macro::parse(&string_arg(args, "macro")),
            dietary_restriction_ids: string_list_arg(args, "dietary_restriction_ids")
                .iter()
                .filter_map(|raw| Uuid::parse_str(raw).ok())
                .collect(),
        }
    }
}

/// A trimmed string field, or empty when missing or not a string.
fn string_arg(args: &Value, key: &str) -> String {
    args.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// An array of strings (non-strings and blanks skipped) or a single string.
fn string_list_arg(args: &Value, key: &str) -> Vec<String> {
    match args.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => {
            vec![single.trim().to_string()]
        }
        _ => Vec::new(),
    }
}

//=========================================================================================
// The tool box
//=========================================================================================

/// Runs tool functions against the catalog. Every function is a pure read.
#[derive(Clone)]
pub struct ToolBox {
    catalog: Arc<dyn CatalogReader>,
    recommender: RecommendationEngine,
    limits: ToolLimits,
}

impl ToolBox {
    pub fn new(catalog: Arc<dyn CatalogReader>, limits: ToolLimits) -> Self {
        let recommender = RecommendationEngine::new(catalog.clone(), limits.recommendations);
        Self {
            catalog,
            recommender,
            limits,
        }
    }

    /// Runs a tool by its untrusted name and wraps the outcome in an envelope.
    /// Never fails: errors become `ok: false` envelopes.
    pub async fn dispatch(
        &self,
        tool: &str,
        args: &Value,
        context: &GroundingContext,
    ) -> ToolResult {
        match self.run(tool, args, context).await {
            Ok(data) => {
                info!(tool, "tool call succeeded");
                ToolResult::success(tool, data)
            }
            Err(e) => {
                warn!(tool, error = %e, "tool call failed");
                ToolResult::failure(tool, &e)
            }
        }
    }

    async fn run(
        &self,
        tool: &str,
        args: &Value,
        context: &GroundingContext,
    ) -> Result<Value, ToolError> {
        let data = match tool.parse::<ToolName>()? {
            ToolName::FindRecipes => {
                serde_json::to_value(self.find_recipes(&FindRecipesArgs::from_args(args)).await?)?
            }
            ToolName::GetRecipeDetail => serde_json::to_value(
                self.get_recipe_detail(&RecipeDetailArgs::from_args(args))
                    .await?,
            )?,
            ToolName::FindIngredients => {
                serde_json::to_value(self.find_ingredients(&string_arg(args, "query")).await?)?
            }
            ToolName::Recommend => serde_json::to_value(
                self.recommend(
                    &RecommendArgs::from_args(args),
                    &context.user.dietary_restriction_ids,
                )
                .await?,
            )?,
        };
        Ok(data)
    }

    pub async fn find_recipes(&self, args: &FindRecipesArgs) -> PortResult<Vec<RecipeCard>> {
        let categories = non_blank(&args.categories);
        let query = args.query.to_lowercase();
        let include: HashSet<String> = args
            .include_ingredients
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        let exclude = non_blank(&args.exclude_ingredients);

        let mut matches: Vec<Recipe> = self
            .catalog
            .recipes_in_categories(&categories)
            .await?
            .into_iter()
            .filter(|r| {
                query.is_empty()
                    || r.name.to_lowercase().contains(&query)
                    || r.description.to_lowercase().contains(&query)
            })
            .filter(|r| include.iter().filter(|t| r.uses_ingredient(t)).count() >= include.len())
            .filter(|r| !exclude.iter().any(|t| r.uses_ingredient(t)))
            .filter(|r| args.time_max.map_or(true, |max| r.total_time() <= max))
            .collect();

        matches.sort_by(|a, b| {
            args.macro_key
                .map(|m| desc_f64(a.nutrition.value(m), b.nutrition.value(m)))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| rating_desc(a.rating.average, b.rating.average))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(self.limits.find_recipes);

        Ok(matches.iter().map(RecipeCard::from).collect())
    }

    /// `None` when nothing matches; a miss is not an error.
    pub async fn get_recipe_detail(
        &self,
        args: &RecipeDetailArgs,
    ) -> PortResult<Option<RecipeDetail>> {
        let lookup = match args.lookup() {
            Some(Ok(lookup)) => lookup,
            Some(Err(())) | None => return Ok(None),
        };
        let recipe = self.catalog.find_recipe(&lookup).await?;
        Ok(recipe.as_ref().map(RecipeDetail::from))
    }

    pub async fn find_ingredients(&self, query: &str) -> PortResult<Vec<IngredientView>> {
        let found = self
            .catalog
            .search_ingredients(query.trim(), self.limits.find_ingredients)
            .await?;
        Ok(found.iter().map(IngredientView::from).collect())
    }

    /// The caller's own restrictions always apply; the model can only add more.
    pub async fn recommend(
        &self,
        args: &RecommendArgs,
        user_restrictions: &[Uuid],
    ) -> Result<Vec<RecommendedRecipe>, RecommendError> {
        let mut forbidden = user_restrictions.to_vec();
        for id in &args.dietary_restriction_ids {
            if !forbidden.contains(id) {
                forbidden.push(*id);
            }
        }

        let query = RecommendationQuery {
            ingredients: args.ingredients.clone(),
            categories: args.categories.clone(),
            macro_key: args.macro_key,
            dietary_restriction_ids: forbidden,
        };
        self.recommender.recommend(&query).await
    }
}

/// Recipe cards for the ids of a final answer, in the caller's order.
/// Blank, malformed and unknown ids are skipped.
pub async fn summarize_recipes_by_ids(
    catalog: &dyn CatalogReader,
    ids: &[String],
) -> PortResult<Vec<RecipeCard>> {
    let mut wanted: Vec<Uuid> = Vec::new();
    for id in ids.iter().filter_map(|raw| Uuid::parse_str(raw.trim()).ok()) {
        if !wanted.contains(&id) {
            wanted.push(id);
        }
    }
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let recipes = catalog.recipes_by_ids(&wanted).await?;
    let mut cards: Vec<RecipeCard> = recipes.iter().map(RecipeCard::from).collect();
    cards.sort_by_key(|card| wanted.iter().position(|id| *id == card.id).unwrap_or(usize::MAX));
    Ok(cards)
}
