//! crates/chefcito_core/src/recommend.rs
//!
//! Ranks recipes by how few ingredients the caller is missing.
//!
//! Recipes that use an ingredient tagged with a forbidden dietary restriction are
//! dropped before ranking; they never appear, whatever their score. Survivors are
//! ordered by ascending `missing_count`, then by the requested macro (descending),
//! rating average (descending, unrated last), name and id.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Macro, Recipe};
use crate::ports::{CatalogReader, PortError};

#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("at least one ingredient is required")]
    NoIngredients,
    #[error(transparent)]
    Port(#[from] PortError),
}

/// What the caller has at hand and how results should be narrowed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationQuery {
    /// Available ingredients, by id or name.
    pub ingredients: Vec<String>,
    /// Category ids or names; a recipe in any of them qualifies.
    pub categories: Vec<String>,
    pub macro_key: Option<Macro>,
    /// Recipes using ingredients tagged with any of these are excluded.
    pub dietary_restriction_ids: Vec<Uuid>,
}

/// A ranked recommendation row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedRecipe {
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
    #[serde(skip)]
    macro_value: f64,
}

#[derive(Clone)]
pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogReader>,
    limit: usize,
}

impl RecommendationEngine {
    pub fn new(catalog: Arc<dyn CatalogReader>, limit: usize) -> Self {
        Self { catalog, limit }
    }

    /// Rejects an empty ingredient list before touching the catalog.
    pub async fn recommend(
        &self,
        query: &RecommendationQuery,
    ) -> Result<Vec<RecommendedRecipe>, RecommendError> {
        let ingredients = non_blank(&query.ingredients);
        if ingredients.is_empty() {
            return Err(RecommendError::NoIngredients);
        }
        let categories = non_blank(&query.categories);

        let candidates = self.catalog.recipes_in_categories(&categories).await?;
        debug!(
            candidates = candidates.len(),
            ingredients = ingredients.len(),
            "ranking recommendation candidates"
        );

        Ok(rank_recipes(
            candidates,
            &ingredients,
            query.macro_key,
            &query.dietary_restriction_ids,
            self.limit,
        ))
    }
}

/// The pure ranking step, over recipes already narrowed by category.
pub fn rank_recipes(
    candidates: Vec<Recipe>,
    ingredient_tokens: &[String],
    macro_key: Option<Macro>,
    forbidden_restrictions: &[Uuid],
    limit: usize,
) -> Vec<RecommendedRecipe> {
    let mut rows: Vec<RecommendedRecipe> = candidates
        .into_iter()
        .filter(|recipe| !recipe.violates_restrictions(forbidden_restrictions))
        .map(|recipe| score(&recipe, ingredient_tokens, macro_key))
        .collect();

    rows.sort_by(|a, b| {
        a.missing_count
            .cmp(&b.missing_count)
            .then_with(|| match macro_key {
                Some(_) => desc_f64(a.macro_value, b.macro_value),
                None => Ordering::Equal,
            })
            .then_with(|| rating_desc(a.rating_avg, b.rating_avg))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    rows.truncate(limit);
    rows
}

fn score(
    recipe: &Recipe,
    ingredient_tokens: &[String],
    macro_key: Option<Macro>,
) -> RecommendedRecipe {
    let required = recipe.distinct_ingredient_ids();
    let available: HashSet<Uuid> = recipe
        .ingredients
        .iter()
        .filter(|line| ingredient_tokens.iter().any(|t| line.matches_token(t)))
        .map(|line| line.ingredient_id)
        .collect();

    RecommendedRecipe {
        id: recipe.id,
        slug: recipe.slug.clone(),
        name: recipe.name.clone(),
        missing_count: required.len().saturating_sub(available.len()),
        total_ingredients: required.len(),
        available_ingredients: available.len(),
        total_time: recipe.total_time(),
        servings: recipe.servings,
        primary_image: recipe.primary_image(),
        rating_avg: recipe.rating.average,
        rating_count: recipe.rating.count,
        macro_value: macro_key.map(|m| recipe.nutrition.value(m)).unwrap_or_default(),
    }
}

/// Descending order for floats; NaN compares equal.
pub(crate) fn desc_f64(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Descending rating average with unrated recipes after every rated one.
pub(crate) fn rating_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => desc_f64(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub(crate) fn non_blank(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
