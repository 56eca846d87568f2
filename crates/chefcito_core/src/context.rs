//! crates/chefcito_core/src/context.rs
//!
//! Builds the grounding snapshot handed to the model: the only recipe, ingredient
//! and category names it is allowed to mention, plus facts about the caller.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::CurrentUser;
use crate::ports::{CatalogReader, PortResult};
use crate::settings::ContextLimits;

/// Product features the assistant can explain.
pub const FEATURES: [&str; 5] = [
    "Search and filter recipes by category, total time, macros and ingredients.",
    "Recommendations from the ingredients you have at home (quick recipe).",
    "Ratings (1-5) and comments on every recipe.",
    "Personal collections and favourites.",
    "Sign-up and login, including Google Sign-In.",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserFacts {
    pub is_authenticated: bool,
    pub dietary_restriction_ids: Vec<Uuid>,
}

/// The bounded snapshot of permitted entity names for one agent turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundingContext {
    pub date_iso: String,
    pub allowed_recipes: Vec<String>,
    pub allowed_ingredients: Vec<String>,
    pub allowed_categories: Vec<String>,
    pub user: UserFacts,
    pub features: Vec<&'static str>,
}

impl GroundingContext {
    /// Returns the catalog spelling of an ingredient name if it is in the snapshot.
    pub fn canonical_ingredient(&self, name: &str) -> Option<&str> {
        let wanted = name.trim().to_lowercase();
        self.allowed_ingredients
            .iter()
            .find(|allowed| allowed.to_lowercase() == wanted)
            .map(String::as_str)
    }
}

/// Reads the grounding snapshot from the catalog. Catalog failures are propagated.
pub async fn build_grounding_context(
    catalog: &dyn CatalogReader,
    user: &CurrentUser,
    limits: &ContextLimits,
    today: NaiveDate,
) -> PortResult<GroundingContext> {
    let allowed_recipes = capped_sorted(
        catalog.recipe_names(limits.max_recipes).await?,
        limits.max_recipes,
    );
    let allowed_ingredients = capped_sorted(
        catalog.ingredient_names(limits.max_ingredients).await?,
        limits.max_ingredients,
    );
    let allowed_categories = capped_sorted(
        catalog.category_names(limits.max_categories).await?,
        limits.max_categories,
    );

    let user = match user.user_id() {
        Some(user_id) => UserFacts {
            is_authenticated: true,
            dietary_restriction_ids: catalog.dietary_restriction_ids_for_user(user_id).await?,
        },
        None => UserFacts::default(),
    };

    Ok(GroundingContext {
        date_iso: today.format("%Y-%m-%d").to_string(),
        allowed_recipes,
        allowed_ingredients,
        allowed_categories,
        user,
        features: FEATURES.to_vec(),
    })
}

fn capped_sorted(mut names: Vec<String>, limit: usize) -> Vec<String> {
    names.sort();
    names.truncate(limit);
    names
}
