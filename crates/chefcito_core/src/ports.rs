//! crates/chefcito_core/src/ports.rs
//!
//! Defines the service contracts (traits) the assistant core depends on.
//! These traits form the boundary of the hexagonal architecture, keeping the core
//! independent of the catalog's storage and of the language-model vendor.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Ingredient, Recipe, RecipeLookup};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Read-only access to the recipe catalog. Nothing in the core ever writes.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    // --- Grounding snapshots ---
    /// Recipe names ordered by name, at most `limit` of them.
    async fn recipe_names(&self, limit: usize) -> PortResult<Vec<String>>;

    /// Ingredient names ordered by name, at most `limit` of them.
    async fn ingredient_names(&self, limit: usize) -> PortResult<Vec<String>>;

    /// Category friendly names ordered by friendly name, at most `limit` of them.
    async fn category_names(&self, limit: usize) -> PortResult<Vec<String>>;

    // --- User facts ---
    async fn dietary_restriction_ids_for_user(&self, user_id: Uuid) -> PortResult<Vec<Uuid>>;

    // --- Recipes ---
    /// Recipes belonging to any category matching any token (id, name or friendly
    /// name, case-insensitive). Blank tokens are ignored; no tokens means every recipe.
    /// Each recipe comes with its ingredient lines, images and rating aggregate.
    async fn recipes_in_categories(&self, category_tokens: &[String]) -> PortResult<Vec<Recipe>>;

    /// Recipes with the given ids, in no particular order. Unknown ids are skipped.
    async fn recipes_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<Recipe>>;

    /// A single recipe, or `None` when nothing matches.
    async fn find_recipe(&self, lookup: &RecipeLookup) -> PortResult<Option<Recipe>>;

    // --- Ingredients ---
    /// Ingredients whose name or description contains `query` (case-insensitive),
    /// ordered by name, at most `limit`. A blank query matches everything.
    async fn search_ingredients(&self, query: &str, limit: usize) -> PortResult<Vec<Ingredient>>;
}

/// The opaque large-language-model backend.
#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// Submits a fully composed prompt and returns the raw text of the reply.
    async fn complete(&self, prompt: &str) -> PortResult<String>;
}
