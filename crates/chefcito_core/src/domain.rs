//! crates/chefcito_core/src/domain.rs
//!
//! Defines the pure, core data structures of the recipe catalog and the conversation.
//! These structs are independent of any database or wire format.

use std::collections::HashSet;
use uuid::Uuid;

/// Nutrition facts. Per serving on recipes, per 100g on ingredients.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub sugar: f64,
}

impl Nutrition {
    /// Returns the value of a single macro field.
    pub fn value(&self, key: Macro) -> f64 {
        match key {
            Macro::Calories => self.calories,
            Macro::Protein => self.protein,
            Macro::Carbs => self.carbs,
            Macro::Fat => self.fat,
            Macro::Sugar => self.sugar,
        }
    }
}

/// The nutrition fields a caller may rank by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Macro {
    Calories,
    Protein,
    Carbs,
    Fat,
    Sugar,
}

impl Macro {
    pub const ALL: [Macro; 5] = [
        Macro::Calories,
        Macro::Protein,
        Macro::Carbs,
        Macro::Fat,
        Macro::Sugar,
    ];

    /// Parses a macro key, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|m| m.as_str() == key)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Macro::Calories => "calories",
            Macro::Protein => "protein",
            Macro::Carbs => "carbs",
            Macro::Fat => "fat",
            Macro::Sugar => "sugar",
        }
    }
}

/// A recipe category such as "Desayunos" or "Vegan dinners".
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub friendly_name: String,
}

impl Category {
    /// A filter token matches by exact id, or by name / friendly name ignoring case.
    pub fn matches_token(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return false;
        }
        let token = token.to_lowercase();
        self.id.to_string() == token
            || self.name.to_lowercase() == token
            || self.friendly_name.to_lowercase() == token
    }
}

/// A dietary restriction (e.g. "Lactose") users declare and ingredients are tagged with.
#[derive(Debug, Clone, PartialEq)]
pub struct DietaryRestriction {
    pub id: Uuid,
    pub name: String,
}

/// A single ingredient of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub nutrition_per_100g: Nutrition,
    pub dietary_restriction_ids: Vec<Uuid>,
}

/// One line of a recipe's ingredient list.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeIngredient {
    pub ingredient_id: Uuid,
    pub name: String,
    pub amount: f64,
    pub unit: String,
    pub dietary_restriction_ids: Vec<Uuid>,
}

impl RecipeIngredient {
    /// An ingredient token matches by exact id or by name ignoring case.
    pub fn matches_token(&self, token: &str) -> bool {
        let token = token.trim();
        !token.is_empty()
            && (self.ingredient_id.to_string() == token.to_lowercase()
                || self.name.to_lowercase() == token.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeImage {
    pub url: String,
    pub alt_text: String,
    pub order: u32,
}

/// Aggregate of the reviews left on a recipe. `average` is `None` without reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: u32,
}

impl RatingSummary {
    pub fn from_ratings(ratings: &[u8]) -> Self {
        if ratings.is_empty() {
            return Self::default();
        }
        let sum: u32 = ratings.iter().map(|r| u32::from(*r)).sum();
        Self {
            average: Some(f64::from(sum) / ratings.len() as f64),
            count: ratings.len() as u32,
        }
    }
}

/// A recipe as read from the catalog. Immutable for the duration of an agent turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub instructions: String,
    pub categories: Vec<Category>,
    pub servings: u32,
    pub prep_time: u32,
    pub cook_time: u32,
    pub nutrition: Nutrition,
    pub ingredients: Vec<RecipeIngredient>,
    pub images: Vec<RecipeImage>,
    pub main_image_url: Option<String>,
    pub rating: RatingSummary,
}

impl Recipe {
    /// Preparation plus cooking time, in minutes.
    pub fn total_time(&self) -> u32 {
        self.prep_time.saturating_add(self.cook_time)
    }

    /// The main image if one is set, otherwise the lowest-ordered image.
    pub fn primary_image(&self) -> Option<String> {
        if let Some(url) = self.main_image_url.as_ref().filter(|u| !u.trim().is_empty()) {
            return Some(url.clone());
        }
        self.images
            .iter()
            .min_by_key(|img| img.order)
            .map(|img| img.url.clone())
    }

    /// The set of distinct ingredients this recipe requires.
    pub fn distinct_ingredient_ids(&self) -> HashSet<Uuid> {
        self.ingredients.iter().map(|i| i.ingredient_id).collect()
    }

    pub fn uses_ingredient(&self, token: &str) -> bool {
        self.ingredients.iter().any(|i| i.matches_token(token))
    }

    pub fn in_any_category(&self, tokens: &[String]) -> bool {
        self.categories
            .iter()
            .any(|c| tokens.iter().any(|t| c.matches_token(t)))
    }

    /// True when any ingredient carries one of the given restriction tags.
    pub fn violates_restrictions(&self, restriction_ids: &[Uuid]) -> bool {
        !restriction_ids.is_empty()
            && self.ingredients.iter().any(|i| {
                i.dietary_restriction_ids
                    .iter()
                    .any(|id| restriction_ids.contains(id))
            })
    }
}

/// How a single recipe is looked up, in priority order id > slug > name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeLookup {
    Id(Uuid),
    Slug(String),
    Name(String),
}

/// The caller of an agent turn. Authentication itself happens outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrentUser {
    #[default]
    Anonymous,
    Authenticated { user_id: Uuid },
}

impl CurrentUser {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            CurrentUser::Anonymous => None,
            CurrentUser::Authenticated { user_id } => Some(*user_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    Tool,
}

impl ChatRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            "tool" => Some(ChatRole::Tool),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        }
    }
}

/// A previous turn of the conversation, persisted by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub role: ChatRole,
    pub content: String,
    /// Structured metadata such as used tools and referenced recipes.
    pub metadata: Option<serde_json::Value>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            metadata: None,
        }
    }
}

/// Lowercase, dash-separated slug of a recipe name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
