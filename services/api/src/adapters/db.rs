//! services/api/src/adapters/db.rs
//!
//! This module contains the catalog adapter, which is the concrete implementation
//! of the `CatalogReader` port from the `core` crate. It reads the recipe catalog
//! from PostgreSQL using `sqlx`. Nothing here writes.

use std::collections::HashMap;

use async_trait::async_trait;
use chefcito_core::domain::{
    Category, Ingredient, Nutrition, RatingSummary, Recipe, RecipeImage, RecipeIngredient,
    RecipeLookup,
};
use chefcito_core::ports::{CatalogReader, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A catalog adapter that implements the `CatalogReader` port.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Creates a new `PgCatalog`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

/// Ingredient lines of a batch of recipes, in the order each recipe lists them.
const RECIPE_INGREDIENTS_SELECT: &str = r#"
SELECT ri.recipe_id, ri.ingredient_id, i.name, ri.amount::float8 AS amount, ri.unit,
       ARRAY(SELECT idr.dietary_restriction_id FROM ingredient_dietary_restrictions idr
             WHERE idr.ingredient_id = i.id) AS dietary_restriction_ids
FROM recipe_ingredients ri
JOIN ingredients i ON i.id = ri.ingredient_id
WHERE ri.recipe_id = ANY($1)
ORDER BY ri.recipe_id, ri.position
"#;

const RECIPE_SELECT: &str = r#"
SELECT r.id, r.name, r.slug, r.description, r.instructions,
       r.servings, r.prep_time, r.cook_time,
       r.calories_per_serving::float8 AS calories,
       r.protein_per_serving::float8 AS protein,
       r.carbs_per_serving::float8 AS carbs,
       r.fat_per_serving::float8 AS fat,
       r.sugar_per_serving::float8 AS sugar,
       r.main_image_url,
       (SELECT AVG(v.rating)::float8 FROM reviews v WHERE v.recipe_id = r.id) AS rating_avg,
       (SELECT COUNT(*) FROM reviews v WHERE v.recipe_id = r.id) AS rating_count
FROM recipes r
"#;

#[derive(FromRow)]
struct RecipeRecord {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    instructions: String,
    servings: i32,
    prep_time: i32,
    cook_time: i32,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    sugar: f64,
    main_image_url: Option<String>,
    rating_avg: Option<f64>,
    rating_count: i64,
}
impl RecipeRecord {
    fn to_domain(self, parts: &mut RecipeParts) -> Recipe {
        Recipe {
            id: self.id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            instructions: self.instructions,
            categories: parts.categories.remove(&self.id).unwrap_or_default(),
            servings: to_u32(self.servings),
            prep_time: to_u32(self.prep_time),
            cook_time: to_u32(self.cook_time),
            nutrition: Nutrition {
                calories: self.calories,
                protein: self.protein,
                carbs: self.carbs,
                fat: self.fat,
                sugar: self.sugar,
            },
            ingredients: parts.ingredients.remove(&self.id).unwrap_or_default(),
            images: parts.images.remove(&self.id).unwrap_or_default(),
            main_image_url: self.main_image_url,
            rating: RatingSummary {
                average: self.rating_avg,
                count: u32::try_from(self.rating_count).unwrap_or(u32::MAX),
            },
        }
    }
}

#[derive(FromRow)]
struct RecipeCategoryRecord {
    recipe_id: Uuid,
    id: Uuid,
    name: String,
    friendly_name: String,
}
impl RecipeCategoryRecord {
    fn to_domain(self) -> Category {
        Category {
            id: self.id,
            name: self.name,
            friendly_name: self.friendly_name,
        }
    }
}

#[derive(FromRow)]
struct RecipeIngredientRecord {
    recipe_id: Uuid,
    ingredient_id: Uuid,
    name: String,
    amount: f64,
    unit: String,
    dietary_restriction_ids: Vec<Uuid>,
}
impl RecipeIngredientRecord {
    fn to_domain(self) -> RecipeIngredient {
        RecipeIngredient {
            ingredient_id: self.ingredient_id,
            name: self.name,
            amount: self.amount,
            unit: self.unit,
            dietary_restriction_ids: self.dietary_restriction_ids,
        }
    }
}

#[derive(FromRow)]
struct RecipeImageRecord {
    recipe_id: Uuid,
    url: String,
    alt_text: String,
    sort_order: i32,
}
impl RecipeImageRecord {
    fn to_domain(self) -> RecipeImage {
        RecipeImage {
            url: self.url,
            alt_text: self.alt_text,
            order: to_u32(self.sort_order),
        }
    }
}

#[derive(FromRow)]
struct IngredientRecord {
    id: Uuid,
    name: String,
    description: String,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    sugar: f64,
    dietary_restriction_ids: Vec<Uuid>,
}
impl IngredientRecord {
    fn to_domain(self) -> Ingredient {
        Ingredient {
            id: self.id,
            name: self.name,
            description: self.description,
            nutrition_per_100g: Nutrition {
                calories: self.calories,
                protein: self.protein,
                carbs: self.carbs,
                fat: self.fat,
                sugar: self.sugar,
            },
            dietary_restriction_ids: self.dietary_restriction_ids,
        }
    }
}

/// Child rows of a batch of recipes, grouped by recipe id.
#[derive(Default)]
struct RecipeParts {
    categories: HashMap<Uuid, Vec<Category>>,
    ingredients: HashMap<Uuid, Vec<RecipeIngredient>>,
    images: HashMap<Uuid, Vec<RecipeImage>>,
}

//=========================================================================================
// Hydration
//=========================================================================================

impl PgCatalog {
    /// Loads categories, ingredient lines and images for the given recipes in three queries.
    async fn load_parts(&self, recipe_ids: &[Uuid]) -> PortResult<RecipeParts> {
        let mut parts = RecipeParts::default();
        if recipe_ids.is_empty() {
            return Ok(parts);
        }

        let categories = sqlx::query_as::<_, RecipeCategoryRecord>(
            "SELECT rc.recipe_id, c.id, c.name, c.friendly_name \
             FROM recipe_categories rc JOIN categories c ON c.id = rc.category_id \
             WHERE rc.recipe_id = ANY($1) ORDER BY c.friendly_name",
        )
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        for record in categories {
            parts
                .categories
                .entry(record.recipe_id)
                .or_default()
                .push(record.to_domain());
        }

        let lines = sqlx::query_as::<_, RecipeIngredientRecord>(RECIPE_INGREDIENTS_SELECT)
            .bind(recipe_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        for record in lines {
            parts
                .ingredients
                .entry(record.recipe_id)
                .or_default()
                .push(record.to_domain());
        }

        let images = sqlx::query_as::<_, RecipeImageRecord>(
            "SELECT recipe_id, url, alt_text, sort_order FROM recipe_images \
             WHERE recipe_id = ANY($1) ORDER BY sort_order",
        )
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        for record in images {
            parts
                .images
                .entry(record.recipe_id)
                .or_default()
                .push(record.to_domain());
        }

        Ok(parts)
    }

    async fn hydrate(&self, records: Vec<RecipeRecord>) -> PortResult<Vec<Recipe>> {
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let mut parts = self.load_parts(&ids).await?;
        Ok(records
            .into_iter()
            .map(|record| record.to_domain(&mut parts))
            .collect())
    }

    async fn names(&self, sql: &str, limit: usize) -> PortResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)
    }
}

//=========================================================================================
// `CatalogReader` Trait Implementation
//=========================================================================================

#[async_trait]
impl CatalogReader for PgCatalog {
    async fn recipe_names(&self, limit: usize) -> PortResult<Vec<String>> {
        self.names("SELECT name FROM recipes ORDER BY name LIMIT $1", limit)
            .await
    }

    async fn ingredient_names(&self, limit: usize) -> PortResult<Vec<String>> {
        self.names("SELECT name FROM ingredients ORDER BY name LIMIT $1", limit)
            .await
    }

    async fn category_names(&self, limit: usize) -> PortResult<Vec<String>> {
        self.names(
            "SELECT friendly_name FROM categories ORDER BY friendly_name LIMIT $1",
            limit,
        )
        .await
    }

    async fn dietary_restriction_ids_for_user(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT dietary_restriction_id FROM user_dietary_restrictions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn recipes_in_categories(&self, category_tokens: &[String]) -> PortResult<Vec<Recipe>> {
        let tokens: Vec<String> = category_tokens
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let sql = format!(
            "{RECIPE_SELECT} WHERE cardinality($1::text[]) = 0 OR EXISTS (\
               SELECT 1 FROM recipe_categories rc JOIN categories c ON c.id = rc.category_id \
               WHERE rc.recipe_id = r.id AND (c.id::text = ANY($1) \
                 OR lower(c.name) = ANY($1) OR lower(c.friendly_name) = ANY($1))) \
             ORDER BY r.name"
        );
        let records = sqlx::query_as::<_, RecipeRecord>(&sql)
            .bind(&tokens)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        debug!(tokens = tokens.len(), recipes = records.len(), "loaded recipes by category");

        self.hydrate(records).await
    }

    async fn recipes_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<Recipe>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("{RECIPE_SELECT} WHERE r.id = ANY($1)");
        let records = sqlx::query_as::<_, RecipeRecord>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        self.hydrate(records).await
    }

    async fn find_recipe(&self, lookup: &RecipeLookup) -> PortResult<Option<Recipe>> {
        let query = match lookup {
            RecipeLookup::Id(id) => {
                let sql = format!("{RECIPE_SELECT} WHERE r.id = $1 LIMIT 1");
                sqlx::query_as::<_, RecipeRecord>(&sql)
                    .bind(*id)
                    .fetch_optional(&self.pool)
                    .await
            }
            RecipeLookup::Slug(slug) => {
                let sql = format!("{RECIPE_SELECT} WHERE lower(r.slug) = lower($1) LIMIT 1");
                sqlx::query_as::<_, RecipeRecord>(&sql)
                    .bind(slug.trim())
                    .fetch_optional(&self.pool)
                    .await
            }
            RecipeLookup::Name(name) => {
                let sql = format!(
                    "{RECIPE_SELECT} WHERE lower(r.name) = lower($1) ORDER BY r.name LIMIT 1"
                );
                sqlx::query_as::<_, RecipeRecord>(&sql)
                    .bind(name.trim())
                    .fetch_optional(&self.pool)
                    .await
            }
        };

        match query.map_err(unexpected)? {
            Some(record) => Ok(self.hydrate(vec![record]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn search_ingredients(&self, query: &str, limit: usize) -> PortResult<Vec<Ingredient>> {
        let records = sqlx::query_as::<_, IngredientRecord>(
            "SELECT i.id, i.name, i.description, \
               i.calories_per_100g::float8 AS calories, i.protein_per_100g::float8 AS protein, \
               i.carbs_per_100g::float8 AS carbs, i.fat_per_100g::float8 AS fat, \
               i.sugar_per_100g::float8 AS sugar, \
               ARRAY(SELECT idr.dietary_restriction_id FROM ingredient_dietary_restrictions idr \
                     WHERE idr.ingredient_id = i.id) AS dietary_restriction_ids \
             FROM ingredients i \
             WHERE $1 = '' OR strpos(lower(i.name), lower($1)) > 0 \
               OR strpos(lower(i.description), lower($1)) > 0 \
             ORDER BY i.name LIMIT $2",
        )
        .bind(query.trim())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(IngredientRecord::to_domain).collect())
    }
}
