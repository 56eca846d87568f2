//! crates/chefcito_core/src/memory.rs
//!
//! An in-memory `CatalogReader`. Used by tests and local demos; the catalog is
//! filled up front and only read afterwards.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    slugify, Category, DietaryRestriction, Ingredient, Nutrition, RatingSummary, Recipe,
    RecipeImage, RecipeIngredient, RecipeLookup,
};
use crate::ports::{CatalogReader, PortResult};

/// Everything needed to add a recipe. Ingredient names and restriction tags are
/// resolved when the recipe is read, so ingredients can be tagged later.
#[derive(Debug, Clone, Default)]
pub struct RecipeSeed {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub category_ids: Vec<Uuid>,
    pub servings: u32,
    pub prep_time: u32,
    pub cook_time: u32,
    pub nutrition: Nutrition,
    pub ingredients: Vec<(Uuid, f64, String)>,
    pub images: Vec<RecipeImage>,
    pub main_image_url: Option<String>,
}

impl RecipeSeed {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            servings: 1,
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn category(mut self, category_id: Uuid) -> Self {
        self.category_ids.push(category_id);
        self
    }

    /// Adds 100 g of an ingredient.
    pub fn ingredient(self, ingredient_id: Uuid) -> Self {
        self.ingredient_amount(ingredient_id, 100.0, "g")
    }

    pub fn ingredient_amount(mut self, ingredient_id: Uuid, amount: f64, unit: &str) -> Self {
        self.ingredients.push((ingredient_id, amount, unit.to_string()));
        self
    }

    pub fn times(mut self, prep_time: u32, cook_time: u32) -> Self {
        self.prep_time = prep_time;
        self.cook_time = cook_time;
        self
    }

    pub fn nutrition(mut self, nutrition: Nutrition) -> Self {
        self.nutrition = nutrition;
        self
    }

    pub fn image(mut self, url: &str, order: u32) -> Self {
        self.images.push(RecipeImage {
            url: url.to_string(),
            alt_text: self.name.clone(),
            order,
        });
        self
    }
}

struct StoredRecipe {
    id: Uuid,
    slug: String,
    seed: RecipeSeed,
}

#[derive(Default)]
pub struct InMemoryCatalog {
    categories: Vec<Category>,
    restrictions: Vec<DietaryRestriction>,
    ingredients: Vec<Ingredient>,
    recipes: Vec<StoredRecipe>,
    reviews: HashMap<Uuid, Vec<u8>>,
    user_restrictions: HashMap<Uuid, Vec<Uuid>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&mut self, name: &str, friendly_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.categories.push(Category {
            id,
            name: name.to_string(),
            friendly_name: friendly_name.to_string(),
        });
        id
    }

    pub fn add_restriction(&mut self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.restrictions.push(DietaryRestriction {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn add_ingredient(&mut self, name: &str) -> Uuid {
        self.insert_ingredient(Ingredient {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            nutrition_per_100g: Nutrition::default(),
            dietary_restriction_ids: Vec::new(),
        })
    }

    pub fn insert_ingredient(&mut self, ingredient: Ingredient) -> Uuid {
        let id = ingredient.id;
        self.ingredients.push(ingredient);
        id
    }

    /// Tags an ingredient with a restriction. Unknown ids are ignored.
    pub fn tag_ingredient(&mut self, ingredient_id: Uuid, restriction_id: Uuid) {
        if !self.restrictions.iter().any(|r| r.id == restriction_id) {
            return;
        }
        if let Some(ingredient) = self.ingredients.iter_mut().find(|i| i.id == ingredient_id) {
            if !ingredient.dietary_restriction_ids.contains(&restriction_id) {
                ingredient.dietary_restriction_ids.push(restriction_id);
            }
        }
    }

    pub fn add_recipe(&mut self, seed: RecipeSeed) -> Uuid {
        let id = Uuid::new_v4();
        self.recipes.push(StoredRecipe {
            id,
            slug: slugify(&seed.name),
            seed,
        });
        id
    }

    pub fn add_review(&mut self, recipe_id: Uuid, rating: u8) {
        self.reviews.entry(recipe_id).or_default().push(rating.clamp(1, 5));
    }

    pub fn set_user_restrictions(&mut self, user_id: Uuid, restriction_ids: Vec<Uuid>) {
        self.user_restrictions.insert(user_id, restriction_ids);
    }

    fn hydrate(&self, stored: &StoredRecipe) -> Recipe {
        let seed = &stored.seed;
        let ingredients = seed
            .ingredients
            .iter()
            .filter_map(|(ingredient_id, amount, unit)| {
                let ingredient = self.ingredients.iter().find(|i| i.id == *ingredient_id)?;
                Some(RecipeIngredient {
                    ingredient_id: ingredient.id,
                    name: ingredient.name.clone(),
                    amount: *amount,
                    unit: unit.clone(),
                    dietary_restriction_ids: ingredient.dietary_restriction_ids.clone(),
                })
            })
            .collect();

        Recipe {
            id: stored.id,
            name: seed.name.clone(),
            slug: stored.slug.clone(),
            description: seed.description.clone(),
            instructions: seed.instructions.clone(),
            categories: self
                .categories
                .iter()
                .filter(|c| seed.category_ids.contains(&c.id))
                .cloned()
                .collect(),
            servings: seed.servings,
            prep_time: seed.prep_time,
            cook_time: seed.cook_time,
            nutrition: seed.nutrition,
            ingredients,
            images: seed.images.clone(),
            main_image_url: seed.main_image_url.clone(),
            rating: self
                .reviews
                .get(&stored.id)
                .map(|ratings| RatingSummary::from_ratings(ratings))
                .unwrap_or_default(),
        }
    }

    fn sorted_recipes(&self) -> Vec<Recipe> {
        let mut recipes: Vec<Recipe> = self.recipes.iter().map(|r| self.hydrate(r)).collect();
        recipes.sort_by(|a, b| a.name.cmp(&b.name));
        recipes
    }
}

fn first_names(mut names: Vec<String>, limit: usize) -> Vec<String> {
    names.sort();
    names.truncate(limit);
    names
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn recipe_names(&self, limit: usize) -> PortResult<Vec<String>> {
        Ok(first_names(
            self.recipes.iter().map(|r| r.seed.name.clone()).collect(),
            limit,
        ))
    }

    async fn ingredient_names(&self, limit: usize) -> PortResult<Vec<String>> {
        Ok(first_names(
            self.ingredients.iter().map(|i| i.name.clone()).collect(),
            limit,
        ))
    }

    async fn category_names(&self, limit: usize) -> PortResult<Vec<String>> {
        Ok(first_names(
            self.categories.iter().map(|c| c.friendly_name.clone()).collect(),
            limit,
        ))
    }

    async fn dietary_restriction_ids_for_user(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        Ok(self.user_restrictions.get(&user_id).cloned().unwrap_or_default())
    }

    async fn recipes_in_categories(&self, category_tokens: &[String]) -> PortResult<Vec<Recipe>> {
        let tokens: Vec<String> = category_tokens
            .iter()
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .collect();
        Ok(self
            .sorted_recipes()
            .into_iter()
            .filter(|r| tokens.is_empty() || r.in_any_category(&tokens))
            .collect())
    }

    async fn recipes_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<Recipe>> {
        Ok(self
            .recipes
            .iter()
            .filter(|r| ids.contains(&r.id))
            .map(|r| self.hydrate(r))
            .collect())
    }

    async fn find_recipe(&self, lookup: &RecipeLookup) -> PortResult<Option<Recipe>> {
        let found = self.sorted_recipes().into_iter().find(|r| match lookup {
            RecipeLookup::Id(id) => r.id == *id,
            RecipeLookup::Slug(slug) => r.slug.to_lowercase() == slug.trim().to_lowercase(),
            RecipeLookup::Name(name) => r.name.to_lowercase() == name.trim().to_lowercase(),
        });
        Ok(found)
    }

    async fn search_ingredients(&self, query: &str, limit: usize) -> PortResult<Vec<Ingredient>> {
        let query = query.trim().to_lowercase();
        let mut found: Vec<Ingredient> = self
            .ingredients
            .iter()
            .filter(|i| {
                query.is_empty()
                    || i.name.to_lowercase().contains(&query)
                    || i.description.to_lowercase().contains(&query)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found.truncate(limit);
        Ok(found)
    }
}
