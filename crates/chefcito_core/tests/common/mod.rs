#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chefcito_core::domain::{Nutrition, RecipeLookup};
use chefcito_core::{
    CatalogReader, InMemoryCatalog, Ingredient, LanguageModelService, PortError, PortResult,
    Recipe, RecipeSeed,
};
use uuid::Uuid;

/// One scripted model response.
pub enum Scripted {
    Text(String),
    Fail(String),
    Slow(Duration, String),
}

/// A language model that replays queued responses and records every prompt.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Scripted>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn texts(replies: &[&str]) -> Arc<Self> {
        Self::new(
            replies
                .iter()
                .map(|r| Scripted::Text(r.to_string()))
                .collect(),
        )
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModelService for ScriptedModel {
    async fn complete(&self, prompt: &str) -> PortResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Fail(reason)) => Err(PortError::Unexpected(reason)),
            Some(Scripted::Slow(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            None => Err(PortError::Unexpected("script exhausted".to_string())),
        }
    }
}

/// A catalog whose every read fails.
pub struct BrokenCatalog;

#[async_trait]
impl CatalogReader for BrokenCatalog {
    async fn recipe_names(&self, _limit: usize) -> PortResult<Vec<String>> {
        Err(PortError::Unexpected("database is down".to_string()))
    }
    async fn ingredient_names(&self, _limit: usize) -> PortResult<Vec<String>> {
        Err(PortError::Unexpected("database is down".to_string()))
    }
    async fn category_names(&self, _limit: usize) -> PortResult<Vec<String>> {
        Err(PortError::Unexpected("database is down".to_string()))
    }
    async fn dietary_restriction_ids_for_user(&self, _user_id: Uuid) -> PortResult<Vec<Uuid>> {
        Err(PortError::Unexpected("database is down".to_string()))
    }
    async fn recipes_in_categories(&self, _tokens: &[String]) -> PortResult<Vec<Recipe>> {
        Err(PortError::Unexpected("database is down".to_string()))
    }
    async fn recipes_by_ids(&self, _ids: &[Uuid]) -> PortResult<Vec<Recipe>> {
        Err(PortError::Unexpected("database is down".to_string()))
    }
    async fn find_recipe(&self, _lookup: &RecipeLookup) -> PortResult<Option<Recipe>> {
        Err(PortError::Unexpected("database is down".to_string()))
    }
    async fn search_ingredients(&self, _query: &str, _limit: usize) -> PortResult<Vec<Ingredient>> {
        Err(PortError::Unexpected("database is down".to_string()))
    }
}

/// A small kitchen: four ingredients A-D and the classic ranking recipes,
/// plus a dairy dish and a breakfast.
pub struct Kitchen {
    pub catalog: InMemoryCatalog,
    pub a: Uuid,
    pub b: Uuid,
    pub c: Uuid,
    pub d: Uuid,
    pub milk: Uuid,
    pub rice: Uuid,
    pub lactose: Uuid,
    pub breakfast: Uuid,
    pub dinner: Uuid,
    pub a_plus_b: Uuid,
    pub a_only: Uuid,
    pub a_plus_c: Uuid,
    pub d_only: Uuid,
    pub rice_pudding: Uuid,
    pub gallo_pinto: Uuid,
}

pub fn kitchen() -> Kitchen {
    let mut catalog = InMemoryCatalog::new();

    let breakfast = catalog.add_category("breakfast", "Desayunos");
    let dinner = catalog.add_category("dinner", "Cenas");
    let lactose = catalog.add_restriction("Lactose");

    let a = catalog.add_ingredient("A");
    let b = catalog.add_ingredient("B");
    let c = catalog.add_ingredient("C");
    let d = catalog.add_ingredient("D");
    let milk = catalog.insert_ingredient(Ingredient {
        id: Uuid::new_v4(),
        name: "Leche".to_string(),
        description: "Whole cow milk".to_string(),
        nutrition_per_100g: Nutrition {
            calories: 61.0,
            protein: 3.2,
            carbs: 4.8,
            fat: 3.3,
            sugar: 5.1,
        },
        dietary_restriction_ids: Vec::new(),
    });
    catalog.tag_ingredient(milk, lactose);
    let rice = catalog.add_ingredient("Arroz");

    let a_plus_b = catalog.add_recipe(
        RecipeSeed::new("A+B")
            .category(dinner)
            .ingredient(a)
            .ingredient(b)
            .times(5, 10),
    );
    let a_only = catalog.add_recipe(RecipeSeed::new("Solo A").category(dinner).ingredient(a).times(5, 5));
    let a_plus_c = catalog.add_recipe(
        RecipeSeed::new("A+C")
            .category(dinner)
            .ingredient(a)
            .ingredient(c)
            .times(20, 30),
    );
    let d_only = catalog.add_recipe(RecipeSeed::new("D solo").category(dinner).ingredient(d).times(1, 1));
    let rice_pudding = catalog.add_recipe(
        RecipeSeed::new("Arroz con leche")
            .description("Creamy dessert")
            .category(breakfast)
            .ingredient(rice)
            .ingredient(milk)
            .times(10, 40)
            .image("https://img.example/pudding-2.jpg", 2)
            .image("https://img.example/pudding-1.jpg", 1),
    );
    let gallo_pinto = catalog.add_recipe(
        RecipeSeed::new("Gallo Pinto")
            .description("Rice and beans, Costa Rican style")
            .category(breakfast)
            .ingredient(rice)
            .ingredient(a)
            .times(10, 15)
            .nutrition(Nutrition {
                calories: 420.0,
                protein: 18.0,
                carbs: 60.0,
                fat: 9.0,
                sugar: 2.0,
            }),
    );

    catalog.add_review(a_plus_b, 4);
    catalog.add_review(a_only, 5);
    catalog.add_review(a_plus_c, 5);
    catalog.add_review(gallo_pinto, 5);
    catalog.add_review(gallo_pinto, 4);

    Kitchen {
        catalog,
        a,
        b,
        c,
        d,
        milk,
        rice,
        lactose,
        breakfast,
        dinner,
        a_plus_b,
        a_only,
        a_plus_c,
        d_only,
        rice_pudding,
        gallo_pinto,
    }
}

pub fn tokens(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
