//! Integration tests for the HTTP surface, driven through the router with `oneshot`.

use std::collections::VecDeque;
use std::error::Error;
use std::sync::{Arc, Mutex};

use api_lib::web::{router, AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request as HttpRequest, StatusCode},
    Router,
};
use chefcito_core::{
    AgentSettings, InMemoryCatalog, LanguageModelService, PortError, PortResult, RecipeSeed,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
}

#[async_trait]
impl LanguageModelService for ScriptedModel {
    async fn complete(&self, _prompt: &str) -> PortResult<String> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PortError::Unexpected("script exhausted".to_string()))
    }
}

struct Fixture {
    app: Router,
    pudding: Uuid,
    pinto: Uuid,
    lactose_user: Uuid,
}

fn fixture(replies: &[&str]) -> Fixture {
    let replies: Vec<String> = replies.iter().map(|r| r.to_string()).collect();
    scripted_fixture(move |_| replies)
}

/// Builds the catalog first so the model script can refer to recipe ids.
fn scripted_fixture(script: impl FnOnce(Uuid) -> Vec<String>) -> Fixture {
    let mut catalog = InMemoryCatalog::new();
    let breakfast = catalog.add_category("breakfast", "Desayunos");
    let lactose = catalog.add_restriction("Lactose");
    let rice = catalog.add_ingredient("Arroz");
    let beans = catalog.add_ingredient("Frijoles");
    let milk = catalog.add_ingredient("Leche");
    catalog.tag_ingredient(milk, lactose);

    let pudding = catalog.add_recipe(
        RecipeSeed::new("Arroz con leche")
            .category(breakfast)
            .ingredient(rice)
            .ingredient(milk)
            .times(10, 40),
    );
    let pinto = catalog.add_recipe(
        RecipeSeed::new("Gallo Pinto")
            .category(breakfast)
            .ingredient(rice)
            .ingredient(beans)
            .times(10, 15),
    );
    catalog.add_review(pinto, 5);

    let lactose_user = Uuid::new_v4();
    catalog.set_user_restrictions(lactose_user, vec![lactose]);

    let model = Arc::new(ScriptedModel {
        replies: Mutex::new(script(pinto).into()),
    });
    let state = AppState::new(Arc::new(catalog), model, AgentSettings::default());

    Fixture {
        app: router(Arc::new(state)),
        pudding,
        pinto,
        lactose_user,
    }
}

fn post_json(uri: &str, body: Value) -> Result<HttpRequest<Body>, Box<dyn Error>> {
    Ok(HttpRequest::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))?)
}

async fn read_json(response: axum::response::Response) -> Result<Value, Box<dyn Error>> {
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[tokio::test]
async fn health_is_public() -> Result<(), Box<dyn Error>> {
    let fx = fixture(&[]);
    let request = HttpRequest::builder().uri("/health").body(Body::empty())?;

    let response = fx.app.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await?, json!({ "status": "ok" }));
    Ok(())
}

#[tokio::test]
async fn chat_returns_reply_with_recipe_cards() -> Result<(), Box<dyn Error>> {
    let fx = scripted_fixture(|pinto| {
        vec![
            r#"{"status":"tool_request","tool":"find_recipes","args":{"query":"pinto"}}"#
                .to_string(),
            json!({
                "status": "final",
                "answer_markdown": "Make **Gallo Pinto**.",
                "recipe_ids": [pinto.to_string()],
                "ingredient_names": ["frijoles"]
            })
            .to_string(),
        ]
    });

    let request = post_json(
        "/chefcito/chat",
        json!({
            "message": "Something with beans?",
            "history": [{ "role": "user", "content": "hola" }, { "role": "assistant", "content": "Hola!" }]
        }),
    )?;
    let response = fx.app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await?;
    assert_eq!(body["outcome"], json!("final"));
    assert_eq!(body["reply"], json!("Make **Gallo Pinto**."));
    assert_eq!(body["recipes"], json!([fx.pinto.to_string()]));
    assert_eq!(body["recipe_cards"][0]["name"], json!("Gallo Pinto"));
    assert_eq!(body["recipe_cards"][0]["total_time"], json!(25));
    assert_eq!(body["ingredients"], json!(["Frijoles"]));
    assert_eq!(body["used_tools"][0]["tool"], json!("find_recipes"));
    Ok(())
}

#[tokio::test]
async fn chat_falls_back_on_unusable_model_output() -> Result<(), Box<dyn Error>> {
    let fx = fixture(&["I would cook rice."]);

    let response = fx
        .app
        .oneshot(post_json("/chefcito/chat", json!({ "message": "hi" }))?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await?;
    assert_eq!(body["outcome"], json!("fallback"));
    assert_eq!(body["recipe_cards"], json!([]));
    Ok(())
}

#[tokio::test]
async fn blank_chat_message_is_a_bad_request() -> Result<(), Box<dyn Error>> {
    let fx = fixture(&[]);
    let response = fx
        .app
        .oneshot(post_json("/chefcito/chat", json!({ "message": "   " }))?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn chat_without_a_message_is_a_bad_request() -> Result<(), Box<dyn Error>> {
    let fx = fixture(&[]);
    let response = fx
        .app
        .oneshot(post_json("/chefcito/chat", json!({}))?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn malformed_user_header_is_rejected() -> Result<(), Box<dyn Error>> {
    let fx = fixture(&[]);
    let mut request = post_json("/recipes/recommend", json!({ "ingredients": ["Arroz"] }))?;
    request
        .headers_mut()
        .insert("x-user-id", "not-a-uuid".parse()?);

    let response = fx.app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn recommend_ranks_and_applies_the_callers_restrictions() -> Result<(), Box<dyn Error>> {
    let fx = fixture(&[]);

    let anonymous = fx
        .app
        .clone()
        .oneshot(post_json(
            "/recipes/recommend",
            json!({ "ingredients": ["arroz", "leche"] }),
        )?)
        .await?;
    assert_eq!(anonymous.status(), StatusCode::OK);
    let rows = read_json(anonymous).await?;
    assert_eq!(rows[0]["id"], json!(fx.pudding.to_string()));
    assert_eq!(rows[0]["missing_count"], json!(0));
    assert_eq!(rows[1]["missing_count"], json!(1));

    let mut request = post_json(
        "/recipes/recommend",
        json!({ "ingredients": ["arroz", "leche"], "categories": ["Desayunos"] }),
    )?;
    request
        .headers_mut()
        .insert("x-user-id", fx.lactose_user.to_string().parse()?);
    let restricted = fx.app.oneshot(request).await?;
    assert_eq!(restricted.status(), StatusCode::OK);
    let rows = read_json(restricted).await?;
    let rows = rows.as_array().ok_or("expected an array")?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(fx.pinto.to_string()));
    Ok(())
}

#[tokio::test]
async fn recommend_validates_its_input() -> Result<(), Box<dyn Error>> {
    let fx = fixture(&[]);

    let empty = fx
        .app
        .clone()
        .oneshot(post_json("/recipes/recommend", json!({ "ingredients": [" "] }))?)
        .await?;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let missing = fx
        .app
        .clone()
        .oneshot(post_json("/recipes/recommend", json!({}))?)
        .await?;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let bad_macro = fx
        .app
        .oneshot(post_json(
            "/recipes/recommend",
            json!({ "ingredients": ["Arroz"], "macro": "vitamins" }),
        )?)
        .await?;
    assert_eq!(bad_macro.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn openapi_document_lists_the_routes() -> Result<(), Box<dyn Error>> {
    let fx = fixture(&[]);
    let request = HttpRequest::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())?;

    let response = fx.app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let doc = read_json(response).await?;
    assert!(doc["paths"].get("/chefcito/chat").is_some());
    assert!(doc["paths"].get("/recipes/recommend").is_some());
    Ok(())
}
