//! crates/chefcito_core/src/prompt.rs
//!
//! Renders the single prompt string sent to the model on every iteration.

use serde::Serialize;

use crate::context::GroundingContext;
use crate::contract::{FINAL_SCHEMA, TOOLS_DOC, TOOL_REQUEST_SCHEMA};
use crate::domain::{ChatRole, ConversationTurn};
use crate::tools::ToolResult;

const RESPONSE_CONTRACT: &str = r#"MANDATORY RESPONSE FORMAT:
- If you need data -> {"status":"tool_request","tool":"<name>","args":{...}}
- If you can answer -> {"status":"final","answer_markdown":"...","recipe_ids":[...],"ingredient_names":[...]}
Do not write anything outside the JSON."#;

/// Keeps only user/assistant turns, the most recent `window` of them, oldest first.
pub fn trim_history(history: &[ConversationTurn], window: usize) -> Vec<&ConversationTurn> {
    let relevant: Vec<&ConversationTurn> = history
        .iter()
        .filter(|turn| matches!(turn.role, ChatRole::User | ChatRole::Assistant))
        .collect();
    let skip = relevant.len().saturating_sub(window);
    relevant.into_iter().skip(skip).collect()
}

pub fn compose_prompt(
    context: &GroundingContext,
    message: &str,
    history: &[&ConversationTurn],
    tool_result: Option<&ToolResult>,
) -> String {
    let history_block = if history.is_empty() {
        "- (no history)".to_string()
    } else {
        history
            .iter()
            .map(|turn| format!("- {}: {}", turn.role.as_str(), turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let system = format!(
        r#"You are **Chefcito**, a playful and helpful kitchen assistant.
Goal: help the user with recipes, ingredients and the features of the recipe platform.
Today is {date}.

Hard rules:
1) NEVER invent names: use ONLY items from these lists:
- allowed_recipes: {recipes}
- allowed_ingredients: {ingredients}
- allowed_categories: {categories}
2) If you need concrete data, request a tool with EXACTLY:
{tool_request}
3) When you have what you need, answer with:
{final_schema}
4) Be clear and friendly. You may use Markdown.
5) If asked about platform features, explain them precisely. Features: {features}.
6) If something is not in the lists, ask for more context or suggest valid alternatives.
7) The user is {auth_state}.

{tools_doc}

Conversation so far:
{history_block}"#,
        date = context.date_iso,
        recipes = to_json(&context.allowed_recipes),
        ingredients = to_json(&context.allowed_ingredients),
        categories = to_json(&context.allowed_categories),
        tool_request = TOOL_REQUEST_SCHEMA,
        final_schema = FINAL_SCHEMA,
        features = to_json(&context.features),
        auth_state = if context.user.is_authenticated {
            "signed in; their dietary restrictions are applied to recommendations automatically"
        } else {
            "anonymous"
        },
        tools_doc = TOOLS_DOC,
    );

    let tool_section = tool_result
        .map(|result| format!("\nTOOL_RESULT:\n{}\n", to_json(result)))
        .unwrap_or_default();

    format!("{system}\n{tool_section}\nUSER_MESSAGE:\n{message}\n\n{RESPONSE_CONTRACT}")
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
