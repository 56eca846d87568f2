//! crates/chefcito_core/src/contract.rs
//!
//! The JSON protocol between the agent and the model, and the parser that turns
//! raw model text into a typed reply.

use serde_json::{Map, Value};

pub const TOOL_REQUEST_SCHEMA: &str = r#"{"status":"tool_request","tool":"find_recipes | get_recipe_detail | find_ingredients | recommend","args":{...}}"#;

pub const FINAL_SCHEMA: &str = r#"{"status":"final","answer_markdown":"string","recipe_ids":["uuid"],"ingredient_names":["string"]}"#;

pub const TOOLS_DOC: &str = r#"Available tools (use ONE at a time and ALWAYS answer in JSON):
- find_recipes(args: {
    query?: string,
    categories?: string[],
    include_ingredients?: string[],
    exclude_ingredients?: string[],
    macro?: "calories"|"protein"|"carbs"|"fat"|"sugar",
    time_max?: number
})
- get_recipe_detail(args: { name?: string, id?: string, slug?: string })
- find_ingredients(args: { query: string })
- recommend(args: {
    ingredients: string[],
    categories?: string[],
    macro?: "calories"|"protein"|"carbs"|"fat"|"sugar"
})"#;

/// Returned as the answer text when the model sends a blank final answer.
pub const DEFAULT_FINAL_REPLY: &str = "Done!";

/// A typed model reply. Anything that does not fit is treated as malformed.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Final {
        answer_markdown: String,
        recipe_ids: Vec<String>,
        ingredient_names: Vec<String>,
    },
    ToolRequest {
        tool: String,
        args: Value,
    },
}

impl ModelReply {
    /// Parses raw model text. `None` means malformed: not JSON, not an object,
    /// or an unknown `status`.
    pub fn parse(text: &str) -> Option<Self> {
        let Value::Object(body) = extract_json(text)? else {
            return None;
        };

        let status = body
            .get("status")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default();

        match status.as_str() {
            "final" => {
                let answer = body
                    .get("answer_markdown")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(DEFAULT_FINAL_REPLY);
                Some(ModelReply::Final {
                    answer_markdown: answer.to_string(),
                    recipe_ids: strings(&body, "recipe_ids"),
                    ingredient_names: strings(&body, "ingredient_names"),
                })
            }
            "tool_request" => Some(ModelReply::ToolRequest {
                tool: body
                    .get("tool")
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default(),
                args: match body.get("args") {
                    Some(Value::Object(args)) => Value::Object(args.clone()),
                    _ => Value::Object(Map::new()),
                },
            }),
            _ => None,
        }
    }
}

fn strings(body: &Map<String, Value>, key: &str) -> Vec<String> {
    body.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Strict decode first; on failure, retry on the slice from the first `{` or `[`
/// to the last `}` or `]`. No further repair is attempted.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }

    let start = [text.find('{'), text.find('[')].into_iter().flatten().min()?;
    let end = [text.rfind('}'), text.rfind(']')].into_iter().flatten().max()?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end]).ok()
}
