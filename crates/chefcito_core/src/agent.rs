//! crates/chefcito_core/src/agent.rs
//!
//! The bounded conversation loop between the assistant and the model.
//!
//! Every turn is stateless: history comes in from the caller and the grounding is
//! re-read from the catalog. The loop alternates between asking the model and
//! running the tool it requests, feeding each tool result into the next prompt,
//! until the model gives a final answer or the iteration budget runs out.
//! Model failures of any kind end the turn with a friendly fallback instead of an
//! error; only a blank message is rejected.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::context::{build_grounding_context, GroundingContext};
use crate::contract::ModelReply;
use crate::domain::{ConversationTurn, CurrentUser};
use crate::ports::{CatalogReader, LanguageModelService};
use crate::prompt::{compose_prompt, trim_history};
use crate::settings::AgentSettings;
use crate::tools::{ToolBox, ToolResult, ToolUsage};

pub const FALLBACK_REPLY: &str = "I'm listening! What would you like to cook today? \
Ask me for recipes, filters or recommendations based on the ingredients you have.";

pub const NEED_MORE_INPUT_REPLY: &str =
    "I'm going to need a little more detail to help you better. Could you tell me more?";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message is required")]
    EmptyMessage,
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The model produced a final answer.
    Final,
    /// The model reply was unusable (malformed, unknown status, transport failure).
    Fallback,
    /// The iteration budget ran out before a final answer.
    NeedMoreInput,
    /// The caller went away before the turn finished.
    Cancelled,
}

/// The result of one agent turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub recipe_ids: Vec<Uuid>,
    pub ingredient_names: Vec<String>,
    pub used_tools: Vec<ToolUsage>,
    pub outcome: TurnOutcome,
}

impl ChatReply {
    fn without_references(reply: &str, used_tools: Vec<ToolUsage>, outcome: TurnOutcome) -> Self {
        Self {
            reply: reply.to_string(),
            recipe_ids: Vec::new(),
            ingredient_names: Vec::new(),
            used_tools,
            outcome,
        }
    }
}

/// The states a turn moves through.
enum AgentState {
    Composing,
    AwaitingModel(String),
    Parsing(String),
    Dispatching { tool: String, args: Value },
    Malformed,
}

/// The conversational recipe assistant.
#[derive(Clone)]
pub struct ChefAgent {
    model: Arc<dyn LanguageModelService>,
    catalog: Arc<dyn CatalogReader>,
    tools: ToolBox,
    settings: AgentSettings,
}

impl ChefAgent {
    pub fn new(
        model: Arc<dyn LanguageModelService>,
        catalog: Arc<dyn CatalogReader>,
        settings: AgentSettings,
    ) -> Self {
        let tools = ToolBox::new(catalog.clone(), settings.tools);
        Self {
            model,
            catalog,
            tools,
            settings,
        }
    }

    pub async fn chat(
        &self,
        user: &CurrentUser,
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<ChatReply, ChatError> {
        self.chat_with_cancellation(user, message, history, &CancellationToken::new())
            .await
    }

    /// Runs one turn. Cancellation is checked before every model call.
    pub async fn chat_with_cancellation(
        &self,
        user: &CurrentUser,
        message: &str,
        history: &[ConversationTurn],
        cancel: &CancellationToken,
    ) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let today = Utc::now().date_naive();
        let context = match build_grounding_context(
            self.catalog.as_ref(),
            user,
            &self.settings.context,
            today,
        )
        .await
        {
            Ok(context) => context,
            Err(e) => {
                error!(error = %e, "failed to build grounding context");
                return Ok(ChatReply::without_references(
                    FALLBACK_REPLY,
                    Vec::new(),
                    TurnOutcome::Fallback,
                ));
            }
        };

        let history = trim_history(history, self.settings.history_window);
        let mut used_tools: Vec<ToolUsage> = Vec::new();
        let mut tool_result: Option<ToolResult> = None;
        let mut iteration = 0usize;
        let mut state = AgentState::Composing;

        loop {
            state = match state {
                AgentState::Composing => {
                    if cancel.is_cancelled() {
                        info!(iteration, "agent turn cancelled");
                        return Ok(ChatReply::without_references(
                            "",
                            used_tools,
                            TurnOutcome::Cancelled,
                        ));
                    }
                    if iteration >= self.settings.max_iters {
                        warn!(
                            max_iters = self.settings.max_iters,
                            "agent turn ran out of iterations"
                        );
                        return Ok(ChatReply::without_references(
                            NEED_MORE_INPUT_REPLY,
                            used_tools,
                            TurnOutcome::NeedMoreInput,
                        ));
                    }
                    AgentState::AwaitingModel(compose_prompt(
                        &context,
                        message,
                        &history,
                        tool_result.as_ref(),
                    ))
                }
                AgentState::AwaitingModel(prompt) => {
                    match timeout(self.settings.llm_timeout, self.model.complete(&prompt)).await {
                        Ok(Ok(text)) => AgentState::Parsing(text),
                        Ok(Err(e)) => {
                            warn!(iteration, error = %e, "language model call failed");
                            AgentState::Malformed
                        }
                        Err(_) => {
                            warn!(
                                iteration,
                                timeout_ms = self.settings.llm_timeout.as_millis() as u64,
                                "language model call timed out"
                            );
                            AgentState::Malformed
                        }
                    }
                }
                AgentState::Parsing(text) => match ModelReply::parse(&text) {
                    Some(ModelReply::Final {
                        answer_markdown,
                        recipe_ids,
                        ingredient_names,
                    }) => {
                        return Ok(finish(
                            &context,
                            answer_markdown,
                            &recipe_ids,
                            &ingredient_names,
                            used_tools,
                        ));
                    }
                    Some(ModelReply::ToolRequest { tool, args }) => {
                        AgentState::Dispatching { tool, args }
                    }
                    None => {
                        warn!(iteration, "model reply did not follow the contract");
                        debug!(raw = %text, "unparseable model reply");
                        AgentState::Malformed
                    }
                },
                AgentState::Dispatching { tool, args } => {
                    info!(iteration, tool = %tool, "model requested a tool");
                    let result = self.tools.dispatch(&tool, &args, &context).await;
                    used_tools.push(ToolUsage { tool, args });
                    tool_result = Some(result);
                    iteration += 1;
                    AgentState::Composing
                }
                AgentState::Malformed => {
                    return Ok(ChatReply::without_references(
                        FALLBACK_REPLY,
                        used_tools,
                        TurnOutcome::Fallback,
                    ));
                }
            };
        }
    }
}

/// Builds the final reply, keeping only well-formed recipe ids and ingredient
/// names that were part of the grounding snapshot.
fn finish(
    context: &GroundingContext,
    answer_markdown: String,
    recipe_ids: &[String],
    ingredient_names: &[String],
    used_tools: Vec<ToolUsage>,
) -> ChatReply {
    let mut ids: Vec<Uuid> = Vec::new();
    for id in recipe_ids.iter().filter_map(|raw| Uuid::parse_str(raw).ok()) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    let mut names: Vec<String> = Vec::new();
    for name in ingredient_names
        .iter()
        .filter_map(|raw| context.canonical_ingredient(raw))
    {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    let dropped = (recipe_ids.len() - ids.len()) + (ingredient_names.len() - names.len());
    if dropped > 0 {
        debug!(dropped, "ignored references outside the grounding snapshot");
    }

    ChatReply {
        reply: answer_markdown,
        recipe_ids: ids,
        ingredient_names: names,
        used_tools,
        outcome: TurnOutcome::Final,
    }
}
