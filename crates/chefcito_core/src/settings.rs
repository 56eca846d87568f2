//! crates/chefcito_core/src/settings.rs
//!
//! Tunable limits of the assistant. Passed in by the caller so tests can
//! exercise boundary values.

use std::time::Duration;

/// How much of the catalog is exposed to the model as grounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    pub max_recipes: usize,
    pub max_ingredients: usize,
    pub max_categories: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_recipes: 220,
            max_ingredients: 450,
            max_categories: 80,
        }
    }
}

/// Result caps of the tool functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolLimits {
    pub find_recipes: usize,
    pub find_ingredients: usize,
    pub recommendations: usize,
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self {
            find_recipes: 15,
            find_ingredients: 25,
            recommendations: 15,
        }
    }
}

/// Settings of a single agent turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    /// Upper bound on model calls per turn.
    pub max_iters: usize,
    /// Number of user/assistant history entries replayed into the prompt.
    pub history_window: usize,
    pub llm_timeout: Duration,
    pub context: ContextLimits,
    pub tools: ToolLimits,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iters: 3,
            history_window: 8,
            llm_timeout: Duration::from_secs(60),
            context: ContextLimits::default(),
            tools: ToolLimits::default(),
        }
    }
}
