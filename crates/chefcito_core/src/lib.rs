pub mod agent;
pub mod context;
pub mod contract;
pub mod domain;
pub mod memory;
pub mod ports;
pub mod prompt;
pub mod recommend;
pub mod settings;
pub mod tools;

pub use agent::{ChatError, ChatReply, ChefAgent, TurnOutcome};
pub use domain::{
    Category, ChatRole, ConversationTurn, CurrentUser, DietaryRestriction, Ingredient, Macro,
    Nutrition, RatingSummary, Recipe, RecipeImage, RecipeIngredient, RecipeLookup,
};
pub use memory::{InMemoryCatalog, RecipeSeed};
pub use ports::{CatalogReader, LanguageModelService, PortError, PortResult};
pub use recommend::{RecommendError, RecommendationEngine, RecommendationQuery, RecommendedRecipe};
pub use settings::{AgentSettings, ContextLimits, ToolLimits};
pub use tools::{RecipeCard, ToolBox, ToolResult, ToolUsage};
