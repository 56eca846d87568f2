//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use chefcito_core::{
    AgentSettings, CatalogReader, ChefAgent, LanguageModelService, RecommendationEngine,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogReader>,
    pub agent: ChefAgent,
    pub recommender: RecommendationEngine,
}

impl AppState {
    /// Wires the assistant and the recommendation engine to one catalog.
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        model: Arc<dyn LanguageModelService>,
        settings: AgentSettings,
    ) -> Self {
        let recommender = RecommendationEngine::new(catalog.clone(), settings.tools.recommendations);
        let agent = ChefAgent::new(model, catalog.clone(), settings);
        Self {
            catalog,
            agent,
            recommender,
        }
    }
}
