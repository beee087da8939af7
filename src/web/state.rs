use crate::domain::EngineContext;
use crate::model::ModelManager;

#[derive(Debug, Clone)]
pub struct AppState {
    engine: EngineContext,
}

impl AppState {
    pub fn new(engine: EngineContext) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &EngineContext {
        &self.engine
    }

    pub fn pool(&self) -> &ModelManager {
        self.engine.mm()
    }
}
