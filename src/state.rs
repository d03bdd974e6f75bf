use std::sync::Arc;

use crate::{config::Config, services::quiz_attempts::QuizAttemptManager, store::AttemptStore};
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub attempts: QuizAttemptManager,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn AttemptStore>, config: Config) -> Self {
        Self {
            attempts: QuizAttemptManager::new(store),
            config,
        }
    }
}

impl FromRef<AppState> for QuizAttemptManager {
    fn from_ref(state: &AppState) -> Self {
        state.attempts.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
