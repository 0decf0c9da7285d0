//! Shared fixtures for handler tests: in-memory persistence and a scripted
//! extractor in place of the live model.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use grantline_agent::extractor::IntentExtractor;
use grantline_agent::runtime::AgentRuntime;
use grantline_core::config::AppConfig;
use grantline_core::domain::consultation::ConsultationRecord;
use grantline_core::domain::session::ChatMessage;
use grantline_core::intents::UpdateIntent;
use grantline_db::repositories::{
    InMemoryConsultationRepository, InMemoryMessageRepository, InMemorySessionRepository,
    InMemoryUserRepository,
};

use crate::bootstrap::{AppState, SessionLocks};

/// Replays a scripted list of intents per call, then yields nothing.
pub(crate) struct ScriptedExtractor {
    turns: std::sync::Mutex<Vec<Vec<UpdateIntent>>>,
}

impl ScriptedExtractor {
    pub(crate) fn new(turns: Vec<Vec<UpdateIntent>>) -> Self {
        Self { turns: std::sync::Mutex::new(turns) }
    }
}

#[async_trait]
impl IntentExtractor for ScriptedExtractor {
    async fn extract(
        &self,
        _record: &ConsultationRecord,
        _transcript: &[ChatMessage],
        _user_text: &str,
    ) -> Result<Vec<UpdateIntent>> {
        let mut turns = self.turns.lock().expect("lock");
        if turns.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(turns.remove(0))
        }
    }
}

pub(crate) fn test_state(turns: Vec<Vec<UpdateIntent>>) -> AppState {
    let mut config = AppConfig::default();
    config.llm.api_key = Some("test-api-key".to_string().into());
    config.auth.jwt_secret = "a-long-enough-test-secret".to_string().into();

    let extractor: Box<dyn IntentExtractor> = Box::new(ScriptedExtractor::new(turns));

    AppState {
        config: Arc::new(config),
        users: Arc::new(InMemoryUserRepository::default()),
        sessions: Arc::new(InMemorySessionRepository::default()),
        messages: Arc::new(InMemoryMessageRepository::default()),
        consultations: Arc::new(InMemoryConsultationRepository::default()),
        runtime: Arc::new(AgentRuntime::new(extractor)),
        locks: SessionLocks::default(),
    }
}
