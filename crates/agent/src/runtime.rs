use anyhow::Result;
use chrono::{DateTime, Utc};

use grantline_core::domain::consultation::ConsultationRecord;
use grantline_core::domain::session::ChatMessage;
use grantline_core::orchestrator::handle_turn;
use grantline_core::progress::Action;

use crate::extractor::IntentExtractor;
use crate::messages::MessageComposer;

#[derive(Clone, Debug, PartialEq)]
pub struct AgentReply {
    pub text: String,
    pub action: Action,
    /// True on the turn that produced the calculation, so the caller can
    /// close out the session.
    pub completed: bool,
}

pub struct AgentRuntime<E> {
    extractor: E,
}

impl<E: IntentExtractor> AgentRuntime<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }

    /// One chat turn: extract intents from the message, drive the record
    /// through the core, and compose the reply.
    pub async fn handle_message(
        &self,
        record: &mut ConsultationRecord,
        transcript: &[ChatMessage],
        user_text: &str,
        now: DateTime<Utc>,
    ) -> Result<AgentReply> {
        let intents = self.extractor.extract(record, transcript, user_text).await?;
        let outcome = handle_turn(record, &intents, now)?;
        let completed = outcome.result.is_some();
        let text = MessageComposer::compose(record, &outcome);

        Ok(AgentReply { text, action: outcome.action, completed })
    }
}
