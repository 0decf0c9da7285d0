//! Turns free-form chat into typed update intents.
//!
//! All leniency lives here: the model may wrap its JSON in code fences or
//! emit entries that do not match the schema, and those entries are dropped
//! rather than failing the turn. Whatever survives parsing is strictly
//! typed before the core ever sees it.

use anyhow::Result;
use async_trait::async_trait;

use grantline_core::domain::consultation::ConsultationRecord;
use grantline_core::domain::session::ChatMessage;
use grantline_core::export::export_rows;
use grantline_core::intents::UpdateIntent;
use grantline_core::registry;

use crate::llm::LlmClient;

#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract(
        &self,
        record: &ConsultationRecord,
        transcript: &[ChatMessage],
        user_text: &str,
    ) -> Result<Vec<UpdateIntent>>;
}

#[async_trait]
impl IntentExtractor for Box<dyn IntentExtractor> {
    async fn extract(
        &self,
        record: &ConsultationRecord,
        transcript: &[ChatMessage],
        user_text: &str,
    ) -> Result<Vec<UpdateIntent>> {
        (**self).extract(record, transcript, user_text).await
    }
}

pub struct LlmIntentExtractor<C> {
    client: C,
}

impl<C> LlmIntentExtractor<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

/// Recent turns included for context. Older history adds cost without
/// improving extraction of the current message.
const TRANSCRIPT_WINDOW: usize = 12;

fn build_prompt(
    record: &ConsultationRecord,
    transcript: &[ChatMessage],
    user_text: &str,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are the extraction layer of a government subsidy consultation service. \
         Translate the user's latest message into a JSON array of intents. \
         Output ONLY the JSON array, nothing else.\n\n",
    );

    prompt.push_str(
        "Intent shapes:\n\
         {\"kind\": \"set_field\", \"field\": \"<field>\", \"value\": <value>}\n\
         {\"kind\": \"confirm\", \"confirmed\": true}\n\n\
         Fields and value types:\n\
         - project_type: \"RESEARCH_AND_DEVELOPMENT\" or \"MARKETING\"\n\
         - budget, people, capital, revenue, growth_revenue: integer\n\
         - has_certification, has_gov_award, is_mit, has_industry_academia, \
           has_factory_registration: boolean\n\
         - marketing_channels: array of \"DOMESTIC\" and/or \"EXPORT\"\n\n\
         Rules:\n\
         - Users quote amounts in ten-thousands; multiply by 10000 before \
           emitting (\"500 wan\" -> 5000000).\n\
         - Emit one set_field intent per field the user states or corrects, \
           even several in one message.\n\
         - Emit a confirm intent only when the user clearly agrees the shown \
           summary is correct (\"correct\", \"confirmed\", \"looks good\").\n\
         - If the message contains no field value and no confirmation, emit [].\n\n",
    );

    prompt.push_str("Current collected state (empty value = not yet answered):\n");
    for row in export_rows(record) {
        prompt.push_str(&format!("  {}: {}\n", row.key, row.value));
    }

    let missing = registry::missing_fields(record);
    if let Some(field) = missing.first() {
        prompt.push_str(&format!("\nThe field currently being asked for: {}\n", field.as_str()));
    }

    if !transcript.is_empty() {
        prompt.push_str("\nRecent conversation:\n");
        let start = transcript.len().saturating_sub(TRANSCRIPT_WINDOW);
        for message in &transcript[start..] {
            prompt.push_str(&format!("  {}: {}\n", message.role.as_str(), message.content));
        }
    }

    prompt.push_str(&format!("\nLatest user message:\n{user_text}\n"));
    prompt
}

/// Strip markdown code fences some models wrap JSON in.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn parse_intents(raw: &str) -> Vec<UpdateIntent> {
    let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(strip_fences(raw)) else {
        return Vec::new();
    };

    values
        .into_iter()
        .filter_map(|value| serde_json::from_value::<UpdateIntent>(value).ok())
        .collect()
}

#[async_trait]
impl<C: LlmClient> IntentExtractor for LlmIntentExtractor<C> {
    async fn extract(
        &self,
        record: &ConsultationRecord,
        transcript: &[ChatMessage],
        user_text: &str,
    ) -> Result<Vec<UpdateIntent>> {
        let prompt = build_prompt(record, transcript, user_text);
        let completion = self.client.complete(&prompt).await?;
        Ok(parse_intents(&completion))
    }
}
