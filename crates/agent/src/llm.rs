use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use grantline_core::config::LlmConfig;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Gemini `generateContent` client. Temperature is pinned to zero; the model
/// is used only to translate text into structured intents.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    max_retries: u32,
}

impl GeminiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key =
            config.api_key.clone().ok_or_else(|| anyhow!("llm.api_key is not configured"))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("could not build http client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            max_retries: config.max_retries,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![RequestContent { role: "user", parts: vec![RequestPart { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json",
            },
        };

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(250 * (1 << attempt.min(4)))).await;
            }

            let response = self
                .http
                .post(self.endpoint())
                .query(&[("key", self.api_key.expose_secret())])
                .json(&request)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    let body: GenerateResponse =
                        response.json().await.context("could not decode model response")?;
                    let text = body
                        .candidates
                        .first()
                        .map(|candidate| {
                            candidate
                                .content
                                .parts
                                .iter()
                                .map(|part| part.text.as_str())
                                .collect::<String>()
                        })
                        .unwrap_or_default();
                    if text.is_empty() {
                        return Err(anyhow!("model returned an empty completion"));
                    }
                    return Ok(text);
                }
                Ok(response) => {
                    let status = response.status();
                    // 4xx other than rate limiting will not heal on retry.
                    if status.is_client_error() && status.as_u16() != 429 {
                        return Err(anyhow!("model request rejected with status {status}"));
                    }
                    last_error = Some(anyhow!("model request failed with status {status}"));
                }
                Err(error) => {
                    last_error = Some(anyhow::Error::new(error).context("model request failed"));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("model request failed")))
    }
}
