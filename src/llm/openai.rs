use super::Llm;
use crate::config::EvaluatorConfig;
use anyhow::{Context, Result};
use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessage, CreateChatCompletionRequestArgs},
    Client,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model: String,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl LlmClient {
    pub fn new(model: String, base_url: Option<String>, api_key: Option<String>, rate_limit_rpm: u32) -> Self {
        let mut cfg = OpenAIConfig::default();
        if let Some(url) = base_url { cfg = cfg.with_api_base(url); }
        if let Some(key) = api_key { cfg = cfg.with_api_key(key); }
        let client = Client::with_config(cfg);
        let rpm = NonZeroU32::new(rate_limit_rpm).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));
        Self { client, model, limiter }
    }

    pub fn from_config(cfg: &EvaluatorConfig) -> Self {
        Self::new(cfg.model.clone(), cfg.base_url.clone(), cfg.api_key.clone(), cfg.rate_limit_rpm)
    }
}

#[async_trait::async_trait]
impl Llm for LlmClient {
    async fn chat(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String> {
        self.limiter.until_ready().await;

        let req = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(messages)
            .temperature(0.0)
            .build()?;
        debug!(model = %self.model, "chat completion request");

        let resp = self.client.chat().create(req).await.context("LLM request failed")?;
        let text = resp
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .context("No content in LLM response")?;
        Ok(text)
    }
}
