use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use secrecy::{ExposeSecret, SecretString};

use crate::errors::{AppError, AppResult};

/// Text-in, text-out language model endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> AppResult<String>;
}

pub struct OpenAiCompletionService {
    client: Client<OpenAIConfig>,
    model: String,
}

/// Backoff that gives up after the first attempt. Rate-limit retries belong to
/// `RetryingCompletionService`.
fn single_attempt() -> backoff::ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

impl OpenAiCompletionService {
    pub fn new(api_base: &str, api_key: &SecretString, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new()
            .with_api_base(api_base)
            .with_api_key(api_key.expose_secret());
        Self {
            client: Client::with_config(config).with_backoff(single_attempt()),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletionService {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into()])
            .build()?;

        let response = self.client.chat().create(request).await?;
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::UpstreamError(format!("Model '{}' returned no content", self.model))
            })
    }
}

/// Retries rate-limited completions with exponential backoff; other failures pass through.
pub struct RetryingCompletionService {
    inner: Arc<dyn CompletionService>,
    max_retries: u32,
    base_delay: Duration,
}

impl RetryingCompletionService {
    pub fn new(inner: Arc<dyn CompletionService>, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[async_trait]
impl CompletionService for RetryingCompletionService {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        let mut attempt = 0;
        loop {
            match self.inner.complete(prompt).await {
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "Completion rate limited (attempt {}/{}), retrying in {:?}: {}",
                        attempt + 1,
                        self.max_retries,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
