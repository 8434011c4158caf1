//! Generative model access.

use crate::config::{Prompts, RagSettings};
use crate::error::{PlotlineError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A text generator that turns a rendered prompt into raw response text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a response for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Identifier of the underlying model, for logging.
    fn model_id(&self) -> String;
}

/// Generator backed by the OpenAI chat completions API.
pub struct OpenAIGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    system_prompt: String,
}

impl OpenAIGenerator {
    /// Create a generator for `model` with the given system prompt.
    pub fn new(model: &str, system_prompt: &str) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(Duration::from_secs(120))?,
            model: model.to_string(),
            temperature: 0.3,
            system_prompt: system_prompt.to_string(),
        })
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.system_prompt.clone())
                .build()
                .map_err(|e| PlotlineError::Generation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()
                .map_err(|e| PlotlineError::Generation(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| PlotlineError::Generation(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            PlotlineError::OpenAI(format!("Failed to generate response: {}", e))
        })?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| PlotlineError::Generation("Empty response from LLM".to_string()))?
            .clone();

        debug!("Generated {} characters with {}", text.len(), self.model);
        Ok(text)
    }

    fn model_id(&self) -> String {
        format!("openai:{}", self.model)
    }
}

/// Create the configured generator, or `None` when generation is disabled.
pub fn create_generator(
    settings: &RagSettings,
    prompts: &Prompts,
) -> Result<Option<Arc<dyn Generator>>> {
    if !settings.enabled {
        return Ok(None);
    }
    let system = prompts.render_with_custom(&prompts.rag.system, &Default::default());
    let generator = OpenAIGenerator::new(&settings.model, &system)?
        .with_temperature(settings.temperature);
    Ok(Some(Arc::new(generator)))
}
