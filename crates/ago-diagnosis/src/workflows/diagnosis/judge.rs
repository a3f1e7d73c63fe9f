//! Language-model judgment backend.
//!
//! Calls go through `async-openai`, so any OpenAI-compatible endpoint can be used by
//! overriding the API base.

use std::future::Future;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::{debug, warn};

use crate::config::JudgeConfig;

/// Text completion used to judge qualitative rubric items.
pub trait JudgmentBackend: Send + Sync {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, JudgmentError>> + Send;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JudgmentError {
    #[error("judgment backend is not configured (set APP_JUDGE_API_KEY)")]
    NotConfigured,
    #[error("judgment request could not be built: {0}")]
    InvalidRequest(String),
    #[error("judgment backend call failed: {0}")]
    Transport(String),
    #[error("judgment backend returned an empty reply")]
    EmptyReply,
}

const SYSTEM_PROMPT: &str = "You audit web pages for AI search optimization. \
Judge only the evidence you are given, be concise, and always start your reply with \
`Score: N` where N is an integer from 0 (absent) to 5 (excellent).";

/// Chat-completion backed judge.
pub struct OpenAiJudge {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiJudge {
    const MAX_TOKENS: u32 = 400;

    pub fn new(config: &JudgeConfig) -> Self {
        let mut openai_config = OpenAIConfig::new();
        if let Some(key) = &config.api_key {
            openai_config = openai_config.with_api_key(key);
        }
        if let Some(base) = &config.api_base {
            openai_config = openai_config.with_api_base(base);
        }

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
        }
    }

    fn build_request(
        &self,
        prompt: &str,
    ) -> Result<async_openai::types::chat::CreateChatCompletionRequest, JudgmentError> {
        let invalid = |err: async_openai::error::OpenAIError| JudgmentError::InvalidRequest(err.to_string());

        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_PROMPT)
            .build()
            .map_err(invalid)?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(invalid)?;

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestMessage::System(system),
                ChatCompletionRequestMessage::User(user),
            ])
            .temperature(0.0)
            .max_tokens(Self::MAX_TOKENS)
            .build()
            .map_err(invalid)
    }
}

impl JudgmentBackend for OpenAiJudge {
    async fn complete(&self, prompt: &str) -> Result<String, JudgmentError> {
        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "requesting judgment");

        let request = self.build_request(prompt)?;
        let response = self.client.chat().create(request).await.map_err(|err| {
            warn!(model = %self.model, error = %err, "judgment call failed");
            JudgmentError::Transport(err.to_string())
        })?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(JudgmentError::EmptyReply)
    }
}

/// Backend selected from configuration; judgment items fail individually when disabled.
pub enum ConfiguredJudge {
    OpenAi(OpenAiJudge),
    Disabled,
}

impl ConfiguredJudge {
    pub fn from_config(config: &JudgeConfig) -> Self {
        if config.is_enabled() {
            Self::OpenAi(OpenAiJudge::new(config))
        } else {
            Self::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::OpenAi(_))
    }
}

impl JudgmentBackend for ConfiguredJudge {
    async fn complete(&self, prompt: &str) -> Result<String, JudgmentError> {
        match self {
            Self::OpenAi(judge) => judge.complete(prompt).await,
            Self::Disabled => Err(JudgmentError::NotConfigured),
        }
    }
}
