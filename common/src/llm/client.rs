use crate::config::LlmConfig;
use crate::error::{CsvSqlError, Result};
use crate::llm::model::{ChatRequest, ChatResponse, ErrorEnvelope, Message};

/// minimal client for an openai-compatible chat completions endpoint
pub struct ChatClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl ChatClient {
    /// fails without touching the network when no api key is configured
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                CsvSqlError::ExternalService(
                    "api key not found; set OPENAI_API_KEY or pass --api-key".to_string(),
                )
            })?
            .to_string();

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    #[tracing::instrument(skip(self, messages), fields(llm.model = %self.model, message_count = messages.len()))]
    pub async fn complete(&self, messages: &[Message]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
        };

        tracing::debug!(endpoint = %self.endpoint, "sending chat completion request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CsvSqlError::ExternalService(describe_failure(status, &body)));
        }

        parse_completion(&body)
    }
}

fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!("{}: {}", status, envelope.error.message),
        Err(_) => format!("{}: {}", status, body.trim()),
    }
}

/// pull the first choice's text out of a completion body
pub(crate) fn parse_completion(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| {
        CsvSqlError::ExternalService(format!("malformed completion response: {}", e))
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            CsvSqlError::ExternalService("completion response contained no content".to_string())
        })
}
