use crate::agent::parser::extract_sql;
use crate::agent::prompt::{build_sql_prompt, SQL_SYSTEM_PROMPT};
use crate::config::LlmConfig;
use crate::error::Result;
use crate::llm::{ChatClient, Message};
use crate::schema::Table;
use async_trait::async_trait;

/// turns a natural-language request into a sql string
#[async_trait]
pub trait SqlTranslator: Send + Sync {
    async fn translate(&self, prompt: &str, schema: &[Table]) -> Result<String>;
}

/// translator backed by a hosted chat completions model
pub struct OpenAiTranslator {
    client: ChatClient,
}

impl OpenAiTranslator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: ChatClient::new(config)?,
        })
    }
}

#[async_trait]
impl SqlTranslator for OpenAiTranslator {
    #[tracing::instrument(skip(self, prompt, schema), fields(llm.model = %self.client.model(), tables = schema.len()))]
    async fn translate(&self, prompt: &str, schema: &[Table]) -> Result<String> {
        let messages = vec![
            Message::system(SQL_SYSTEM_PROMPT),
            Message::user(build_sql_prompt(schema, prompt)),
        ];

        let reply = self.client.complete(&messages).await?;
        let sql = extract_sql(&reply)?;

        tracing::info!(sql_length = sql.len(), "sql generated");
        Ok(sql)
    }
}
