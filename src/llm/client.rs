use crate::config::Config;
use crate::generator::{ContentGenerator, GenerationError, GenerationRequest};
use crate::prompt::PromptTemplate;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::debug;

pub struct LlmClient {
    chat_client: Client<OpenAIConfig>,
    chat_model: String,
}

impl LlmClient {
    pub fn new(config: &Config) -> Self {
        let mut chat_config = OpenAIConfig::new().with_api_base(&config.llm_url);

        if let Some(key) = &config.llm_api_key {
            chat_config = chat_config.with_api_key(key);
        } else {
            chat_config = chat_config.with_api_key("unused");
        }

        Self {
            chat_client: Client::with_config(chat_config),
            chat_model: config.llm_model.clone(),
        }
    }

    pub async fn chat(&self, messages: Vec<ChatCompletionRequestMessage>) -> anyhow::Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.chat_model)
            .messages(messages)
            .build()?;

        let response = self.chat_client.chat().create(request).await?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))
    }

    pub async fn completion(&self, prompt: &str) -> anyhow::Result<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?;
        self.chat(vec![message.into()]).await
    }
}

/// Content generator backed by an OpenAI-compatible chat endpoint.
pub struct LlmContentGenerator {
    llm: LlmClient,
    prompt: PromptTemplate,
}

impl LlmContentGenerator {
    pub fn new(llm: LlmClient, prompt: PromptTemplate) -> Self {
        Self { llm, prompt }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            LlmClient::new(config),
            PromptTemplate {
                template: config.prompt_template.clone(),
                company: config.company_name.clone(),
                product: config.product.clone(),
                vision: config.vision.clone(),
            },
        )
    }
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let prompt = self.prompt.render(request);
        debug!(
            "LLM: requesting {} post for theme '{}'",
            request.platform, request.theme
        );
        self.llm
            .completion(&prompt)
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))
    }
}
