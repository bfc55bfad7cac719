//! OpenAI 兼容的生成后端
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestDeveloperMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clients::text_generator::TextGenerator;
use crate::config::Config;
use crate::error::LlmError;
use crate::models::generation::{GenerationRequest, Role, RoleSegment};

/// OpenAI 兼容后端
///
/// 职责：
/// - 把 `GenerationRequest` 翻译成 chat completion 请求
/// - 只返回原始文本，不做任何格式校验
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl OpenAiGenerator {
    /// 创建新的生成后端
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
        }
    }

    fn build_message(segment: &RoleSegment) -> Result<ChatCompletionRequestMessage> {
        let message = match segment.role {
            Role::System => ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(segment.text.as_str())
                    .build()?,
            ),
            Role::Developer => ChatCompletionRequestMessage::Developer(
                ChatCompletionRequestDeveloperMessageArgs::default()
                    .content(segment.text.as_str())
                    .build()?,
            ),
            Role::User => ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(segment.text.as_str())
                    .build()?,
            ),
        };
        Ok(message)
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn invoke(&self, request: &GenerationRequest) -> Result<String> {
        debug!(
            "调用 LLM API，模型: {}，提示词 {} 字符，预算 {}",
            self.model_name,
            request.prompt_chars(),
            request.output_budget
        );

        // 构建消息列表
        let messages = request
            .role_segments
            .iter()
            .map(Self::build_message)
            .collect::<Result<Vec<_>>>()?;

        // 构建请求
        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.3)
            .max_tokens(request.output_budget)
            .build()?;

        // 调用 API
        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            LlmError::ApiCallFailed {
                model: self.model_name.clone(),
                source: Box::new(e),
            }
        })?;

        debug!("LLM API 调用成功");

        // 提取响应内容
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_generator() -> OpenAiGenerator {
        let config = Config {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or_default(),
            ..Config::from_env()
        };
        OpenAiGenerator::new(&config)
    }

    #[test]
    fn test_build_message_roles() {
        for segment in [
            RoleSegment::system("s"),
            RoleSegment::developer("d"),
            RoleSegment::user("u"),
        ] {
            let message = OpenAiGenerator::build_message(&segment).unwrap();
            let matches_role = match (segment.role, message) {
                (Role::System, ChatCompletionRequestMessage::System(_)) => true,
                (Role::Developer, ChatCompletionRequestMessage::Developer(_)) => true,
                (Role::User, ChatCompletionRequestMessage::User(_)) => true,
                _ => false,
            };
            assert!(matches_role);
        }
    }

    /// 测试真实后端连通性
    ///
    /// 运行方式：
    /// ```bash
    /// LLM_API_KEY=... cargo test test_live_generation -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_live_generation() {
        let _ = tracing_subscriber::fmt::try_init();

        let generator = create_test_generator();
        let request = GenerationRequest::new(
            vec![
                RoleSegment::system("You are a concise assistant."),
                RoleSegment::developer("Answer in one sentence."),
                RoleSegment::user("What does the chain rule say?"),
            ],
            100,
        );

        let response = generator.invoke(&request).await;
        match response {
            Ok(text) => {
                println!("\n========== LLM 响应 ==========");
                println!("{}", text);
                println!("==============================\n");
                assert!(!text.is_empty());
            }
            Err(e) => panic!("LLM 调用失败: {:#}", e),
        }
    }
}
