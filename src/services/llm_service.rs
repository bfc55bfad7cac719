//! LLM 服务 - 业务能力层
//!
//! 只负责"调用生成后端"能力，不关心流程
//!
//! - 每次调用都有超时，超时和后端错误一律视为空结果
//! - 非空结果缺少结束标记时补上
//! - 统计本次请求的调用次数

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clients::TextGenerator;
use crate::error::LlmError;
use crate::models::document::SENTINEL;
use crate::models::generation::GenerationRequest;

/// LLM 服务
///
/// 职责：
/// - 持有生成后端的共享引用
/// - 只处理单次调用，不做校验和重试
/// - 不关心单元顺序
pub struct LlmService {
    generator: Arc<dyn TextGenerator>,
    timeout_secs: u64,
    calls: AtomicUsize,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(generator: Arc<dyn TextGenerator>, timeout_secs: u64) -> Self {
        Self {
            generator,
            timeout_secs,
            calls: AtomicUsize::new(0),
        }
    }

    /// 调用生成后端
    ///
    /// # 返回
    /// 生成的文本；失败或超时返回空字符串
    pub async fn generate(&self, request: &GenerationRequest) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(
            "调用生成后端 {}，提示词 {} 字符，预算 {}",
            self.generator.name(),
            request.prompt_chars(),
            request.output_budget
        );

        let result = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            self.generator.invoke(request),
        )
        .await;

        let text = match result {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("⚠️ 生成调用失败，按空结果处理: {:#}", e);
                return String::new();
            }
            Err(_) => {
                warn!(
                    "⚠️ {}，按空结果处理",
                    LlmError::Timeout {
                        secs: self.timeout_secs
                    }
                );
                return String::new();
            }
        };

        ensure_sentinel(text.trim())
    }

    /// 已发起的调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// 非空文本末尾没有结束标记时补上一行
pub fn ensure_sentinel(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    if text.trim_end().ends_with(SENTINEL) {
        text.to_string()
    } else {
        format!("{}\n{}", text, SENTINEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct Fixed(&'static str);

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn invoke(&self, _request: &GenerationRequest) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl TextGenerator for Failing {
        async fn invoke(&self, _request: &GenerationRequest) -> Result<String> {
            anyhow::bail!("backend unavailable")
        }
    }

    struct Slow;

    #[async_trait]
    impl TextGenerator for Slow {
        async fn invoke(&self, _request: &GenerationRequest) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late".to_string())
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new(Vec::new(), 10)
    }

    #[test]
    fn test_ensure_sentinel() {
        assert_eq!(ensure_sentinel(""), "");
        assert_eq!(ensure_sentinel("body"), format!("body\n{}", SENTINEL));
        let done = format!("body\n{}", SENTINEL);
        assert_eq!(ensure_sentinel(&done), done);
    }

    #[tokio::test]
    async fn test_generate_appends_sentinel_and_counts() {
        let service = LlmService::new(Arc::new(Fixed("  answer  ")), 5);
        assert_eq!(service.generate(&request()).await, format!("answer\n{}", SENTINEL));
        assert_eq!(service.generate(&request()).await, format!("answer\n{}", SENTINEL));
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_empty() {
        let service = LlmService::new(Arc::new(Failing), 5);
        assert_eq!(service.generate(&request()).await, "");
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_empty() {
        let service = LlmService::new(Arc::new(Slow), 1);
        assert_eq!(service.generate(&request()).await, "");
    }
}
