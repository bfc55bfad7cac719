//! 单元处理流程 - 流程层
//!
//! 核心职责：定义"一个单元"的完整处理流程
//!
//! 流程顺序：
//! 1. 构建提示词 → 生成 → 质量闸门
//! 2. 不通过：加 CRITICAL 段的升级提示词 → 生成 → 质量闸门
//! 3. 仍不通过：丢弃（软失败，不影响其他单元）

use tracing::{debug, info, warn};

use crate::models::document::AcceptedOutput;
use crate::models::unit::Unit;
use crate::services::{LlmService, PromptBuilder, QualityGate};
use crate::utils::logging::truncate_text;
use crate::workflow::unit_ctx::UnitCtx;

/// 单元处理流程
///
/// - 最多重试一次
/// - 不持有任何资源，只借用本次请求的能力
/// - 不关心单元之间的顺序
pub struct UnitFlow<'a> {
    llm_service: &'a LlmService,
    prompt_builder: &'a PromptBuilder,
    gate: &'a QualityGate,
    verbose_logging: bool,
}

impl<'a> UnitFlow<'a> {
    pub fn new(
        llm_service: &'a LlmService,
        prompt_builder: &'a PromptBuilder,
        gate: &'a QualityGate,
        verbose_logging: bool,
    ) -> Self {
        Self {
            llm_service,
            prompt_builder,
            gate,
            verbose_logging,
        }
    }

    /// 处理一个单元
    ///
    /// # 返回
    /// 通过闸门的输出；两次都不通过返回 `None`
    pub async fn run(&self, unit: &Unit, ctx: &UnitCtx) -> Option<AcceptedOutput> {
        if self.verbose_logging {
            debug!("{} 📄 内容: {}", ctx, truncate_text(unit.content(), 80));
        }

        // ========== 首次尝试 ==========
        let request = self.prompt_builder.unit_request(unit, &ctx.label);
        let output = self.llm_service.generate(&request).await;
        let report = self.gate.evaluate(&output);

        if report.passed() {
            info!("{} ✓ 首次生成通过", ctx);
            return Some(AcceptedOutput::new(ctx.label.clone(), output));
        }
        info!("{} 首次生成未通过 ({})，使用升级提示词重试", ctx, report.summary());

        // ========== 升级重试 ==========
        let request = self.prompt_builder.escalated_request(unit, &ctx.label);
        let output = self.llm_service.generate(&request).await;
        let report = self.gate.evaluate(&output);

        if report.passed() {
            info!("{} ✓ 重试生成通过", ctx);
            return Some(AcceptedOutput::new(ctx.label.clone(), output));
        }

        warn!("{} ⚠️ 重试仍未通过 ({})，丢弃该单元", ctx, report.summary());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::TextGenerator;
    use crate::models::generation::GenerationRequest;
    use crate::models::request::GenerationOptions;
    use crate::models::tool::Tool;
    use crate::models::unit::Segment;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    const GOOD: &str = "What is being asked\n- a\n- b\nMethod / steps\n- c\n- d\nCommon pitfalls\n- e\n- f";
    const BAD: &str = "What is being asked\n- a\nMethod / steps\n- c";

    /// 按顺序返回预设回复，并记录收到的请求
    struct Scripted {
        replies: Mutex<Vec<&'static str>>,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl Scripted {
        fn new(replies: &[&'static str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().copied().collect()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn invoke(&self, request: &GenerationRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.replies.lock().unwrap().pop().unwrap_or_default().to_string())
        }
    }

    fn unit() -> Unit {
        Unit::new(vec![Segment::Number(1)], "Find x when 2x = 6.")
    }

    async fn run_with(generator: Arc<Scripted>) -> (Option<AcceptedOutput>, usize) {
        let llm = LlmService::new(generator, 5);
        let profile = Tool::ProblemWalkthrough.profile();
        let builder = PromptBuilder::new(profile, profile.budgets, 6, GenerationOptions::default());
        let gate = QualityGate::new(
            profile.sections.iter().map(|s| s.marker.to_string()).collect(),
            6,
            20,
        );
        let flow = UnitFlow::new(&llm, &builder, &gate, true);
        let ctx = UnitCtx::new(1, 1, 1, "Problem 1".to_string());
        let result = flow.run(&unit(), &ctx).await;
        (result, llm.calls())
    }

    #[tokio::test]
    async fn test_first_attempt_accepted() {
        let (result, calls) = run_with(Arc::new(Scripted::new(&[GOOD]))).await;
        let output = result.unwrap();
        assert_eq!(output.label.as_deref(), Some("Problem 1"));
        assert!(output.text.ends_with("---END---"));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_retry_uses_escalated_prompt() {
        let generator = Arc::new(Scripted::new(&[BAD, GOOD]));
        let (result, calls) = run_with(generator.clone()).await;
        assert!(result.is_some());
        assert_eq!(calls, 2);

        let seen = generator.seen.lock().unwrap();
        assert!(!seen[0].instruction().unwrap().contains("CRITICAL"));
        assert!(seen[1].instruction().unwrap().contains("CRITICAL"));
        assert!(seen[1].output_budget >= seen[0].output_budget);
    }

    #[tokio::test]
    async fn test_dropped_after_one_retry() {
        let (result, calls) = run_with(Arc::new(Scripted::new(&[BAD, BAD, GOOD]))).await;
        assert!(result.is_none());
        assert_eq!(calls, 2);
    }
}
