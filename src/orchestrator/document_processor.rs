//! 单个文档处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责把一份材料变成一份最终文档，是请求级别的编排器。
//!
//! ## 状态机
//!
//! ```text
//! CHUNK → FANOUT ──有输出──────────────→ JOIN
//!            └──无输出→ SALVAGE ──通过──→ JOIN
//!                          └──不通过→ FALLBACK → JOIN
//! ```
//!
//! - **FANOUT**：按用户等级截取前 N 个单元，有界并发处理，按分块顺序收集
//! - **SALVAGE**：整篇材料一次请求，要求至少覆盖两道题
//! - **FALLBACK**：只用正则扫描出的标签合成通用指导，不会失败
//!
//! 扇出不使用 `tokio::spawn`，请求 future 被丢弃时所有进行中的调用一并取消。

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::clients::TextGenerator;
use crate::config::PipelineConfig;
use crate::error::ConfigError;
use crate::models::document::{AcceptedOutput, FinalDocument, Strategy};
use crate::models::request::GenerationOptions;
use crate::models::tool::Tool;
use crate::models::unit::Unit;
use crate::services::{join, label, Chunker, FallbackWriter, LlmService, PromptBuilder, QualityGate};
use crate::workflow::{UnitCtx, UnitFlow};

/// 编排状态
#[derive(Debug)]
pub enum PipelineState {
    /// 分块
    Chunk,
    /// 逐单元扇出
    FanOut(Vec<Unit>),
    /// 整篇挽救
    Salvage,
    /// 合成兜底
    Fallback,
    /// 拼接（终态）
    Join {
        outputs: Vec<AcceptedOutput>,
        strategy: Strategy,
    },
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Chunk => write!(f, "CHUNK"),
            PipelineState::FanOut(units) => write!(f, "FANOUT({} 个单元)", units.len()),
            PipelineState::Salvage => write!(f, "SALVAGE"),
            PipelineState::Fallback => write!(f, "FALLBACK"),
            PipelineState::Join { outputs, strategy } => {
                write!(f, "JOIN({}，{} 个输出)", strategy, outputs.len())
            }
        }
    }
}

/// 文档处理器
///
/// 持有生成后端的共享引用和流水线配置，本身无可变状态，可被多个请求共用
pub struct DocumentProcessor {
    generator: Arc<dyn TextGenerator>,
    config: PipelineConfig,
    verbose_logging: bool,
}

impl DocumentProcessor {
    /// 创建处理器，配置在此处校验一次
    pub fn new(generator: Arc<dyn TextGenerator>, config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            generator,
            config,
            verbose_logging: false,
        })
    }

    pub fn with_verbose_logging(mut self, verbose: bool) -> Self {
        self.verbose_logging = verbose;
        self
    }

    /// 处理一份材料
    ///
    /// # 参数
    /// - `request_index`: 请求索引（用于日志）
    /// - `raw`: 原始材料
    /// - `tool`: 生成的产物类型
    /// - `options`: 已规范化的生成选项
    ///
    /// # 返回
    /// 总是返回一份以结束标记结尾的文档
    pub async fn generate(
        &self,
        request_index: usize,
        raw: &str,
        tool: Tool,
        options: &GenerationOptions,
    ) -> FinalDocument {
        let profile = tool.profile();
        let budgets = self.config.budgets_for(tool);
        let cap = self.config.unit_cap(options.tier);

        // 每个请求独立的调用计数
        let llm_service = LlmService::new(self.generator.clone(), self.config.llm_timeout_secs);
        let prompt_builder =
            PromptBuilder::new(profile, budgets, self.config.gate_min_bullets, options.clone());
        let gate = QualityGate::for_tool(&profile, &self.config);
        let flow = UnitFlow::new(&llm_service, &prompt_builder, &gate, self.verbose_logging);

        let mut state = PipelineState::Chunk;
        loop {
            info!("[请求 {}] ▶ {}", request_index, state);

            state = match state {
                PipelineState::Chunk => {
                    let units = Chunker::from_config(&self.config).chunk(raw);
                    info!("[请求 {}] ✓ 分块完成，共 {} 个单元", request_index, units.len());
                    PipelineState::FanOut(units)
                }

                PipelineState::FanOut(mut units) => {
                    if units.len() > cap {
                        warn!(
                            "[请求 {}] 单元数 {} 超过上限 {}，只处理前 {} 个",
                            request_index,
                            units.len(),
                            cap,
                            cap
                        );
                        units.truncate(cap);
                    }

                    let outputs = self.fan_out(request_index, &units, &flow).await;
                    if outputs.is_empty() {
                        warn!("[请求 {}] ⚠️ 没有单元通过质量检查，转入整篇挽救", request_index);
                        PipelineState::Salvage
                    } else {
                        info!(
                            "[请求 {}] ✓ {}/{} 个单元通过",
                            request_index,
                            outputs.len(),
                            units.len()
                        );
                        PipelineState::Join {
                            outputs,
                            strategy: Strategy::PerUnit,
                        }
                    }
                }

                PipelineState::Salvage => {
                    let request = prompt_builder.salvage_request(raw);
                    let output = llm_service.generate(&request).await;
                    let report = gate.evaluate(&output);

                    if report.passed() {
                        info!("[请求 {}] ✓ 整篇挽救通过", request_index);
                        PipelineState::Join {
                            outputs: vec![AcceptedOutput::unlabeled(output)],
                            strategy: Strategy::Salvage,
                        }
                    } else {
                        warn!(
                            "[请求 {}] ⚠️ 整篇挽救未通过 ({})，使用兜底文档",
                            request_index,
                            report.summary()
                        );
                        PipelineState::Fallback
                    }
                }

                PipelineState::Fallback => PipelineState::Join {
                    outputs: FallbackWriter::new().compose(raw, &profile, cap),
                    strategy: Strategy::Fallback,
                },

                PipelineState::Join { outputs, strategy } => {
                    let pieces: Vec<String> = outputs.iter().map(AcceptedOutput::render).collect();
                    // 兜底文档的开头说明不算小节
                    let accepted_units = match strategy {
                        Strategy::Fallback => outputs.iter().filter(|o| o.label.is_some()).count(),
                        _ => outputs.len(),
                    };
                    let document = FinalDocument {
                        text: join(&pieces),
                        strategy,
                        accepted_units,
                        generation_calls: llm_service.calls(),
                    };
                    info!(
                        "[请求 {}] ✅ 完成：策略 {}，调用 {} 次",
                        request_index, document.strategy, document.generation_calls
                    );
                    return document;
                }
            };
        }
    }

    /// 有界并发处理所有单元，结果按分块顺序返回
    async fn fan_out(
        &self,
        request_index: usize,
        units: &[Unit],
        flow: &UnitFlow<'_>,
    ) -> Vec<AcceptedOutput> {
        let semaphore = Semaphore::new(self.config.max_concurrent_units);
        let semaphore = &semaphore;
        let total = units.len();

        let tasks = units.iter().enumerate().map(move |(index, unit)| async move {
            let _permit = semaphore.acquire().await.ok()?;
            let ctx = UnitCtx::new(request_index, index + 1, total, label(unit));
            flow.run(unit, &ctx).await
        });

        // join_all 按输入顺序返回，与完成顺序无关
        join_all(tasks).await.into_iter().flatten().collect()
    }
}
