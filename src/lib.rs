//! # Study Guide Gen
//!
//! 把非结构化的学习材料（粘贴文本或 PDF 提取文本）切分成题目单元，
//! 逐单元调用生成模型，产出结构化的学习文档
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 生成后端，只暴露"提示词进，文本出"能力
//! - `TextGenerator` - 后端接口，`OpenAiGenerator` 为 OpenAI 兼容实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，都是无流程的单一能力
//! - `Chunker` - 材料分块
//! - `label` - 单元标签
//! - `QualityGate` - 结构检查
//! - `LlmService` - 带超时的生成调用
//! - `FallbackWriter` / `join` - 兜底文档与拼接
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个单元"的完整处理流程
//! - `UnitCtx` - 上下文封装（请求索引 + 单元标签）
//! - `UnitFlow` - 流程编排（生成 → 闸门 → 升级重试）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 应用入口，请求校验与批量调度
//! - `orchestrator/document_processor` - 单个文档的降级状态机
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{OpenAiGenerator, TextGenerator};
pub use config::{Config, PipelineConfig};
pub use error::{AppError, AppResult};
pub use models::{FinalDocument, GenerationOptions, Strategy, Tier, Tool, Unit, SENTINEL};
pub use orchestrator::{App, DocumentProcessor, GenerateResponse, PipelineState};
pub use workflow::{UnitCtx, UnitFlow};
