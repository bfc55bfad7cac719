//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责请求调度和降级策略，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量请求处理器
//! - 管理应用生命周期（初始化、运行）
//! - 请求边界校验（材料长度、工具访问限制）
//! - 批量加载请求文件，控制并发数量（Semaphore）
//! - 写出结果文件，输出全局统计信息
//!
//! ### `document_processor` - 单个文档处理器
//! - 显式状态机：CHUNK → FANOUT → {JOIN | SALVAGE} → {JOIN | FALLBACK} → JOIN
//! - 按用户等级截取单元，有界并发调用 `UnitFlow`
//! - 按分块顺序收集输出并拼接
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<StudyRequest>)
//!     ↓
//! document_processor (处理 Vec<Unit>)
//!     ↓
//! workflow::UnitFlow (处理单个 Unit)
//!     ↓
//! services (能力层：chunker / gate / llm / joiner)
//!     ↓
//! clients (生成后端：TextGenerator)
//! ```

pub mod batch_processor;
pub mod document_processor;

// 重新导出主要类型
pub use batch_processor::{App, GenerateResponse};
pub use document_processor::{DocumentProcessor, PipelineState};
