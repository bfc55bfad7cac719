//! 流程层（Workflow Layer）
//!
//! 定义"一个单元"的完整处理流程：生成 → 闸门 → 升级重试 → 接受或丢弃

pub mod unit_ctx;
pub mod unit_flow;

pub use unit_ctx::UnitCtx;
pub use unit_flow::UnitFlow;
