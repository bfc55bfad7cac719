//! 单元处理上下文
//!
//! 封装"我正在处理哪个请求的第几个单元"这一信息

use std::fmt::Display;

/// 单元处理上下文
#[derive(Debug, Clone)]
pub struct UnitCtx {
    /// 请求索引（仅用于日志显示）
    pub request_index: usize,

    /// 单元在分块结果中的位置（从1开始）
    pub unit_index: usize,

    /// 本次处理的单元总数
    pub total_units: usize,

    /// 单元标签，如 `1(a)(ii)`
    pub label: String,
}

impl UnitCtx {
    pub fn new(request_index: usize, unit_index: usize, total_units: usize, label: String) -> Self {
        Self {
            request_index,
            unit_index,
            total_units,
            label,
        }
    }
}

impl Display for UnitCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[请求 {}] [单元 {} {}/{}]",
            self.request_index, self.label, self.unit_index, self.total_units
        )
    }
}
