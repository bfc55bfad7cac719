//! 输出文档模型

use serde::{Deserialize, Serialize};
use std::fmt;

/// 文档结束标记，每份最终文档末尾恰好出现一次
pub const SENTINEL: &str = "---END---";

/// 通过质量闸门的单元输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedOutput {
    /// 所属单元的标签；整篇挽救输出没有标签
    pub label: Option<String>,
    pub text: String,
}

impl AcceptedOutput {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            text: text.into(),
        }
    }

    pub fn unlabeled(text: impl Into<String>) -> Self {
        Self {
            label: None,
            text: text.into(),
        }
    }

    /// 渲染为最终文档中的一节
    ///
    /// 如果输出首行已经提到了标签，就不再重复加标题
    pub fn render(&self) -> String {
        let Some(label) = &self.label else {
            return self.text.clone();
        };

        let first_line = self
            .text
            .lines()
            .find(|l| !l.trim().is_empty())
            .unwrap_or_default()
            .to_lowercase();

        if mentions_label(&first_line, &label.to_lowercase()) {
            self.text.clone()
        } else {
            format!("## {}\n\n{}", label, self.text.trim_start())
        }
    }
}

/// 行内是否完整出现了标签：`Problem 1` 不匹配 `Problem 12` 或 `Problem 1(b)`
fn mentions_label(line: &str, label: &str) -> bool {
    line.match_indices(label).any(|(start, found)| {
        let before = line[..start].chars().next_back();
        let after = line[start + found.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric)
            && !after.is_some_and(|c| c.is_alphanumeric() || c == '(')
    })
}

/// 最终文档来自哪一级策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// 逐单元生成
    PerUnit,
    /// 整篇挽救生成
    Salvage,
    /// 合成兜底文档
    Fallback,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::PerUnit => "逐单元",
            Strategy::Salvage => "整篇挽救",
            Strategy::Fallback => "合成兜底",
        };
        write!(f, "{}", name)
    }
}

/// 返回给调用方的最终文档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalDocument {
    /// 以 `---END---` 行结尾的文本
    pub text: String,
    pub strategy: Strategy,
    /// 被接受的小节数量（兜底文档只计带标签的小节）
    pub accepted_units: usize,
    /// 本次请求对生成后端的调用次数
    pub generation_calls: usize,
}
