//! 生成请求模型

use serde::{Deserialize, Serialize};

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Developer,
    User,
}

/// 一段带角色的提示词
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSegment {
    pub role: Role,
    pub text: String,
}

impl RoleSegment {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
        }
    }

    pub fn developer(text: impl Into<String>) -> Self {
        Self {
            role: Role::Developer,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }
}

/// 一次生成调用的完整输入
///
/// 首次尝试和重试只在 developer 段（指令段）的内容上不同
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub role_segments: Vec<RoleSegment>,
    /// 输出长度上限（token）
    pub output_budget: u32,
}

impl GenerationRequest {
    pub fn new(role_segments: Vec<RoleSegment>, output_budget: u32) -> Self {
        Self {
            role_segments,
            output_budget,
        }
    }

    /// 指令段（第一个 developer 段）的文本
    pub fn instruction(&self) -> Option<&str> {
        self.role_segments
            .iter()
            .find(|s| s.role == Role::Developer)
            .map(|s| s.text.as_str())
    }

    /// 所有段落的字符总数（用于日志）
    pub fn prompt_chars(&self) -> usize {
        self.role_segments.iter().map(|s| s.text.chars().count()).sum()
    }
}
