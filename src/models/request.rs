//! 请求模型

use serde::{Deserialize, Serialize};

use crate::models::tool::Tier;

/// 选项文本的最大长度（字符）
const MAX_OPTION_CHARS: usize = 200;

/// 调用方提供的生成选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// 考试类型，如 "midterm"
    #[serde(default)]
    pub exam_type: Option<String>,
    /// 老师强调的重点
    #[serde(default)]
    pub prof_emphasis: Option<String>,
    #[serde(default)]
    pub tier: Tier,
}

impl GenerationOptions {
    /// 规范化：去空白、空串变 None、截断过长文本
    pub fn normalized(self) -> Self {
        Self {
            exam_type: clean_option(self.exam_type),
            prof_emphasis: clean_option(self.prof_emphasis),
            tier: self.tier,
        }
    }
}

fn clean_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_OPTION_CHARS).collect())
}

/// 一个待处理的请求文件（TOML）
///
/// ```toml
/// material_file = "hw3.pdf"
/// tool = "homework"
/// tier = "free"
/// exam_type = "midterm"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyRequest {
    /// 直接粘贴的材料
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    /// 材料文件路径（相对请求文件所在目录），`.pdf` 走文本提取
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_file: Option<String>,
    pub tool: String,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prof_emphasis: Option<String>,
    /// 用量统计的会话键
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

impl StudyRequest {
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            exam_type: self.exam_type.clone(),
            prof_emphasis: self.prof_emphasis.clone(),
            tier: self.tier,
        }
    }

    /// 用于日志和输出文件名的名称
    pub fn name(&self) -> String {
        self.file_path
            .as_deref()
            .and_then(|p| std::path::Path::new(p).file_stem())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "request".to_string())
    }
}
