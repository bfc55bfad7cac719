//! 文本生成后端接口
//!
//! 生成后端对流水线来说是不透明的：带角色的提示词进，文本出，可能失败或超时

use anyhow::Result;
use async_trait::async_trait;

use crate::models::generation::GenerationRequest;

/// 文本生成后端
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 执行一次生成
    ///
    /// 返回的文本可能为空，也可能不符合格式，调用方必须自己校验
    async fn invoke(&self, request: &GenerationRequest) -> Result<String>;

    /// 后端名称（用于日志）
    fn name(&self) -> &str {
        "generator"
    }
}
