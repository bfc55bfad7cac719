//! 材料文本提取 - 业务能力层
//!
//! 字节进，文本出。提取结果可能为空或乱码，是否可用由编排层的长度检查决定

use anyhow::Result;
use tracing::warn;

use crate::error::FileError;

/// 从上传文件中提取纯文本
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// PDF 文本提取（pdf-extract）
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
            FileError::PdfExtractFailed {
                source: e.to_string().into(),
            }
        })?;

        // 扫描件通常提取不到文字
        if text.trim().is_empty() {
            warn!("⚠️ PDF 中没有提取到文本，可能是扫描件");
        }

        Ok(text)
    }
}

/// 纯文本文件，按 UTF-8 宽松解码
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
