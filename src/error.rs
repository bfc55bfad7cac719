use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入材料错误（用户可修正）
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// 工具访问限制
    #[error("访问错误: {0}")]
    Access(#[from] AccessError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 所有降级策略都失败
    #[error("生成错误: {0}")]
    Generation(#[from] GenerationError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 输入材料错误
#[derive(Debug, Error)]
pub enum InputError {
    /// 没有提供材料
    #[error("没有提供学习材料")]
    EmptyMaterial,
    /// 材料太短（含 PDF 提取结果几乎为空的情况）
    #[error("材料内容太短: {chars} 个有效字符，至少需要 {min} 个")]
    MaterialTooShort { chars: usize, min: usize },
    /// 未知工具
    #[error("未知的工具: {name}")]
    UnknownTool { name: String },
}

/// 工具访问限制
#[derive(Debug, Error)]
pub enum AccessError {
    /// 该工具仅对高级用户开放
    #[error("工具 {tool} 仅对高级用户开放")]
    PrivilegedToolRequired { tool: String },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 调用超时
    #[error("LLM调用超时 ({secs} 秒)")]
    Timeout { secs: u64 },
}

/// 生成错误
#[derive(Debug, Error)]
pub enum GenerationError {
    /// 逐单元、整篇挽救、合成兜底全部失败
    #[error("所有生成策略均失败")]
    Exhausted,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少后端凭证
    #[error("缺少 LLM 凭证: 请设置环境变量 {var_name}")]
    MissingCredentials { var_name: String },
    /// 配置值不合法
    #[error("配置项 {name} 的值 '{value}' 不合法: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// PDF 文本提取失败
    #[error("PDF文本提取失败: {source}")]
    PdfExtractFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
}

// ========== 从常见错误类型转换 ==========

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Other(format!("{:#}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建材料太短错误
    pub fn material_too_short(chars: usize, min: usize) -> Self {
        AppError::Input(InputError::MaterialTooShort { chars, min })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 是否是用户可修正的错误（输入或访问限制）
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, AppError::Input(_) | AppError::Access(_))
    }

    /// 返回给调用方的错误文本
    pub fn user_message(&self) -> String {
        match self {
            AppError::Input(e) => e.to_string(),
            AppError::Access(e) => e.to_string(),
            _ => "生成失败，请稍后重试".to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_user_facing() {
        let err = AppError::material_too_short(12, 80);
        assert!(err.is_user_correctable());
        assert!(err.user_message().contains("12"));
    }

    #[test]
    fn test_backend_errors_are_hidden() {
        let err: AppError = LlmError::Timeout { secs: 30 }.into();
        assert!(!err.is_user_correctable());
        assert_eq!(err.user_message(), "生成失败，请稍后重试");
        assert!(err.to_string().contains("30"));
    }
}
