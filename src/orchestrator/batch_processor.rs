//! 批量请求处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责请求边界上的校验和批量请求的调度。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、初始化运行日志、创建生成后端
//! 2. **请求校验**：材料长度、工具名称、工具访问限制，全部在第一次生成调用之前完成
//! 3. **批量加载**：扫描并加载所有待处理的请求文件
//! 4. **并发控制**：使用 Semaphore 限制同时处理的请求数量
//! 5. **结果输出**：每个请求写一个输出文件，汇总统计
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单元的细节，委托 `DocumentProcessor`
//! - **依赖注入**：生成后端、文本提取、用量统计都通过 trait 注入

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clients::{OpenAiGenerator, TextGenerator};
use crate::config::Config;
use crate::error::{AccessError, AppError, AppResult, FileError, GenerationError, InputError};
use crate::models::document::{FinalDocument, SENTINEL};
use crate::models::loaders::{load_all_requests, material_path};
use crate::models::request::{GenerationOptions, StudyRequest};
use crate::models::tool::Tool;
use crate::models::unit::non_whitespace_chars;
use crate::orchestrator::document_processor::DocumentProcessor;
use crate::services::{
    InMemoryUsageStore, PdfTextExtractor, PlainTextExtractor, TextExtractor, UsageStore,
};
use crate::utils::logging::{
    append_log_line, init_log_file, log_requests_loaded, log_startup, print_final_stats,
};

/// 没有会话键时使用的用量统计键
const ANONYMOUS_SESSION: &str = "anonymous";

/// 返回给调用方的结果：`{ "output": ... }` 或 `{ "error": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerateResponse {
    Output { output: String },
    Error { error: String },
}

impl From<AppResult<FinalDocument>> for GenerateResponse {
    fn from(result: AppResult<FinalDocument>) -> Self {
        match result {
            Ok(document) => GenerateResponse::Output {
                output: document.text,
            },
            Err(e) => GenerateResponse::Error {
                error: e.user_message(),
            },
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    processor: DocumentProcessor,
    pdf_extractor: Arc<dyn TextExtractor>,
    usage_store: Arc<dyn UsageStore>,
}

impl App {
    /// 初始化应用
    ///
    /// 配置不合法时直接失败
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate().context("配置校验失败")?;

        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(config.max_concurrent_requests, &config.llm_model_name);

        let generator = Arc::new(OpenAiGenerator::new(&config));
        let app = Self::with_backend(
            config,
            generator,
            Arc::new(PdfTextExtractor::new()),
            Arc::new(InMemoryUsageStore::new()),
        )?;
        Ok(app)
    }

    /// 使用指定的后端创建应用
    ///
    /// 只校验流水线配置和请求并发数，不要求 LLM 凭证
    pub fn with_backend(
        config: Config,
        generator: Arc<dyn TextGenerator>,
        pdf_extractor: Arc<dyn TextExtractor>,
        usage_store: Arc<dyn UsageStore>,
    ) -> AppResult<Self> {
        config.validate_limits()?;
        let processor = DocumentProcessor::new(generator, config.pipeline.clone())?
            .with_verbose_logging(config.verbose_logging);
        Ok(Self {
            config,
            processor,
            pdf_extractor,
            usage_store,
        })
    }

    /// 处理一份材料并返回调用方格式的结果
    pub async fn generate(
        &self,
        material_text: &str,
        tool: &str,
        options: GenerationOptions,
    ) -> GenerateResponse {
        self.generate_document(0, material_text, tool, options, ANONYMOUS_SESSION)
            .await
            .into()
    }

    /// 处理一份材料
    ///
    /// # 参数
    /// - `request_index`: 请求索引（用于日志）
    /// - `material_text`: 原始材料
    /// - `tool`: 工具名称或别名
    /// - `options`: 生成选项（在此处规范化）
    /// - `session`: 用量统计的会话键
    pub async fn generate_document(
        &self,
        request_index: usize,
        material_text: &str,
        tool: &str,
        options: GenerationOptions,
        session: &str,
    ) -> AppResult<FinalDocument> {
        let options = options.normalized();

        // ========== 输入校验（不调用后端） ==========
        if material_text.trim().is_empty() {
            return Err(InputError::EmptyMaterial.into());
        }
        let chars = non_whitespace_chars(material_text);
        let min = self.config.pipeline.min_material_chars;
        if chars < min {
            return Err(AppError::material_too_short(chars, min));
        }

        let tool = Tool::from_str(tool).ok_or_else(|| InputError::UnknownTool {
            name: tool.to_string(),
        })?;

        if tool.profile().privileged_only && !options.tier.is_privileged() {
            return Err(AccessError::PrivilegedToolRequired {
                tool: tool.to_string(),
            }
            .into());
        }

        let used = self.usage_store.increment(session);
        info!(
            "[请求 {}] 📝 工具: {}，等级: {:?}，材料 {} 字符，会话 {} 第 {} 次",
            request_index, tool, options.tier, chars, session, used
        );

        // ========== 生成 ==========
        let document = self
            .processor
            .generate(request_index, material_text, tool, &options)
            .await;

        if document.text.trim() == SENTINEL {
            return Err(GenerationError::Exhausted.into());
        }

        Ok(document)
    }

    /// 处理一个请求文件
    pub async fn process_request(
        &self,
        request_index: usize,
        request: &StudyRequest,
    ) -> AppResult<FinalDocument> {
        let material = self.load_material(request).await?;
        let session = request.session.as_deref().unwrap_or(ANONYMOUS_SESSION);
        self.generate_document(request_index, &material, &request.tool, request.options(), session)
            .await
    }

    /// 读取请求的材料：内联文本优先，其次是材料文件
    async fn load_material(&self, request: &StudyRequest) -> AppResult<String> {
        if let Some(material) = &request.material {
            return Ok(material.clone());
        }

        let Some(path) = material_path(request) else {
            return Err(InputError::EmptyMaterial.into());
        };

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

        let extractor: Arc<dyn TextExtractor> = if is_pdf(&path) {
            self.pdf_extractor.clone()
        } else {
            Arc::new(PlainTextExtractor)
        };

        // PDF 解析是 CPU 密集操作
        let text = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| AppError::Other(format!("文本提取任务失败: {}", e)))??;

        Ok(text)
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        // 加载所有待处理的请求
        info!("\n📁 正在扫描待处理的请求...");
        let requests = load_all_requests(&self.config.request_folder).await?;

        if requests.is_empty() {
            warn!("⚠️ 没有找到待处理的TOML文件，程序结束");
            return Ok(());
        }

        let total = requests.len();
        log_requests_loaded(total, self.config.max_concurrent_requests);

        let output_folder = PathBuf::from(&self.config.output_folder);
        tokio::fs::create_dir_all(&output_folder)
            .await
            .with_context(|| format!("无法创建输出目录: {}", output_folder.display()))?;

        let semaphore = Semaphore::new(self.config.max_concurrent_requests);
        let semaphore = &semaphore;
        let output_folder = output_folder.as_path();

        let tasks = requests.iter().enumerate().map(move |(idx, request)| async move {
            let _permit = semaphore.acquire().await?;
            self.run_one(idx + 1, request, output_folder).await
        });

        let mut success = 0;
        let mut failed = 0;
        for result in join_all(tasks).await {
            match result {
                Ok(true) => success += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    error!("请求执行失败: {:#}", e);
                    failed += 1;
                }
            }
        }

        print_final_stats(success, failed, total, &self.config.output_log_file);
        Ok(())
    }

    /// 处理一个请求并写出结果文件
    ///
    /// # 返回
    /// 是否成功生成
    async fn run_one(
        &self,
        request_index: usize,
        request: &StudyRequest,
        output_folder: &Path,
    ) -> Result<bool> {
        let name = request.name();
        info!("[请求 {}] 📄 开始处理: {}", request_index, name);

        let (path, content, log_line, ok) = match self.process_request(request_index, request).await
        {
            Ok(document) => {
                info!(
                    "[请求 {}] ✓ {} 完成（{}，{} 个小节）",
                    request_index, name, document.strategy, document.accepted_units
                );
                (
                    output_folder.join(format!("{}.txt", name)),
                    document.text,
                    format!(
                        "{}: {} / {} 个小节 / {} 次调用",
                        name, document.strategy, document.accepted_units, document.generation_calls
                    ),
                    true,
                )
            }
            Err(e) => {
                if e.is_user_correctable() {
                    warn!("[请求 {}] ⚠️ {} 被拒绝: {}", request_index, name, e);
                } else {
                    error!("[请求 {}] ❌ {} 失败: {}", request_index, name, e);
                }
                (
                    output_folder.join(format!("{}.error.txt", name)),
                    e.user_message(),
                    format!("{}: 失败 - {}", name, e),
                    false,
                )
            }
        };

        tokio::fs::write(&path, content)
            .await
            .map_err(|source| FileError::WriteFailed {
                path: path.display().to_string(),
                source: Box::new(source),
            })?;

        if let Err(e) = append_log_line(&self.config.output_log_file, &log_line) {
            warn!("写入运行日志失败: {:#}", e);
        }

        Ok(ok)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
