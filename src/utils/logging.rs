//! 日志工具模块
//!
//! 提供日志初始化、运行日志文件和格式化输出的辅助函数

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 订阅者
///
/// 日志级别由 `RUST_LOG` 控制，默认 `info`。重复调用不会报错。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化运行日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n学习材料生成日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path))?;
    Ok(())
}

/// 向运行日志追加一行，带时间戳
pub fn append_log_line(log_file_path: &str, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        line
    )?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `max_concurrent`: 同时处理的请求数
/// - `model_name`: 使用的模型
pub fn log_startup(max_concurrent: usize, model_name: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 学习材料批量生成模式");
    info!("🤖 模型: {}", model_name);
    info!("📊 最大并发请求数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录请求加载信息
pub fn log_requests_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 个待处理的请求", total);
    info!("📋 最多同时处理 {} 个\n", max_concurrent);
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(success: usize, failed: usize, total: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("一二三四", 2), "一二...");
    }

    #[test]
    fn test_log_file_header_and_append() {
        let path = std::env::temp_dir().join(format!("study_guide_gen_log_{}.txt", std::process::id()));
        let path = path.to_str().unwrap();

        init_log_file(path).unwrap();
        append_log_line(path, "request-a: ok").unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("学习材料生成日志"));
        assert!(content.trim_end().ends_with("request-a: ok"));
        let _ = std::fs::remove_file(path);
    }
}
