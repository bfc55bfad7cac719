use crate::error::FileError;
use crate::models::request::StudyRequest;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载一个请求
pub async fn load_request(toml_file_path: &Path) -> Result<StudyRequest> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let mut request: StudyRequest =
        toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
            path: toml_file_path.display().to_string(),
            source,
        })?;

    // 设置文件路径
    request.file_path = Some(toml_file_path.to_string_lossy().to_string());

    Ok(request)
}

/// 从文件夹中加载所有请求，按文件名排序
///
/// 单个文件解析失败只记录警告，不影响其他文件
pub async fn load_all_requests(folder_path: &str) -> Result<Vec<StudyRequest>> {
    let folder = PathBuf::from(folder_path);

    if !folder.is_dir() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut requests = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_request(&path).await {
            Ok(request) => requests.push(request),
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(requests)
}

/// 请求里 `material_file` 的实际路径（相对请求文件所在目录）
pub fn material_path(request: &StudyRequest) -> Option<PathBuf> {
    let file = request.material_file.as_deref()?;
    let file = Path::new(file);
    if file.is_absolute() {
        return Some(file.to_path_buf());
    }
    let base = request
        .file_path
        .as_deref()
        .and_then(|p| Path::new(p).parent())
        .unwrap_or_else(|| Path::new("."));
    Some(base.join(file))
}
