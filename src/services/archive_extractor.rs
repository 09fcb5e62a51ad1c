//! 压缩包解压服务 - 业务能力层
//!
//! 只负责"把 ZIP 解压到独立临时目录并列出文件"，不关心后续流程

use crate::error::{AppError, AppResult};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{info, warn};
use zip::ZipArchive;

/// 临时目录前缀
const WORKSPACE_PREFIX: &str = "zip_extract_";

/// 解压结果
///
/// `workspace` 被丢弃时临时目录随之删除，由调用方决定其生命周期
#[derive(Debug)]
pub struct Extraction {
    pub workspace: TempDir,
    pub files: Vec<PathBuf>,
}

impl Extraction {
    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }
}

/// 解压到系统临时目录
pub fn extract(archive_path: &Path) -> AppResult<Extraction> {
    extract_in(archive_path, &std::env::temp_dir())
}

/// 解压到 `base_dir` 下新建的临时目录
///
/// 每次调用都会创建新的目录，多个运行并发时互不干扰。
/// 逃逸出目录的条目（绝对路径、`..`）会被跳过。
pub fn extract_in(archive_path: &Path, base_dir: &Path) -> AppResult<Extraction> {
    let invalid = |source| AppError::InvalidArchive {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = File::open(archive_path).map_err(|e| AppError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(invalid)?;

    let workspace = tempfile::Builder::new()
        .prefix(WORKSPACE_PREFIX)
        .tempdir_in(base_dir)
        .map_err(|e| AppError::io(base_dir, e))?;

    let mut files = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(invalid)?;

        let entry_path = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => {
                warn!("跳过不安全的压缩包条目: {}", entry.name());
                continue;
            }
        };

        let output_path = workspace.path().join(&entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&output_path).map_err(|e| AppError::io(&output_path, e))?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
        }

        let mut outfile = File::create(&output_path).map_err(|e| AppError::io(&output_path, e))?;
        std::io::copy(&mut entry, &mut outfile).map_err(|e| {
            // 条目数据损坏时 zip 的读取器以 io::Error 形式报告
            if e.kind() == std::io::ErrorKind::InvalidData {
                invalid(zip::result::ZipError::Io(e))
            } else {
                AppError::io(&output_path, e)
            }
        })?;

        files.push(output_path);
    }

    info!(
        "✓ ZIP 文件已解压到: {} ({} 个文件)",
        workspace.path().display(),
        files.len()
    );

    Ok(Extraction { workspace, files })
}
