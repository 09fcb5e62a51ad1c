//! 输入描述
//!
//! 在任何实际工作开始之前判定输入是单张图像还是压缩包

use crate::error::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// 可识别的图像扩展名（小写，不含点）
pub const VALID_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "tif", "tiff", "svs", "dat"];

/// 压缩包扩展名
pub const ARCHIVE_EXTENSION: &str = "zip";

/// 输入类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    /// 单张图像
    Image(PathBuf),
    /// ZIP 压缩包
    Archive(PathBuf),
}

impl InputSpec {
    /// 根据扩展名判定输入类型
    ///
    /// 路径会被转换为绝对路径；文件不存在或扩展名不受支持时直接返回错误。
    pub fn classify(path: &Path) -> AppResult<Self> {
        let path = std::path::absolute(path).map_err(|e| AppError::io(path, e))?;

        if !path.is_file() {
            return Err(AppError::InputNotFound { path });
        }

        let extension = lowercase_extension(&path).unwrap_or_default();
        if extension == ARCHIVE_EXTENSION {
            Ok(InputSpec::Archive(path))
        } else if is_image(&path) {
            Ok(InputSpec::Image(path))
        } else {
            Err(AppError::UnsupportedInput {
                path,
                extension,
                supported: VALID_EXTENSIONS.join(", "),
            })
        }
    }
}

/// 扩展名是否属于可识别的图像类型（不区分大小写）
pub fn is_image(path: &Path) -> bool {
    lowercase_extension(path)
        .map(|ext| VALID_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}
