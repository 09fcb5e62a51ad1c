use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
///
/// 致命错误（压缩包损坏、工具不可用、输入不支持）直接中止整个运行；
/// `ToolExecution` 只影响单个任务，由分发器记录后跳过。
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入文件不存在
    #[error("输入文件不存在: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// 输入文件类型不支持
    #[error("不支持的输入文件类型 '{extension}' ({}), 仅支持 .zip 或 {supported}", path.display())]
    UnsupportedInput {
        path: PathBuf,
        extension: String,
        supported: String,
    },

    /// 压缩包无效
    #[error("无效的 ZIP 文件 ({}): {source}", path.display())]
    InvalidArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// 外部工具镜像不可用
    #[error("无法获取外部工具镜像 {image}: {reason}")]
    ToolUnavailable { image: String, reason: String },

    /// 外部工具执行失败
    #[error("外部工具处理失败 ({}): {diagnostics}", image_path.display())]
    ToolExecution {
        image_path: PathBuf,
        diagnostics: String,
    },

    /// 配置错误
    #[error("配置错误 ({}): {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    /// 写入输出压缩包失败
    #[error("写入压缩包失败 ({}): {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// 后台任务异常退出
    #[error("后台任务异常退出: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// 文件操作错误
    #[error("文件操作失败 ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件操作错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// 创建外部工具执行错误
    pub fn tool_execution(image_path: impl Into<PathBuf>, diagnostics: impl Into<String>) -> Self {
        AppError::ToolExecution {
            image_path: image_path.into(),
            diagnostics: diagnostics.into(),
        }
    }

    /// 创建工具不可用错误
    pub fn tool_unavailable(image: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::ToolUnavailable {
            image: image.into(),
            reason: reason.into(),
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
    fn test_tool_execution_message_names_image() {
        let err = AppError::tool_execution("/tmp/b.svs", "exit status 1");
        assert!(err.to_string().contains("b.svs"));
        assert!(err.to_string().contains("exit status 1"));
    }

    #[test]
    fn test_unsupported_input_lists_extensions() {
        let err = AppError::UnsupportedInput {
            path: PathBuf::from("notes.txt"),
            extension: "txt".to_string(),
            supported: "png, svs".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'txt'"));
        assert!(msg.contains("png, svs"));
    }
}
