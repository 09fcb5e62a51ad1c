//! 子进程执行 - 基础设施层
//!
//! 启动外部进程、收集 stdout/stderr、可选超时

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

/// 每个输出流最多保留的字节数（1 MiB）
const MAX_OUTPUT_BYTES: u64 = 1024 * 1024;

/// 子进程执行结果
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// 失败时用于日志的诊断信息：优先 stderr，其次 stdout，最后退出码
    pub fn diagnostics(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        self.status.to_string()
    }
}

/// 子进程执行错误
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("无法启动进程 {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("等待进程 {program} 失败: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("进程 {program} 超时 ({}s)，已终止", elapsed.as_secs())]
    Timeout { program: String, elapsed: Duration },
}

/// 运行命令并收集输出
///
/// `timeout` 为 `None` 时一直等待进程结束；超时后子进程随 `kill_on_drop` 被终止。
pub async fn run_command(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<CommandOutput, ProcessError> {
    debug!("执行命令: {} {}", program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let start = Instant::now();

    // 在独立任务中读取输出，避免管道写满导致子进程阻塞
    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(waited) => waited,
            Err(_) => {
                return Err(ProcessError::Timeout {
                    program: program.to_string(),
                    elapsed: start.elapsed(),
                })
            }
        },
        None => child.wait().await,
    }
    .map_err(|source| ProcessError::Wait {
        program: program.to_string(),
        source,
    })?;

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    Ok(CommandOutput {
        status,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        elapsed: start.elapsed(),
    })
}

/// 读取输出流：保留前 `MAX_OUTPUT_BYTES` 字节，其余读到 EOF 后丢弃
///
/// 管道必须一直读到子进程关闭为止，提前关闭会让子进程收到 SIGPIPE
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h).take(MAX_OUTPUT_BYTES).read_to_end(&mut buf).await;
        let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    }
    buf
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_run_command_captures_output() {
        let output = run_command("sh", &sh("echo hello; echo oops >&2"), None)
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_large_output_is_truncated_without_failing() {
        // 2 MiB 写到 stdout，超过保留上限
        let output = run_command("sh", &sh("exec dd if=/dev/zero bs=65536 count=32"), None)
            .await
            .unwrap();
        assert!(output.success(), "status: {}", output.status);
        assert_eq!(output.stdout.len() as u64, MAX_OUTPUT_BYTES);
    }

    #[tokio::test]
    async fn test_diagnostics_prefers_stderr() {
        let output = run_command("sh", &sh("echo partial; echo broken >&2; exit 3"), None)
            .await
            .unwrap();
        assert!(!output.success());
        assert_eq!(output.diagnostics(), "broken");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = run_command("definitely-not-a-real-program-xyz", &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let err = run_command("sh", &sh("sleep 5"), Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
    }
}
