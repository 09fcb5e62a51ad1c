//! 容器命令行 - 基础设施层
//!
//! 持有容器命令行程序，只暴露"查询镜像 / 拉取镜像 / 运行容器 / 停止容器"的能力

use super::process::{run_command, CommandOutput, ProcessError};
use std::time::Duration;
use tracing::{debug, info};

/// 容器命令行客户端
///
/// 职责：
/// - 持有命令行程序名（默认 `docker`）
/// - 不认识图像 / 切片参数
/// - 不处理业务流程
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// 本地是否已有该镜像
    pub async fn image_exists(&self, image: &str) -> Result<bool, ProcessError> {
        let args = vec!["image".to_string(), "inspect".to_string(), image.to_string()];
        let output = run_command(&self.program, &args, None).await?;
        debug!("镜像 {} 检查结果: {}", image, output.status);
        Ok(output.success())
    }

    /// 拉取镜像
    pub async fn pull(&self, image: &str) -> Result<CommandOutput, ProcessError> {
        info!("📥 正在拉取镜像: {}", image);
        let args = vec!["pull".to_string(), image.to_string()];
        run_command(&self.program, &args, None).await
    }

    /// 运行容器，`args` 为 `docker` 之后的全部参数
    pub async fn run(
        &self,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, ProcessError> {
        info!("🐳 执行命令: {} {}", self.program, args.join(" "));
        run_command(&self.program, args, timeout).await
    }

    /// 强制停止指定名称的容器
    ///
    /// 终止本地命令行进程不会停止守护进程中的容器，超时后需要显式调用
    pub async fn kill(&self, container: &str) -> Result<CommandOutput, ProcessError> {
        info!("🛑 停止容器: {}", container);
        let args = vec!["kill".to_string(), container.to_string()];
        run_command(&self.program, &args, None).await
    }
}
