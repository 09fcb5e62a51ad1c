//! 外部切片工具调用服务 - 业务能力层
//!
//! 只负责"对一张图像运行一次 PyHIST 容器"，不关心并发和打包
//!
//! ## 输出约定
//!
//! 容器把 `<图像目录>` 挂载为 `/pyhist/images`，切片写入
//! `<图像目录>/output/<stem>/<stem>_tiles/*.png`。
//! 该路径由文件名推导而来，工具本身不会返回它。

use crate::config::{Config, TilingParams};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{DockerCli, ProcessError};
use crate::models::ImageJob;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 容器内挂载点
const CONTAINER_MOUNT: &str = "/pyhist/images";

/// 输出根目录名
const OUTPUT_DIR_NAME: &str = "output";

/// 容器名称序号，同一进程内保证唯一
static CONTAINER_SEQ: AtomicU64 = AtomicU64::new(0);

/// 切片工具能力
///
/// 编排层只依赖这个能力，测试中可以替换为假实现
pub trait TileTool: Send + Sync + 'static {
    /// 确保工具在本地可用，失败时返回 `ToolUnavailable`
    fn ensure_available(&self) -> impl Future<Output = AppResult<()>> + Send;

    /// 处理一张图像，返回预期的切片目录；失败时返回 `ToolExecution`
    ///
    /// 不检查切片文件是否真的存在
    fn invoke(&self, job: &ImageJob) -> impl Future<Output = AppResult<PathBuf>> + Send;
}

/// PyHIST 容器调用器
pub struct PyhistInvoker {
    docker: DockerCli,
    image: String,
    platform: String,
    params: TilingParams,
    timeout: Option<Duration>,
}

impl PyhistInvoker {
    pub fn new(config: &Config) -> Self {
        Self {
            docker: DockerCli::new(&config.docker_program),
            image: config.docker_image.clone(),
            platform: config.docker_platform.clone(),
            params: config.tiling.clone(),
            timeout: config.job_timeout_secs.map(Duration::from_secs),
        }
    }

    /// 构建 `docker` 之后的完整参数列表
    pub fn build_args(&self, job: &ImageJob, container: &str) -> Vec<String> {
        let p = &self.params;
        let mut args: Vec<String> = vec![
            "run".into(),
            "--rm".into(),
            "--name".into(),
            container.to_string(),
            "--platform".into(),
            self.platform.clone(),
            "-v".into(),
            format!("{}:{}", job.parent_dir().display(), CONTAINER_MOUNT),
            self.image.clone(),
            "--patch-size".into(),
            p.patch_size.to_string(),
            "--content-threshold".into(),
            p.content_threshold.to_string(),
            "--output-downsample".into(),
            p.output_downsample.to_string(),
            "--borders".into(),
            p.borders.clone(),
            "--corners".into(),
            p.corners.clone(),
            "--percentage-bc".into(),
            p.percentage_bc.to_string(),
            "--k-const".into(),
            p.k_const.to_string(),
            "--minimum_segmentsize".into(),
            p.minimum_segmentsize.to_string(),
        ];

        if p.save_patches {
            args.push("--save-patches".into());
        }
        if p.save_tilecrossed_image {
            args.push("--save-tilecrossed-image".into());
        }

        args.extend([
            "--info".into(),
            p.info.clone(),
            "--output".into(),
            format!("{}/{}", CONTAINER_MOUNT, OUTPUT_DIR_NAME),
            format!("{}/{}", CONTAINER_MOUNT, job.file_name()),
        ]);

        args
    }
}

/// 容器名称：`pyhist-<stem>-<pid>-<序号>`
///
/// 名称只允许 `[a-zA-Z0-9_.-]`，其他字符替换为 `_`
pub fn container_name(job: &ImageJob) -> String {
    let stem: String = job
        .id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let seq = CONTAINER_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("pyhist-{}-{}-{}", stem, std::process::id(), seq)
}

/// 输出根目录：`<图像目录>/output`
pub fn output_root(job: &ImageJob) -> PathBuf {
    job.parent_dir().join(OUTPUT_DIR_NAME)
}

/// 预期的切片目录：`<图像目录>/output/<stem>/<stem>_tiles`
pub fn expected_tile_dir(job: &ImageJob) -> PathBuf {
    output_root(job)
        .join(&job.id)
        .join(format!("{}_tiles", job.id))
}

fn prepare_output_root(job: &ImageJob) -> AppResult<PathBuf> {
    let root = output_root(job);
    std::fs::create_dir_all(&root).map_err(|e| AppError::io(&root, e))?;
    Ok(root)
}

impl PyhistInvoker {
    async fn stop_container(&self, job: &ImageJob, container: &str) {
        match self.docker.kill(container).await {
            Ok(output) if output.success() => {}
            Ok(output) => warn!("{} ⚠️ 停止容器 {} 失败: {}", job, container, output.diagnostics()),
            Err(e) => warn!("{} ⚠️ 停止容器 {} 失败: {}", job, container, e),
        }
    }
}

impl TileTool for PyhistInvoker {
    async fn ensure_available(&self) -> AppResult<()> {
        let unavailable = |e: ProcessError| AppError::tool_unavailable(&self.image, e.to_string());

        if self.docker.image_exists(&self.image).await.map_err(unavailable)? {
            info!("✓ 镜像已存在: {}", self.image);
            return Ok(());
        }

        let output = self.docker.pull(&self.image).await.map_err(unavailable)?;
        if !output.success() {
            error!("拉取镜像失败: {}", output.diagnostics());
            return Err(AppError::tool_unavailable(&self.image, output.diagnostics()));
        }

        info!("✓ 已拉取镜像: {}", self.image);
        Ok(())
    }

    async fn invoke(&self, job: &ImageJob) -> AppResult<PathBuf> {
        prepare_output_root(job)?;

        let container = container_name(job);
        let args = self.build_args(job, &container);
        let output = match self.docker.run(&args, self.timeout).await {
            Ok(output) => output,
            Err(e @ ProcessError::Timeout { .. }) => {
                // 命令行进程已被终止，容器还在守护进程里运行
                self.stop_container(job, &container).await;
                return Err(AppError::tool_execution(&job.image_path, e.to_string()));
            }
            Err(e) => return Err(AppError::tool_execution(&job.image_path, e.to_string())),
        };

        if !output.success() {
            return Err(AppError::tool_execution(&job.image_path, output.diagnostics()));
        }

        info!(
            "{} ✓ PyHIST 执行成功 (耗时 {:.1}s)",
            job,
            output.elapsed.as_secs_f64()
        );
        let tile_dir = expected_tile_dir(job);
        debug!("{} 预期切片目录: {}", job, tile_dir.display());
        Ok(tile_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoker() -> PyhistInvoker {
        PyhistInvoker::new(&Config::default())
    }

    #[test]
    fn test_expected_tile_dir_follows_convention() {
        let job = ImageJob::new("/data/slides/a.svs");
        assert_eq!(
            expected_tile_dir(&job),
            PathBuf::from("/data/slides/output/a/a_tiles")
        );
        assert_eq!(output_root(&job), PathBuf::from("/data/slides/output"));
    }

    #[test]
    fn test_build_args_mounts_parent_and_targets_file() {
        let job = ImageJob::new("/data/slides/a.svs");
        let args = invoker().build_args(&job, "pyhist-a-1-0");

        assert_eq!(&args[..4], &["run", "--rm", "--name", "pyhist-a-1-0"]);
        assert!(args.contains(&"/data/slides:/pyhist/images".to_string()));
        assert!(args.contains(&"mmunozag/pyhist".to_string()));
        assert_eq!(args.last().unwrap(), "/pyhist/images/a.svs");

        let output_pos = args.iter().position(|a| a == "--output").unwrap();
        assert_eq!(args[output_pos + 1], "/pyhist/images/output");
    }

    #[test]
    fn test_container_names_are_unique_and_sanitized() {
        let job = ImageJob::new("/data/case 01+x.svs");
        let first = container_name(&job);
        let second = container_name(&job);

        assert_ne!(first, second);
        assert!(first.starts_with("pyhist-case_01_x-"));
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')));
    }

    #[test]
    fn test_build_args_carries_fixed_parameters() {
        let job = ImageJob::new("/data/a.svs");
        let args = invoker().build_args(&job, "pyhist-a-1-0");

        let value_of = |flag: &str| {
            let pos = args.iter().position(|a| a == flag).unwrap();
            args[pos + 1].clone()
        };

        assert_eq!(value_of("--patch-size"), "512");
        assert_eq!(value_of("--content-threshold"), "0.4");
        assert_eq!(value_of("--output-downsample"), "4");
        assert_eq!(value_of("--borders"), "0000");
        assert_eq!(value_of("--corners"), "1010");
        assert_eq!(value_of("--percentage-bc"), "1");
        assert_eq!(value_of("--k-const"), "1000");
        assert_eq!(value_of("--minimum_segmentsize"), "1000");
        assert_eq!(value_of("--info"), "verbose");
        assert!(args.contains(&"--save-patches".to_string()));
        assert!(args.contains(&"--save-tilecrossed-image".to_string()));
    }

    #[test]
    fn test_flags_can_be_disabled() {
        let mut config = Config::default();
        config.tiling.save_tilecrossed_image = false;
        let args = PyhistInvoker::new(&config).build_args(&ImageJob::new("/data/a.svs"), "c");
        assert!(!args.contains(&"--save-tilecrossed-image".to_string()));
        assert!(args.contains(&"--save-patches".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_docker_program_is_tool_unavailable() {
        let mut config = Config::default();
        config.docker_program = "definitely-not-docker-xyz".to_string();

        let err = PyhistInvoker::new(&config)
            .ensure_available()
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ToolUnavailable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_run_is_tool_execution() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("b.svs");
        std::fs::write(&image, b"slide").unwrap();

        // `false` 忽略参数并以非零状态退出
        let mut config = Config::default();
        config.docker_program = "false".to_string();

        let err = PyhistInvoker::new(&config)
            .invoke(&ImageJob::new(&image))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ToolExecution { .. }));
        assert!(dir.path().join("output").is_dir());
    }
}
