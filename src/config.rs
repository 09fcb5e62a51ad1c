use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::path::Path;

/// PyHIST 切片参数
///
/// 对应容器命令行的固定参数集，不作为命令行选项暴露，
/// 只能通过配置文件调整。
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TilingParams {
    pub patch_size: u32,
    pub content_threshold: f64,
    pub output_downsample: u32,
    pub borders: String,
    pub corners: String,
    pub percentage_bc: u32,
    pub k_const: u32,
    pub minimum_segmentsize: u32,
    pub save_patches: bool,
    pub save_tilecrossed_image: bool,
    pub info: String,
}

impl Default for TilingParams {
    fn default() -> Self {
        Self {
            patch_size: 512,
            content_threshold: 0.4,
            output_downsample: 4,
            borders: "0000".to_string(),
            corners: "1010".to_string(),
            percentage_bc: 1,
            k_const: 1000,
            minimum_segmentsize: 1000,
            save_patches: true,
            save_tilecrossed_image: true,
            info: "verbose".to_string(),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 同时运行的容器数量
    pub max_concurrent_jobs: usize,
    /// 容器命令行程序
    pub docker_program: String,
    /// 切片工具镜像
    pub docker_image: String,
    /// 容器平台
    pub docker_platform: String,
    /// 输出日志文件（追加写入）
    pub log_file: String,
    /// 单个任务超时（秒），默认不限制
    pub job_timeout_secs: Option<u64>,
    /// 切片参数
    pub tiling: TilingParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 25,
            docker_program: "docker".to_string(),
            docker_image: "mmunozag/pyhist".to_string(),
            docker_platform: "linux/amd64".to_string(),
            log_file: "tile_processing.log".to_string(),
            job_timeout_secs: None,
            tiling: TilingParams::default(),
        }
    }
}

impl Config {
    /// 加载配置：默认值 → 配置文件（可选）→ 环境变量
    ///
    /// 配置文件路径优先取参数，其次取 `TILER_CONFIG` 环境变量。
    pub fn load(config_path: Option<&Path>) -> AppResult<Self> {
        let env_path = std::env::var("TILER_CONFIG").ok();
        let path = config_path.or(env_path.as_deref().map(Path::new));

        match path {
            Some(p) => Ok(Self::from_toml_file(p)?.with_env_overrides()),
            None => Ok(Self::from_env()),
        }
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取配置，缺失的字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AppError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_toml_str(&content).map_err(|reason| AppError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn from_toml_str(content: &str) -> Result<Self, String> {
        let config: Config = toml::from_str(content).map_err(|e| e.to_string())?;
        Ok(config.normalized())
    }

    fn with_env_overrides(self) -> Self {
        let config = Self {
            max_concurrent_jobs: env_parse("MAX_CONCURRENT_JOBS").unwrap_or(self.max_concurrent_jobs),
            docker_program: std::env::var("DOCKER_PROGRAM").unwrap_or(self.docker_program),
            docker_image: std::env::var("DOCKER_IMAGE").unwrap_or(self.docker_image),
            docker_platform: std::env::var("DOCKER_PLATFORM").unwrap_or(self.docker_platform),
            log_file: std::env::var("TILER_LOG_FILE").unwrap_or(self.log_file),
            job_timeout_secs: env_parse("JOB_TIMEOUT_SECS").or(self.job_timeout_secs),
            tiling: self.tiling,
        };
        config.normalized()
    }

    /// 并发数至少为 1
    fn normalized(mut self) -> Self {
        self.max_concurrent_jobs = self.max_concurrent_jobs.max(1);
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
