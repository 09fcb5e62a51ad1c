//! # Slide Tiler
//!
//! 调用容器化的 PyHIST 对全切片图像并行切片，并把切片重新打包为 ZIP
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部进程能力，不认识业务对象
//! - `DockerCli` - 查询 / 拉取镜像，运行容器
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个压缩包 / 单张图像 / 单个映射
//! - `archive_extractor` - 解压到独立临时目录
//! - `PyhistInvoker` - 对一张图像运行一次 PyHIST
//! - `result_packager` - 写出输出 ZIP
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一张图像"的完整处理流程
//! - `JobFlow` - 调用工具 → 校验切片目录 → 统计切片
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/dispatcher` - 并行分发器，管理并发和故障隔离
//! - `orchestrator/app` - 一次完整运行的调度与清理
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, TilingParams};
pub use error::{AppError, AppResult};
pub use infrastructure::DockerCli;
pub use models::{ImageJob, InputSpec, JobOutcome, ResultMap};
pub use orchestrator::{App, DispatchReport, Dispatcher, RunSummary};
pub use services::{PyhistInvoker, TileTool};
pub use workflow::JobFlow;
