//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 切片应用
//! - 判定输入、检查工具、解压、打包、清理
//! - 持有临时目录
//! - 输出全局统计信息
//!
//! ### `dispatcher` - 并行分发器
//! - 控制并发数量（Semaphore）
//! - 隔离单个任务的失败
//! - 按完成顺序汇总结果
//!
//! ## 层次关系
//!
//! ```text
//! app (处理一次运行)
//!     ↓
//! dispatcher (处理 Vec<ImageJob>)
//!     ↓
//! workflow::JobFlow (处理单个 ImageJob)
//!     ↓
//! services (能力层：解压 / 调用工具 / 打包)
//!     ↓
//! infrastructure (基础设施：DockerCli / 子进程)
//! ```

pub mod app;
pub mod dispatcher;

// 重新导出主要类型
pub use app::{App, RunSummary};
pub use dispatcher::{DispatchReport, Dispatcher};
