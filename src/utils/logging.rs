//! 日志工具模块
//!
//! 提供日志格式化和输出的辅助函数

use crate::error::{AppError, AppResult};
use crate::models::InputSpec;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::info;

/// 在日志文件末尾追加本次运行的标题
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "\n{}\n切片处理日志 - {}\n{}\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| AppError::io(log_file_path, e))?;
    file.write_all(log_header.as_bytes())
        .map_err(|e| AppError::io(log_file_path, e))?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `max_concurrent`: 最大并发数
/// - `image`: 切片工具镜像
pub fn log_startup(max_concurrent: usize, image: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 并行切片模式");
    info!("🐳 切片工具镜像: {}", image);
    info!("📊 最大并发数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录输入类型
pub fn log_input(input: &InputSpec) {
    match input {
        InputSpec::Image(path) => info!("🖼️ 输入为单张图像: {}", path.display()),
        InputSpec::Archive(path) => info!("📦 输入为 ZIP 压缩包: {}", path.display()),
    }
}

/// 记录任务加载信息
///
/// # 参数
/// - `total`: 任务总数
/// - `max_concurrent`: 最大并发数
pub fn log_jobs_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 个待处理的图像", total);
    info!("📋 最多同时运行 {} 个容器\n", max_concurrent);
}

/// 打印最终统计信息
///
/// # 参数
/// - `tiled`: 成功数量
/// - `empty`: 空输出数量
/// - `failed`: 失败数量
/// - `total`: 总数
/// - `tiles`: 写入的切片数
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(
    tiled: usize,
    empty: usize,
    failed: usize,
    total: usize,
    tiles: usize,
    log_file_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{} (共 {} 个切片)", tiled, total, tiles);
    info!("⏭️ 空输出: {}", empty);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}
