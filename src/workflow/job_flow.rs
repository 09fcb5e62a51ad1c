//! 单张图像处理流程 - 流程层
//!
//! 核心职责：定义"一个任务"的完整处理流程
//!
//! 流程顺序：
//! 1. 调用切片工具
//! 2. 校验预期的切片目录存在
//! 3. 统计切片数量，为零则视为空输出

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::models::{ImageJob, JobOutcome};
use crate::services::tiles::list_tiles;
use crate::services::TileTool;

/// 单张图像处理流程
///
/// - 不持有任何进程资源
/// - 只依赖切片工具能力
/// - 任务级错误在这里转换为 `JobOutcome`，不再向上传播
pub struct JobFlow<T: TileTool> {
    tool: Arc<T>,
}

impl<T: TileTool> Clone for JobFlow<T> {
    fn clone(&self) -> Self {
        Self {
            tool: Arc::clone(&self.tool),
        }
    }
}

impl<T: TileTool> JobFlow<T> {
    pub fn new(tool: Arc<T>) -> Self {
        Self { tool }
    }

    pub async fn run(&self, job: &ImageJob) -> JobOutcome {
        info!("{} 🚀 开始处理: {}", job, job.image_path.display());

        let tile_dir = match self.tool.invoke(job).await {
            Ok(dir) => dir,
            Err(e) => {
                error!("{} ❌ 处理失败 {}: {}", job, job.image_path.display(), e);
                return JobOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        // 目录路径只是命名约定，先确认它真的存在
        if !tile_dir.is_dir() {
            warn!("{} ⚠️ 预期的切片目录不存在: {}", job, tile_dir.display());
            return JobOutcome::Empty { tile_dir };
        }

        match list_tiles(&tile_dir) {
            Ok(tiles) if !tiles.is_empty() => {
                info!("{} ✓ 找到 {} 个切片", job, tiles.len());
                JobOutcome::Tiled {
                    tile_count: tiles.len(),
                    tile_dir,
                }
            }
            Ok(_) => {
                warn!("{} ⚠️ 未在 {} 中找到 PNG 切片", job, tile_dir.display());
                JobOutcome::Empty { tile_dir }
            }
            Err(e) => {
                error!("{} ❌ 无法读取切片目录 {}: {}", job, tile_dir.display(), e);
                JobOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
