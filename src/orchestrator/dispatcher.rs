//! 并行分发器 - 编排层
//!
//! ## 职责
//!
//! 1. **并发控制**：使用 Semaphore 限制同时运行的容器数量
//! 2. **故障隔离**：单个任务失败只记录日志，不影响其他任务
//! 3. **结果汇总**：按完成顺序由唯一的收集者写入 `ResultMap`
//!
//! 调用方会一直阻塞到所有任务结束，不支持取消。

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::models::{ImageJob, JobOutcome, ResultMap};
use crate::services::TileTool;
use crate::workflow::JobFlow;

/// 分发统计
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// 成功任务：标识符 → 切片目录
    pub tiles: ResultMap,
    pub total: usize,
    pub tiled: usize,
    pub empty: usize,
    pub failed: usize,
}

impl DispatchReport {
    pub fn skipped(&self) -> usize {
        self.empty + self.failed
    }
}

/// 并行分发器
pub struct Dispatcher<T: TileTool> {
    flow: JobFlow<T>,
    max_concurrent: usize,
}

impl<T: TileTool> Dispatcher<T> {
    pub fn new(tool: Arc<T>, max_concurrent: usize) -> Self {
        Self {
            flow: JobFlow::new(tool),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// 处理所有任务，返回成功任务的映射和统计
    pub async fn dispatch_all(&self, jobs: Vec<ImageJob>) -> DispatchReport {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut report = DispatchReport {
            total: jobs.len(),
            ..Default::default()
        };

        let mut pending: FuturesUnordered<_> = jobs
            .into_iter()
            .map(|job| {
                let semaphore = Arc::clone(&semaphore);
                let flow = self.flow.clone();
                let task_job = job.clone();

                let handle = tokio::spawn(async move {
                    // 信号量不会被关闭，acquire 只会在关闭时失败
                    let _permit = semaphore.acquire_owned().await.ok();
                    flow.run(&task_job).await
                });

                async move { (job, handle.await) }
            })
            .collect();

        // 等待所有任务完成（按完成顺序）
        while let Some((job, joined)) = pending.next().await {
            match joined {
                Ok(JobOutcome::Tiled { tile_dir, .. }) => {
                    report.tiled += 1;
                    if let Some(previous) = report.tiles.insert(job.id.clone(), tile_dir) {
                        warn!("{} ⚠️ 标识符重复，覆盖之前的结果: {}", job, previous.display());
                    }
                }
                Ok(JobOutcome::Empty { .. }) => {
                    report.empty += 1;
                }
                Ok(JobOutcome::Failed { .. }) => {
                    report.failed += 1;
                }
                Err(e) => {
                    error!("{} 任务执行失败 {}: {}", job, job.image_path.display(), e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "✓ 分发完成: 成功 {}/{}, 空输出 {}, 失败 {}",
            report.tiled, report.total, report.empty, report.failed
        );

        report
    }
}
