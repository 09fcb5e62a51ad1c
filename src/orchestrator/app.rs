//! 切片应用 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，按顺序调度一次完整的运行：
//!
//! 1. **输入判定**：单张图像或 ZIP，其他类型在任何外部调用之前拒绝
//! 2. **工具检查**：确认切片镜像在本地可用（缺失则拉取）
//! 3. **解压枚举**：压缩包解压到独立临时目录，筛选可识别的图像
//! 4. **并行分发**：委托 `Dispatcher` 处理所有任务
//! 5. **结果打包**：委托 `result_packager` 生成输出 ZIP
//! 6. **清理**：无论成功与否都删除临时目录
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有临时目录的模块
//! - **致命错误直接返回**：输入无效、压缩包损坏、工具不可用
//! - **任务级错误不返回**：由分发器记录并跳过

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{is_image, ImageJob, InputSpec};
use crate::orchestrator::dispatcher::Dispatcher;
use crate::services::{archive_extractor, result_packager, PyhistInvoker, TileTool};
use crate::utils::logging::{
    init_log_file, log_input, log_jobs_loaded, log_startup, print_final_stats,
};

/// 一次运行的统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub tiled: usize,
    pub empty: usize,
    pub failed: usize,
    pub tiles_written: usize,
    pub output_zip: PathBuf,
}

/// 应用主结构
pub struct App<T: TileTool = PyhistInvoker> {
    config: Config,
    tool: Arc<T>,
}

impl App<PyhistInvoker> {
    /// 初始化应用：写入日志标题，创建 PyHIST 调用器
    pub fn initialize(config: Config) -> AppResult<Self> {
        init_log_file(&config.log_file)?;
        log_startup(config.max_concurrent_jobs, &config.docker_image);

        let tool = Arc::new(PyhistInvoker::new(&config));
        Ok(Self::with_tool(config, tool))
    }
}

impl<T: TileTool> App<T> {
    /// 使用指定的切片工具创建应用
    pub fn with_tool(config: Config, tool: Arc<T>) -> Self {
        Self { config, tool }
    }

    /// 运行应用主逻辑
    pub async fn run(&self, input: &Path, output_zip: &Path) -> AppResult<RunSummary> {
        // 先判定输入，不支持的类型不会触发任何外部调用
        let spec = InputSpec::classify(input)?;
        log_input(&spec);

        self.tool.ensure_available().await?;

        // workspace 在离开作用域时删除，出错提前返回也一样
        let (jobs, workspace) = collect_jobs(spec).await?;

        if jobs.is_empty() {
            warn!("⚠️ 没有找到可识别的图像，将生成空的输出 ZIP");
        }
        log_jobs_loaded(jobs.len(), self.config.max_concurrent_jobs);

        let dispatcher = Dispatcher::new(Arc::clone(&self.tool), self.config.max_concurrent_jobs);
        let mut report = dispatcher.dispatch_all(jobs).await;

        let tiles = std::mem::take(&mut report.tiles);
        let output = output_zip.to_path_buf();
        let packaged =
            tokio::task::spawn_blocking(move || result_packager::package(&tiles, &output)).await??;

        if let Some(workspace) = workspace {
            cleanup_workspace(workspace);
        }

        let summary = RunSummary {
            total: report.total,
            tiled: report.tiled,
            empty: report.empty,
            failed: report.failed,
            tiles_written: packaged.tiles,
            output_zip: output_zip.to_path_buf(),
        };

        print_final_stats(
            summary.tiled,
            summary.empty,
            summary.failed,
            summary.total,
            summary.tiles_written,
            &self.config.log_file,
        );
        info!("✅ 处理完成");

        Ok(summary)
    }
}

/// 枚举任务；压缩包输入同时返回临时目录
async fn collect_jobs(spec: InputSpec) -> AppResult<(Vec<ImageJob>, Option<TempDir>)> {
    match spec {
        InputSpec::Image(path) => Ok((vec![ImageJob::new(path)], None)),
        InputSpec::Archive(path) => {
            info!("\n📁 正在解压: {}", path.display());
            let extraction =
                tokio::task::spawn_blocking(move || archive_extractor::extract(&path)).await??;

            let jobs = extraction
                .files
                .iter()
                .filter(|f| is_image(f))
                .map(ImageJob::new)
                .collect();

            Ok((jobs, Some(extraction.workspace)))
        }
    }
}

fn cleanup_workspace(workspace: TempDir) {
    let path = workspace.path().to_path_buf();
    match workspace.close() {
        Ok(()) => info!("🗑️ 已删除临时目录: {}", path.display()),
        Err(e) => warn!("⚠️ 删除临时目录失败 {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::tool_invoker::expected_tile_dir;
    use std::collections::BTreeSet;
    use std::fs::{self, File};
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use zip::write::SimpleFileOptions;
    use zip::{ZipArchive, ZipWriter};

    /// 假工具：标识符以 "b" 开头的任务失败，其余生成两个切片
    #[derive(Default)]
    struct FakeTool {
        unavailable: bool,
        ensure_calls: AtomicUsize,
        seen: Mutex<Vec<PathBuf>>,
    }

    impl FakeTool {
        fn invocations(&self) -> Vec<PathBuf> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl TileTool for FakeTool {
        async fn ensure_available(&self) -> AppResult<()> {
            self.ensure_calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable {
                return Err(AppError::tool_unavailable("fake/pyhist", "pull denied"));
            }
            Ok(())
        }

        async fn invoke(&self, job: &ImageJob) -> AppResult<PathBuf> {
            self.seen.lock().unwrap().push(job.image_path.clone());
            if job.id.starts_with('b') {
                return Err(AppError::tool_execution(&job.image_path, "pyhist crashed"));
            }
            let dir = expected_tile_dir(job);
            fs::create_dir_all(&dir).unwrap();
            for i in 0..2 {
                fs::write(dir.join(format!("{}_{}.png", job.id, i)), b"png").unwrap();
            }
            fs::write(dir.join("overview.jpg"), b"jpg").unwrap();
            Ok(dir)
        }
    }

    fn build_zip(path: &Path, names: &[&str]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for name in names {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(b"slide").unwrap();
        }
        writer.finish().unwrap();
    }

    fn entry_names(path: &Path) -> BTreeSet<String> {
        let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        archive.file_names().map(String::from).collect()
    }

    fn app(tool: Arc<FakeTool>) -> App<FakeTool> {
        App::with_tool(Config::default(), tool)
    }

    #[tokio::test]
    async fn test_archive_run_packages_only_successes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("slides.zip");
        build_zip(&input, &["a.svs", "b.svs", "readme.txt", "more/c.tif"]);
        let output = dir.path().join("tiles.zip");

        let tool = Arc::new(FakeTool::default());
        let summary = app(Arc::clone(&tool)).run(&input, &output).await.unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.tiled, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.tiles_written, 4);

        let expected: BTreeSet<String> = ["a/a_0.png", "a/a_1.png", "c/c_0.png", "c/c_1.png"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(entry_names(&output), expected);
    }

    #[tokio::test]
    async fn test_workspace_removed_after_run() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("slides.zip");
        build_zip(&input, &["a.svs", "b.svs"]);

        let tool = Arc::new(FakeTool::default());
        app(Arc::clone(&tool))
            .run(&input, &dir.path().join("tiles.zip"))
            .await
            .unwrap();

        let seen = tool.invocations();
        assert_eq!(seen.len(), 2);
        for image in seen {
            assert!(!image.exists());
            assert!(!image.parent().unwrap().exists());
        }
    }

    #[tokio::test]
    async fn test_single_image_run() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.svs");
        fs::write(&input, b"slide").unwrap();
        let output = dir.path().join("tiles.zip");

        let summary = app(Arc::new(FakeTool::default()))
            .run(&input, &output)
            .await
            .unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(entry_names(&output).len(), 2);
        // 单张图像的输出留在图像旁边
        assert!(dir.path().join("output/a/a_tiles").is_dir());
    }

    #[tokio::test]
    async fn test_unsupported_input_fails_before_any_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        fs::write(&input, b"hello").unwrap();

        let tool = Arc::new(FakeTool::default());
        let err = app(Arc::clone(&tool))
            .run(&input, &dir.path().join("tiles.zip"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedInput { .. }));
        assert_eq!(tool.ensure_calls.load(Ordering::SeqCst), 0);
        assert!(tool.invocations().is_empty());
        assert!(!dir.path().join("tiles.zip").exists());
    }

    #[tokio::test]
    async fn test_corrupted_archive_dispatches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("slides.zip");
        fs::write(&input, b"PK but not really").unwrap();

        let tool = Arc::new(FakeTool::default());
        let err = app(Arc::clone(&tool))
            .run(&input, &dir.path().join("tiles.zip"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidArchive { .. }));
        assert!(tool.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_tool_unavailable_aborts_before_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("slides.zip");
        build_zip(&input, &["a.svs"]);

        let tool = Arc::new(FakeTool {
            unavailable: true,
            ..Default::default()
        });
        let err = app(Arc::clone(&tool))
            .run(&input, &dir.path().join("tiles.zip"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ToolUnavailable { .. }));
        assert!(tool.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_rerun_yields_same_membership() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("slides.zip");
        build_zip(&input, &["a.svs", "b.svs", "c.png"]);
        let output = dir.path().join("tiles.zip");

        let app = app(Arc::new(FakeTool::default()));
        app.run(&input, &output).await.unwrap();
        let first = entry_names(&output);
        app.run(&input, &output).await.unwrap();

        assert_eq!(entry_names(&output), first);
    }
}
