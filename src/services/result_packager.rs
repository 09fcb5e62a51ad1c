//! 结果打包服务 - 业务能力层
//!
//! 只负责"把切片目录写进一个输出 ZIP"，不关心切片是怎么来的
//!
//! 压缩包内布局：`<图像标识>/<切片文件名>.png`

use super::tiles::list_tiles;
use crate::error::{AppError, AppResult};
use crate::models::ResultMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 打包统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackageSummary {
    /// 写入的图像数
    pub images: usize,
    /// 写入的切片数
    pub tiles: usize,
}

/// 把所有切片写入 `output_path`
///
/// 已存在的输出文件会被覆盖；映射为空时生成一个空的 ZIP。
pub fn package(results: &ResultMap, output_path: &Path) -> AppResult<PackageSummary> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
    }

    let file = File::create(output_path).map_err(|e| AppError::io(output_path, e))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let archive_err = |source| AppError::Archive {
        path: output_path.to_path_buf(),
        source,
    };

    let mut summary = PackageSummary::default();

    for (image_id, tile_dir) in results {
        let tiles = match list_tiles(tile_dir) {
            Ok(tiles) if !tiles.is_empty() => tiles,
            Ok(_) => {
                warn!("[任务 {}] ⚠️ 切片目录为空: {}", image_id, tile_dir.display());
                continue;
            }
            Err(e) => {
                warn!("[任务 {}] ⚠️ 无法读取切片目录 {}: {}", image_id, tile_dir.display(), e);
                continue;
            }
        };

        for tile in &tiles {
            let file_name = tile.file_name().unwrap_or_default().to_string_lossy();
            let entry_name = format!("{}/{}", image_id, file_name);

            writer.start_file(entry_name, options).map_err(archive_err)?;
            let mut reader = BufReader::new(File::open(tile).map_err(|e| AppError::io(tile, e))?);
            io::copy(&mut reader, &mut writer).map_err(|e| AppError::io(tile, e))?;
        }

        summary.images += 1;
        summary.tiles += tiles.len();
    }

    writer.finish().map_err(archive_err)?;

    info!(
        "✓ 输出 ZIP 已创建: {} ({} 个图像, {} 个切片)",
        output_path.display(),
        summary.images,
        summary.tiles
    );

    Ok(summary)
}
