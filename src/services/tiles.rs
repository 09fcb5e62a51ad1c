//! 切片文件枚举
//!
//! 只看目录第一层，按扩展名过滤

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 切片文件扩展名
pub const TILE_EXTENSION: &str = "png";

/// 列出目录下的切片文件（不递归，按文件名排序）
pub fn list_tiles(tile_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut tiles = Vec::new();

    for entry in fs::read_dir(tile_dir)? {
        let path = entry?.path();
        if path.is_file() && is_tile(&path) {
            tiles.push(path);
        }
    }

    tiles.sort();
    Ok(tiles)
}

fn is_tile(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(TILE_EXTENSION))
        .unwrap_or(false)
}
