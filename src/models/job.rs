//! 任务模型
//!
//! 一张图像对应一个任务：调用外部工具，定位切片输出

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// 单张图像的处理任务
///
/// 在枚举输入时创建，之后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    /// 图像绝对路径
    pub image_path: PathBuf,
    /// 标识符（去掉扩展名的文件名）
    pub id: String,
}

impl ImageJob {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        let image_path = image_path.into();
        let id = image_path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Self { image_path, id }
    }

    /// 图像所在目录（挂载到容器中的目录）
    pub fn parent_dir(&self) -> &Path {
        self.image_path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// 图像文件名
    pub fn file_name(&self) -> String {
        self.image_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

impl Display for ImageJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[任务 {}]", self.id)
    }
}

/// 单个任务的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// 成功生成切片
    Tiled { tile_dir: PathBuf, tile_count: usize },
    /// 工具执行成功但没有切片文件
    Empty { tile_dir: PathBuf },
    /// 工具执行失败
    Failed { reason: String },
}

/// 标识符 → 切片目录
///
/// 使用有序映射，打包顺序与完成顺序无关
pub type ResultMap = BTreeMap<String, PathBuf>;
