pub mod archive_extractor;
pub mod result_packager;
pub mod tiles;
pub mod tool_invoker;

pub use archive_extractor::Extraction;
pub use result_packager::PackageSummary;
pub use tool_invoker::{PyhistInvoker, TileTool};
