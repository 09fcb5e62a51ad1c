pub mod input;
pub mod job;

pub use input::{is_image, InputSpec, ARCHIVE_EXTENSION, VALID_EXTENSIONS};
pub use job::{ImageJob, JobOutcome, ResultMap};
