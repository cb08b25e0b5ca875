pub mod file_extractor;
pub mod output_manager;

pub use file_extractor::{ExtractionProgress, FileOperations};
pub use output_manager::{ConfigSnapshot, ExtractionReport, OutputManager};
