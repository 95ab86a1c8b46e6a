pub mod crop;
pub mod extract;
pub mod pipeline;
pub mod recognizer;

pub use crop::{crop_to_png, CropError};
pub use extract::extract_numbers;
pub use pipeline::{spawn_intake_watcher, ExtractionPipeline, PipelineError, Stage};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError};
