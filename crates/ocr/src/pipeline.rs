use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use rangelens_core::CropRegion;

use crate::crop::{self, CropError};
use crate::extract;
use crate::recognizer::{OcrBackend, OcrError};

/// Deadline for a single recognition call. Engines that wedge on a bad
/// frame surface as a recognition failure instead of hanging the run.
const RECOGNIZE_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Crop stage failed: {0}")]
    Crop(#[from] CropError),
    #[error("Recognition stage failed: {0}")]
    Ocr(#[from] OcrError),
}

/// Which pipeline stage a failure came from. Extraction is pure and has no
/// failure mode, so it never appears here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Read,
    Crop,
    Recognize,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Read => write!(f, "read"),
            Stage::Crop => write!(f, "crop"),
            Stage::Recognize => write!(f, "recognize"),
        }
    }
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Io(_) => Stage::Read,
            PipelineError::Crop(_) => Stage::Crop,
            PipelineError::Ocr(_) => Stage::Recognize,
        }
    }
}

/// Sequences crop → recognize → extract for one source image.
///
/// Each run is a single attempt with no retries; any stage failure
/// short-circuits the rest. The pipeline keeps no state across runs, so
/// concurrent runs over different images do not interfere.
pub struct ExtractionPipeline<R: OcrBackend> {
    recognizer: Arc<R>,
    region: CropRegion,
}

impl<R: OcrBackend + 'static> ExtractionPipeline<R> {
    pub fn new(recognizer: R, region: CropRegion) -> Self {
        Self { recognizer: Arc::new(recognizer), region }
    }

    pub fn region(&self) -> CropRegion {
        self.region
    }

    /// Process an image file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<Vec<String>, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        self.process_bytes(&bytes).await
    }

    /// Process encoded image bytes and return the numeric tokens found in
    /// the configured region, in order of appearance.
    pub async fn process_bytes(&self, data: &[u8]) -> Result<Vec<String>, PipelineError> {
        let cropped = crop::crop_to_png(data, self.region)?;
        let text = self.recognize_with_deadline(cropped).await?;
        let numbers = extract::extract_numbers(&text);
        tracing::debug!(region = %self.region, tokens = numbers.len(), "extraction complete");
        Ok(numbers)
    }

    /// Runs the (blocking) engine call off the async worker and bounds it
    /// with the recognition deadline.
    async fn recognize_with_deadline(&self, image_bytes: Vec<u8>) -> Result<String, OcrError> {
        let recognizer = Arc::clone(&self.recognizer);
        let call = tokio::task::spawn_blocking(move || recognizer.recognize(&image_bytes));
        match tokio::time::timeout(RECOGNIZE_DEADLINE, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(OcrError::Engine(join.to_string())),
            Err(_) => Err(OcrError::Timeout(RECOGNIZE_DEADLINE.as_secs())),
        }
    }
}

// ── Intake-folder integration ─────────────────────────────────────────────────

/// Spawn a notify watcher on `watch_dir` that sends newly created image
/// files to `tx`. Returns the watcher; it must be kept alive for watching
/// to continue.
pub fn spawn_intake_watcher(
    watch_dir: &Path,
    tx: mpsc::Sender<PathBuf>,
) -> notify::Result<impl notify::Watcher> {
    use notify::{EventKind, RecursiveMode, Watcher};

    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        if let Ok(ev) = event {
            if matches!(ev.kind, EventKind::Create(_)) {
                for path in ev.paths.into_iter().filter(|p| is_image_file(p)) {
                    let _ = tx.try_send(path);
                }
            }
        }
    })?;

    watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn is_image_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("png" | "jpg" | "jpeg" | "webp" | "bmp")
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::MockRecognizer;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use std::io::Cursor;

    fn tiny_png(width: u32, height: u32) -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(width, height, |_, _| Luma([180u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn pipeline_with(text: &str) -> ExtractionPipeline<MockRecognizer> {
        ExtractionPipeline::new(MockRecognizer::new(text), CropRegion::new(0, 0, 8, 8))
    }

    #[tokio::test]
    async fn process_bytes_yields_ordered_tokens() {
        let pipeline = pipeline_with("LO 36.6  HI 101.2");
        let numbers = pipeline.process_bytes(&tiny_png(16, 16)).await.unwrap();
        assert_eq!(numbers, ["36.6", "101.2"]);
    }

    #[tokio::test]
    async fn process_bytes_with_no_numbers_is_not_an_error() {
        let pipeline = pipeline_with("CALIBRATING");
        let numbers = pipeline.process_bytes(&tiny_png(16, 16)).await.unwrap();
        assert!(numbers.is_empty());
    }

    #[tokio::test]
    async fn crop_failure_short_circuits_and_names_the_stage() {
        // 4x4 source cannot hold the 8x8 region.
        let pipeline = pipeline_with("never reached");
        let err = pipeline.process_bytes(&tiny_png(4, 4)).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Crop);
    }

    #[tokio::test]
    async fn undecodable_source_fails_in_the_crop_stage() {
        let pipeline = pipeline_with("never reached");
        let err = pipeline.process_bytes(b"garbage").await.unwrap_err();
        assert_eq!(err.stage(), Stage::Crop);
    }

    #[tokio::test]
    async fn missing_file_fails_in_the_read_stage() {
        let pipeline = pipeline_with("never reached");
        let err = pipeline
            .process_file(Path::new("/nonexistent/frame.png"))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Read);
    }

    #[tokio::test]
    async fn engine_failure_names_the_recognize_stage() {
        struct FailingRecognizer;
        impl OcrBackend for FailingRecognizer {
            fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
                Err(OcrError::Engine("engine offline".into()))
            }
        }

        let pipeline =
            ExtractionPipeline::new(FailingRecognizer, CropRegion::new(0, 0, 8, 8));
        let err = pipeline.process_bytes(&tiny_png(16, 16)).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Recognize);
    }

    #[tokio::test]
    async fn concurrent_runs_do_not_interfere() {
        let pipeline = std::sync::Arc::new(pipeline_with("1 2 3"));
        let a = tokio::spawn({
            let p = pipeline.clone();
            async move { p.process_bytes(&tiny_png(16, 16)).await }
        });
        let b = tokio::spawn({
            let p = pipeline.clone();
            async move { p.process_bytes(&tiny_png(32, 32)).await }
        });
        assert_eq!(a.await.unwrap().unwrap(), ["1", "2", "3"]);
        assert_eq!(b.await.unwrap().unwrap(), ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn intake_watcher_delivers_new_image_files() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let _watcher = spawn_intake_watcher(dir.path(), tx).unwrap();

        // Give the watcher a beat to register before creating the file.
        tokio::time::sleep(Duration::from_millis(100)).await;
        tokio::fs::write(dir.path().join("frame.png"), tiny_png(8, 8))
            .await
            .unwrap();

        let delivered = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("watcher should deliver within the timeout")
            .expect("channel open");
        assert_eq!(delivered.file_name().unwrap(), "frame.png");
    }

    #[test]
    fn non_image_files_are_filtered() {
        assert!(is_image_file(Path::new("/intake/a.PNG")));
        assert!(is_image_file(Path::new("/intake/b.jpeg")));
        assert!(!is_image_file(Path::new("/intake/notes.txt")));
        assert!(!is_image_file(Path::new("/intake/noext")));
    }
}
