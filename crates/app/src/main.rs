use std::path::PathBuf;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use rangelens_core::CropRegion;
use rangelens_ocr::{spawn_intake_watcher, ExtractionPipeline};
use rangelens_review::{ResetReason, ReviewState, SessionEvent, SessionHandle};

/// The fixed display region the reader is aimed at, in source-image pixels.
/// Retargeting means changing this constant and redeploying.
const PANEL_REGION: CropRegion = CropRegion::new(96, 344, 640, 220);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let intake_dir = match std::env::args_os().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => directories::ProjectDirs::from("com", "anomalyco", "Rangelens")
            .context("could not resolve a data directory")?
            .data_dir()
            .join("intake"),
    };
    std::fs::create_dir_all(&intake_dir)
        .with_context(|| format!("creating intake folder {}", intake_dir.display()))?;

    let (events_tx, mut events_rx) = mpsc::channel(32);
    let session = rangelens_review::spawn(build_pipeline(), events_tx);

    // The channel bridges the notify watcher thread and the async session.
    let (intake_tx, mut intake_rx) = mpsc::channel::<PathBuf>(16);
    let _watcher = spawn_intake_watcher(&intake_dir, intake_tx)
        .context("starting the intake folder watcher")?;
    tracing::info!("watching intake folder: {}", intake_dir.display());

    println!(
        "rangelens: drop an image into {} or enter its path",
        intake_dir.display()
    );
    print_help();

    // The screen is a pure projection of the session's events.
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            println!("{}", render(&event));
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(path) = intake_rx.recv() => {
                session.submit_image(path).await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !dispatch(&session, line.trim()).await? {
                    break;
                }
            }
        }
    }
    Ok(())
}

#[cfg(feature = "tesseract")]
fn build_pipeline(
) -> ExtractionPipeline<rangelens_ocr::recognizer::tesseract_backend::TesseractRecognizer> {
    use rangelens_ocr::recognizer::tesseract_backend::TesseractRecognizer;
    ExtractionPipeline::new(TesseractRecognizer::new(None, "eng"), PANEL_REGION)
}

#[cfg(not(feature = "tesseract"))]
fn build_pipeline() -> ExtractionPipeline<rangelens_ocr::MockRecognizer> {
    // Keeps the workflow runnable without an engine installed; build with
    // the `tesseract` feature for real recognition.
    ExtractionPipeline::new(rangelens_ocr::MockRecognizer::new(""), PANEL_REGION)
}

/// Applies one line of input. Returns false when the user asked to leave.
async fn dispatch(session: &SessionHandle, line: &str) -> anyhow::Result<bool> {
    match line {
        "" => {}
        "quit" | "exit" => return Ok(false),
        "help" => print_help(),
        "accept" => session.accept().await?,
        "modify" => session.modify().await?,
        "save" => session.save().await?,
        "cancel" => session.cancel().await?,
        "start" => session.start().await?,
        _ => {
            if let Some(rest) = line.strip_prefix("set ") {
                match rest.split_whitespace().collect::<Vec<_>>()[..] {
                    [first, second] => session.set_drafts(first, second).await?,
                    _ => println!("usage: set <first> <second>"),
                }
            } else {
                // Anything else is taken as an image path.
                session.submit_image(PathBuf::from(line)).await?;
            }
        }
    }
    Ok(true)
}

fn render(event: &SessionEvent) -> String {
    match event {
        SessionEvent::StateChanged(state) => render_state(state),
        SessionEvent::ExtractionComplete(pair) => {
            format!("started with ({}, {})", pair.first, pair.second)
        }
        SessionEvent::ProcessReset(ResetReason::PipelineFailed { stage, message }) => {
            format!("extraction failed during {stage}: {message}")
        }
        SessionEvent::ProcessReset(ResetReason::InsufficientResults { count }) => {
            format!(
                "only {count} number(s) readable; retry the same file or supply a new image"
            )
        }
        SessionEvent::CommandRejected(e) => format!("! {e}"),
    }
}

fn render_state(state: &ReviewState) -> String {
    match state {
        ReviewState::Idle => "idle; waiting for an image".to_string(),
        ReviewState::Processing => "reading the panel...".to_string(),
        ReviewState::InsufficientResults { .. } => state.to_string(),
        ReviewState::AwaitingDecision { pair } => {
            format!("read {pair}; `accept` or `modify`")
        }
        ReviewState::Modifying { draft_first, draft_second, .. } => {
            format!("editing [{draft_first} | {draft_second}]; `set <first> <second>`, then `save` or `cancel`")
        }
        ReviewState::Ready { pair } => format!("confirmed {pair}; `start` to hand off"),
    }
}

fn print_help() {
    println!("commands: accept | modify | set <first> <second> | save | cancel | start | help | quit");
}
