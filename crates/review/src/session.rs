use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use rangelens_core::NumberPair;
use rangelens_ocr::{ExtractionPipeline, OcrBackend, PipelineError, Stage};

use crate::state::{ReviewCycle, ReviewError, ReviewState};

/// User-facing commands driving one review session.
#[derive(Debug, Clone)]
pub enum Command {
    /// A new source image. Unconditionally starts a fresh cycle.
    SubmitImage(PathBuf),
    Accept,
    Modify,
    SetDrafts { first: String, second: String },
    Save,
    Cancel,
    Start,
}

/// Why a cycle ended without producing a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetReason {
    PipelineFailed { stage: Stage, message: String },
    InsufficientResults { count: usize },
}

/// What the session reports back to its caller. `StateChanged` follows every
/// transition so the presentation layer can stay a pure projection of
/// `ReviewState`; the other events are the cycle outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(ReviewState),
    /// The confirmed pair, emitted exactly once per successful cycle.
    ExtractionComplete(NumberPair),
    /// The cycle ended without a pair.
    ProcessReset(ResetReason),
    /// A command was rejected; the state did not change.
    CommandRejected(ReviewError),
}

#[derive(Debug, Error)]
#[error("review session is no longer running")]
pub struct SessionClosed;

/// Handle for sending commands into a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub async fn send(&self, command: Command) -> Result<(), SessionClosed> {
        self.commands.send(command).await.map_err(|_| SessionClosed)
    }

    pub async fn submit_image(&self, path: PathBuf) -> Result<(), SessionClosed> {
        self.send(Command::SubmitImage(path)).await
    }

    pub async fn accept(&self) -> Result<(), SessionClosed> {
        self.send(Command::Accept).await
    }

    pub async fn modify(&self) -> Result<(), SessionClosed> {
        self.send(Command::Modify).await
    }

    pub async fn set_drafts(
        &self,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Result<(), SessionClosed> {
        self.send(Command::SetDrafts { first: first.into(), second: second.into() })
            .await
    }

    pub async fn save(&self) -> Result<(), SessionClosed> {
        self.send(Command::Save).await
    }

    pub async fn cancel(&self) -> Result<(), SessionClosed> {
        self.send(Command::Cancel).await
    }

    pub async fn start(&self) -> Result<(), SessionClosed> {
        self.send(Command::Start).await
    }
}

/// Spawn a review session around `pipeline`. Events flow out on `events`;
/// the session runs until every `SessionHandle` clone is dropped.
pub fn spawn<R: OcrBackend + 'static>(
    pipeline: ExtractionPipeline<R>,
    events: mpsc::Sender<SessionEvent>,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(run_session(pipeline, rx, events));
    SessionHandle { commands: tx }
}

/// A pipeline run's outcome, tagged with the generation that started it.
type Completion = (u64, Result<Vec<String>, PipelineError>);

struct Session<R: OcrBackend> {
    pipeline: Arc<ExtractionPipeline<R>>,
    cycle: ReviewCycle,
    /// Monotonically increasing tag per pipeline run. Completions carrying
    /// an older tag belong to a superseded image and are discarded, so a
    /// stale run can never mutate the live state.
    generation: u64,
    events: mpsc::Sender<SessionEvent>,
    completions: mpsc::Sender<Completion>,
}

async fn run_session<R: OcrBackend + 'static>(
    pipeline: ExtractionPipeline<R>,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<SessionEvent>,
) {
    let (completion_tx, mut completion_rx) = mpsc::channel::<Completion>(4);
    let mut session = Session {
        pipeline: Arc::new(pipeline),
        cycle: ReviewCycle::new(),
        generation: 0,
        events,
        completions: completion_tx,
    };

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(command) => session.handle_command(command).await,
                    None => break,
                }
            }
            Some((run, result)) = completion_rx.recv() => {
                session.handle_completion(run, result).await;
            }
        }
    }
    debug!("review session closed");
}

impl<R: OcrBackend + 'static> Session<R> {
    async fn handle_command(&mut self, command: Command) {
        let applied = match command {
            Command::SubmitImage(path) => {
                self.begin_cycle(path);
                Ok(())
            }
            Command::Accept => self.cycle.accept(),
            Command::Modify => self.cycle.modify(),
            Command::SetDrafts { first, second } => self.cycle.set_drafts(first, second),
            Command::Save => self.cycle.save(),
            Command::Cancel => self.cycle.cancel(),
            Command::Start => match self.cycle.start() {
                Ok(pair) => {
                    info!(%pair, "pair handed off");
                    self.publish(SessionEvent::ExtractionComplete(pair)).await;
                    Ok(())
                }
                Err(e) => Err(e),
            },
        };

        match applied {
            Ok(()) => self.publish_state().await,
            Err(e) => {
                warn!(error = %e, "command rejected");
                self.publish(SessionEvent::CommandRejected(e)).await;
            }
        }
    }

    /// Start a fresh cycle for `path`: bump the generation, reset the state
    /// machine, and run the pipeline off the actor task.
    fn begin_cycle(&mut self, path: PathBuf) {
        self.generation += 1;
        self.cycle.begin();
        info!(run = self.generation, path = %path.display(), "image submitted");

        let pipeline = Arc::clone(&self.pipeline);
        let completions = self.completions.clone();
        let run = self.generation;
        tokio::spawn(async move {
            let result = pipeline.process_file(&path).await;
            let _ = completions.send((run, result)).await;
        });
    }

    async fn handle_completion(&mut self, run: u64, result: Result<Vec<String>, PipelineError>) {
        if run != self.generation {
            debug!(run, current = self.generation, "discarding superseded run");
            return;
        }

        match result {
            Ok(numbers) => {
                if self.cycle.complete_extraction(&numbers).is_err() {
                    // Guarded by the generation check; nothing to apply.
                    return;
                }
                if let ReviewState::InsufficientResults { count } = *self.cycle.state() {
                    info!(count, "extraction found fewer than two numbers");
                    self.publish(SessionEvent::ProcessReset(
                        ResetReason::InsufficientResults { count },
                    ))
                    .await;
                }
            }
            Err(e) => {
                warn!(stage = %e.stage(), error = %e, "pipeline failed");
                if self.cycle.fail_extraction().is_err() {
                    return;
                }
                self.publish(SessionEvent::ProcessReset(ResetReason::PipelineFailed {
                    stage: e.stage(),
                    message: e.to_string(),
                }))
                .await;
            }
        }
        self.publish_state().await;
    }

    async fn publish_state(&self) {
        self.publish(SessionEvent::StateChanged(self.cycle.state().clone()))
            .await;
    }

    async fn publish(&self, event: SessionEvent) {
        // A departed listener is not the session's problem.
        let _ = self.events.send(event).await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
