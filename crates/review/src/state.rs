use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use rangelens_core::{NumberPair, PairError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    /// A draft was empty after trimming. The edit session stays open with
    /// the drafts untouched.
    #[error(transparent)]
    BlankDraft(#[from] PairError),
    /// The command is not legal in the current state. Nothing changes.
    #[error("`{command}` is not available while {state}")]
    UnexpectedCommand {
        command: &'static str,
        state: &'static str,
    },
}

/// What the user currently sees for one image under review.
/// Exactly one variant is live per cycle; supplying a new image resets the
/// cycle unconditionally, discarding unsaved edits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewState {
    /// No image under review.
    #[default]
    Idle,
    /// The extraction pipeline is running; nothing displayable yet.
    Processing,
    /// Extraction succeeded but found fewer than two numbers. Terminal for
    /// this cycle: only a new image moves things forward.
    InsufficientResults { count: usize },
    /// The two leading numbers, awaiting accept or modify.
    AwaitingDecision { pair: NumberPair },
    /// Free-text edit of both values, seeded from the extracted pair.
    Modifying {
        pair: NumberPair,
        draft_first: String,
        draft_second: String,
    },
    /// Pair confirmed; eligible for hand-off.
    Ready { pair: NumberPair },
}

impl ReviewState {
    fn name(&self) -> &'static str {
        match self {
            ReviewState::Idle => "idle",
            ReviewState::Processing => "processing",
            ReviewState::InsufficientResults { .. } => "showing insufficient results",
            ReviewState::AwaitingDecision { .. } => "awaiting a decision",
            ReviewState::Modifying { .. } => "modifying",
            ReviewState::Ready { .. } => "ready",
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewState::Idle => write!(f, "Idle"),
            ReviewState::Processing => write!(f, "Processing"),
            ReviewState::InsufficientResults { count } => {
                write!(f, "Insufficient results ({count} number(s) found)")
            }
            ReviewState::AwaitingDecision { pair } => {
                write!(f, "Awaiting decision on {pair}")
            }
            ReviewState::Modifying { draft_first, draft_second, .. } => {
                write!(f, "Modifying ({draft_first}, {draft_second})")
            }
            ReviewState::Ready { pair } => write!(f, "Ready with {pair}"),
        }
    }
}

/// One image's review cycle, and the single mutator of its `ReviewState`.
///
/// The methods are the transition table; a method called outside the state
/// it belongs to returns `UnexpectedCommand` and changes nothing.
#[derive(Debug, Default)]
pub struct ReviewCycle {
    state: ReviewState,
}

impl ReviewCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ReviewState {
        &self.state
    }

    /// A new image was supplied. Legal from every state: discards whatever
    /// the previous cycle held, including unsaved drafts.
    pub fn begin(&mut self) {
        self.state = ReviewState::Processing;
    }

    /// The pipeline finished. Two or more tokens seed a pair for decision;
    /// fewer end the cycle as insufficient.
    pub fn complete_extraction(&mut self, tokens: &[String]) -> Result<(), ReviewError> {
        if self.state != ReviewState::Processing {
            return Err(self.unexpected("complete_extraction"));
        }
        self.state = match NumberPair::from_leading(tokens) {
            Some(pair) => ReviewState::AwaitingDecision { pair },
            None => ReviewState::InsufficientResults { count: tokens.len() },
        };
        Ok(())
    }

    /// The pipeline failed. The cycle ends and the machine is ready for a
    /// new image.
    pub fn fail_extraction(&mut self) -> Result<(), ReviewError> {
        if self.state != ReviewState::Processing {
            return Err(self.unexpected("fail_extraction"));
        }
        self.state = ReviewState::Idle;
        Ok(())
    }

    /// Accept the extracted pair as-is.
    pub fn accept(&mut self) -> Result<(), ReviewError> {
        self.transition("accept", |state| match state {
            ReviewState::AwaitingDecision { pair } => Ok(ReviewState::Ready { pair }),
            other => Err(other),
        })
    }

    /// Open the edit fields, seeded from the extracted pair.
    pub fn modify(&mut self) -> Result<(), ReviewError> {
        self.transition("modify", |state| match state {
            ReviewState::AwaitingDecision { pair } => Ok(ReviewState::Modifying {
                draft_first: pair.first.clone(),
                draft_second: pair.second.clone(),
                pair,
            }),
            other => Err(other),
        })
    }

    /// Replace the draft field contents (free-text edits).
    pub fn set_drafts(
        &mut self,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Result<(), ReviewError> {
        match &mut self.state {
            ReviewState::Modifying { draft_first, draft_second, .. } => {
                *draft_first = first.into();
                *draft_second = second.into();
                Ok(())
            }
            _ => Err(self.unexpected("set_drafts")),
        }
    }

    /// Confirm the edited values. Drafts are trimmed; a blank draft rejects
    /// the save and leaves the edit session exactly as it was.
    pub fn save(&mut self) -> Result<(), ReviewError> {
        match std::mem::take(&mut self.state) {
            ReviewState::Modifying { pair, draft_first, draft_second } => {
                match NumberPair::from_drafts(&draft_first, &draft_second) {
                    Ok(saved) => {
                        self.state = ReviewState::Ready { pair: saved };
                        Ok(())
                    }
                    Err(e) => {
                        self.state =
                            ReviewState::Modifying { pair, draft_first, draft_second };
                        Err(ReviewError::BlankDraft(e))
                    }
                }
            }
            other => {
                let err = unexpected_in("save", &other);
                self.state = other;
                Err(err)
            }
        }
    }

    /// Abandon the edits and return to the extracted pair.
    pub fn cancel(&mut self) -> Result<(), ReviewError> {
        self.transition("cancel", |state| match state {
            ReviewState::Modifying { pair, .. } => {
                Ok(ReviewState::AwaitingDecision { pair })
            }
            other => Err(other),
        })
    }

    /// Hand the confirmed pair off. The cycle ends and the machine goes
    /// inert until a new image arrives, so a pair is emitted at most once.
    pub fn start(&mut self) -> Result<NumberPair, ReviewError> {
        match std::mem::take(&mut self.state) {
            ReviewState::Ready { pair } => {
                self.state = ReviewState::Idle;
                Ok(pair)
            }
            other => {
                let err = unexpected_in("start", &other);
                self.state = other;
                Err(err)
            }
        }
    }

    fn transition(
        &mut self,
        command: &'static str,
        apply: impl FnOnce(ReviewState) -> Result<ReviewState, ReviewState>,
    ) -> Result<(), ReviewError> {
        match apply(std::mem::take(&mut self.state)) {
            Ok(next) => {
                self.state = next;
                Ok(())
            }
            Err(unchanged) => {
                let err = unexpected_in(command, &unchanged);
                self.state = unchanged;
                Err(err)
            }
        }
    }

    fn unexpected(&self, command: &'static str) -> ReviewError {
        unexpected_in(command, &self.state)
    }
}

fn unexpected_in(command: &'static str, state: &ReviewState) -> ReviewError {
    ReviewError::UnexpectedCommand { command, state: state.name() }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
