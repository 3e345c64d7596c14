//! Feedback submission with collaborator enhancement.
//!
//! A submitted record is stored `pending` first. In await mode the
//! collaborator runs inline; in background mode a worker thread runs it and
//! the outcome comes back over a channel. Only the owner of the store (the
//! request loop) applies outcomes, so there is still a single writer.

use crate::insight::{self, InsightEngine};
use crate::model::{Language, StudentFeedback};
use crate::mutate::{self, EnhancementOutcome, NewFeedback};
use crate::store::RecordStore;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    Await,
    Background,
}

impl SubmitMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "await" => Some(Self::Await),
            "background" => Some(Self::Background),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("feedback for student {0} is still being enhanced")]
    Pending(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

struct Completion {
    feedback_id: String,
    outcome: EnhancementOutcome,
}

pub struct EnhancementQueue {
    engine: Arc<dyn InsightEngine>,
    // How long `flush` waits for outstanding workers before defaulting them.
    flush_wait: Duration,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    // feedback id -> student id
    in_flight: HashMap<String, String>,
}

fn outcome_for(engine: &dyn InsightEngine, comment: &str, lang: Language) -> EnhancementOutcome {
    match insight::enhance_feedback(engine, comment, lang) {
        Some(text) => EnhancementOutcome::Enhanced(text),
        None => EnhancementOutcome::Defaulted,
    }
}

impl EnhancementQueue {
    pub fn new(engine: Arc<dyn InsightEngine>, flush_wait: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            engine,
            flush_wait,
            tx,
            rx,
            in_flight: HashMap::new(),
        }
    }

    pub fn engine(&self) -> &dyn InsightEngine {
        self.engine.as_ref()
    }

    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_pending_for(&self, student_id: &str) -> bool {
        self.in_flight.values().any(|s| s == student_id)
    }

    pub fn submit(
        &mut self,
        store: &RecordStore,
        new: NewFeedback,
        lang: Language,
        mode: SubmitMode,
    ) -> Result<StudentFeedback, SubmitError> {
        if self.is_pending_for(&new.student_id) {
            return Err(SubmitError::Pending(new.student_id));
        }
        let pending = mutate::begin_feedback(store, new)?;

        match mode {
            SubmitMode::Await => {
                let outcome = outcome_for(self.engine.as_ref(), &pending.comment, lang);
                let resolved = mutate::resolve_feedback(store, &pending.id, outcome)?;
                Ok(resolved.unwrap_or(pending))
            }
            SubmitMode::Background => {
                let engine = Arc::clone(&self.engine);
                let tx = self.tx.clone();
                let feedback_id = pending.id.clone();
                let comment = pending.comment.clone();
                std::thread::spawn(move || {
                    // A panicking engine still reports back.
                    let outcome =
                        panic::catch_unwind(AssertUnwindSafe(|| outcome_for(engine.as_ref(), &comment, lang)))
                            .unwrap_or(EnhancementOutcome::Defaulted);
                    let _ = tx.send(Completion {
                        feedback_id,
                        outcome,
                    });
                });
                self.in_flight
                    .insert(pending.id.clone(), pending.student_id.clone());
                tracing::debug!(feedback_id = %pending.id, "feedback enhancement queued");
                Ok(pending)
            }
        }
    }

    /// Applies every outcome that has already arrived. Never blocks.
    pub fn drain(&mut self, store: &RecordStore) -> usize {
        let mut applied = 0;
        while let Ok(done) = self.rx.try_recv() {
            if self.apply(store, done) {
                applied += 1;
            }
        }
        applied
    }

    /// Blocks until every queued enhancement has been applied. Workers still
    /// running when the wait runs out are settled as defaulted; their late
    /// results are dropped.
    pub fn flush(&mut self, store: &RecordStore) -> usize {
        let mut applied = self.drain(store);
        let deadline = Instant::now() + self.flush_wait;
        while !self.in_flight.is_empty() {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(done) => {
                    if self.apply(store, done) {
                        applied += 1;
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!(
                        outstanding = self.in_flight.len(),
                        "gave up waiting for feedback enhancements; keeping original comments"
                    );
                    let stuck: Vec<String> = self.in_flight.keys().cloned().collect();
                    for feedback_id in stuck {
                        let done = Completion {
                            feedback_id,
                            outcome: EnhancementOutcome::Defaulted,
                        };
                        if self.apply(store, done) {
                            applied += 1;
                        }
                    }
                    break;
                }
            }
        }
        applied
    }

    /// Defaults every stored `pending` record no worker of this queue owns,
    /// e.g. rows left by a crash or carried in by an imported snapshot.
    pub fn settle_orphans(&self, store: &RecordStore) -> usize {
        match mutate::default_pending_feedback(store, |id| self.in_flight.contains_key(id)) {
            Ok(n) => {
                if n > 0 {
                    tracing::info!(settled = n, "defaulted orphaned pending feedback");
                }
                n
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to settle orphaned pending feedback");
                0
            }
        }
    }

    /// Returns false for results nobody is waiting on any more.
    fn apply(&mut self, store: &RecordStore, done: Completion) -> bool {
        if self.in_flight.remove(&done.feedback_id).is_none() {
            tracing::debug!(feedback_id = %done.feedback_id, "dropping late enhancement result");
            return false;
        }
        match mutate::resolve_feedback(store, &done.feedback_id, done.outcome) {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(feedback_id = %done.feedback_id, "enhanced feedback record no longer exists")
            }
            Err(e) => {
                tracing::warn!(feedback_id = %done.feedback_id, error = %e, "failed to store enhanced feedback")
            }
        }
        true
    }
}
