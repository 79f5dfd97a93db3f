//! Cooperative cancellation and progress tracking for matching runs.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::types::{MatchConfig, MatchEvent};

/// Receives progress percentages; purely observational
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, percent: u8);
}

impl ProgressSink for mpsc::UnboundedSender<MatchEvent> {
    fn on_progress(&self, percent: u8) {
        let _ = self.send(MatchEvent::Progress { percent });
    }
}

/// State of one matching run shared between the caller, the producer loop
/// and the work units.
///
/// Cancellation is cooperative: the producer checks the flag once per pair
/// and stops dispatching, while units already running finish normally.
pub struct MatchTask {
    id: Uuid,
    cancelled: AtomicBool,
    completed: AtomicU64,
    total: AtomicU64,
    /// Percent between progress reports, 0 when reporting is off
    step: AtomicU8,
    /// Smallest percent boundary not yet reported
    next_boundary: AtomicU8,
    percent: AtomicU8,
    sink: Option<Arc<dyn ProgressSink>>,
    events: Option<mpsc::UnboundedSender<MatchEvent>>,
}

impl MatchTask {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            cancelled: AtomicBool::new(false),
            completed: AtomicU64::new(0),
            total: AtomicU64::new(0),
            step: AtomicU8::new(0),
            next_boundary: AtomicU8::new(0),
            percent: AtomicU8::new(0),
            sink: None,
            events: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<MatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Reset counters for a run over `total` pairs
    pub(crate) fn begin(&self, total: u64, config: &MatchConfig) {
        let step = if total > config.large_task_threshold {
            config.progress_step_percent
        } else {
            0
        };
        self.total.store(total, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        self.percent.store(0, Ordering::SeqCst);
        self.step.store(step, Ordering::SeqCst);
        self.next_boundary.store(step, Ordering::SeqCst);
        self.emit(MatchEvent::Started {
            run_id: self.id.to_string(),
            total,
        });
    }

    /// Count one finished pair and report every step boundary it crosses.
    ///
    /// Concurrent completers claim disjoint boundary ranges through a CAS on
    /// `next_boundary`, so each boundary is reported exactly once. The final
    /// completion always reports 100.
    pub(crate) fn record_completion(&self) {
        let done = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        let step = self.step.load(Ordering::Relaxed);
        if step == 0 {
            return;
        }
        let total = self.total.load(Ordering::Relaxed).max(1);
        let percent = if done >= total {
            100
        } else {
            (done * 100 / total) as u8
        };

        let mut next = self.next_boundary.load(Ordering::Acquire);
        let reached = loop {
            if next > 100 || percent < next {
                return;
            }
            let reached = if percent == 100 {
                100
            } else {
                percent - percent % step
            };
            let following = if reached >= 100 {
                101
            } else {
                (reached + step).min(100)
            };
            match self.next_boundary.compare_exchange(
                next,
                following,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break reached,
                Err(actual) => next = actual,
            }
        };

        self.percent.fetch_max(reached, Ordering::AcqRel);
        let mut boundary = next;
        while boundary < reached {
            self.report(boundary);
            boundary += step;
        }
        self.report(reached);
    }

    fn report(&self, percent: u8) {
        if let Some(sink) = &self.sink {
            sink.on_progress(percent);
        }
        self.emit(MatchEvent::Progress { percent });
    }

    pub(crate) fn emit(&self, event: MatchEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    /// Last reported percentage
    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Acquire)
    }
}

impl Default for MatchTask {
    fn default() -> Self {
        Self::new()
    }
}
