//! Progress tracking and cooperative cancellation for analysis runs.
//!
//! Progress is two-tiered: the run advances through its configured levels,
//! and each level advances through its own groups (a zone, a building
//! category, one equipment record). A level announces its step count once
//! its groups are known, so a host can show both "level 2 of 4" and
//! "37 of 120 groups".

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{AnalysisError, Result};
use crate::model::Level;

/// Called after every completed step and level
pub type ProgressListener = Arc<dyn Fn(&AnalysisProgress) + Send + Sync>;

// 0 means no level is running; otherwise 1 + index into `Level::ALL`
const NO_LEVEL: usize = 0;

#[derive(Debug, Default)]
struct Counters {
    levels_completed: AtomicUsize,
    levels_total: AtomicUsize,
    current_level: AtomicUsize,
    steps_completed: AtomicUsize,
    steps_total: AtomicUsize,
    cancelled: AtomicBool,
}

/// Point-in-time view of an [`AnalysisProgress`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub current_level: Option<Level>,
    pub levels_completed: usize,
    pub levels_total: usize,
    pub steps_completed: usize,
    pub steps_total: usize,
}

impl ProgressSnapshot {
    /// Overall completion in [0, 1], counting the running level's steps
    /// as a fraction of one level
    pub fn fraction(&self) -> f64 {
        if self.levels_total == 0 {
            return 0.0;
        }
        let partial = if self.current_level.is_some() && self.steps_total > 0 {
            self.steps_completed as f64 / self.steps_total as f64
        } else {
            0.0
        };
        ((self.levels_completed as f64 + partial) / self.levels_total as f64).min(1.0)
    }
}

/// Shared progress handle.
///
/// Clones share the same counters and listener, so a caller can keep one
/// clone to poll or cancel while the analysis holds another.
#[derive(Clone, Default)]
pub struct AnalysisProgress {
    counters: Arc<Counters>,
    listener: Option<ProgressListener>,
}

impl fmt::Debug for AnalysisProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisProgress")
            .field("snapshot", &self.snapshot())
            .field("cancelled", &self.is_cancelled())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl AnalysisProgress {
    #[must_use]
    pub fn new(levels_total: usize) -> Self {
        let progress = Self::default();
        progress
            .counters
            .levels_total
            .store(levels_total, Ordering::Relaxed);
        progress
    }

    /// Notify `listener` after each step and each finished level. The
    /// listener runs on the analysis thread (a rayon worker for
    /// building-to-building) and may cancel the run.
    #[must_use]
    pub fn with_listener(mut self, listener: impl Fn(&AnalysisProgress) + Send + Sync + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Levels finished so far
    #[must_use]
    pub fn completed(&self) -> usize {
        self.counters.levels_completed.load(Ordering::Relaxed)
    }

    /// Levels in this run
    #[must_use]
    pub fn total(&self) -> usize {
        self.counters.levels_total.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn current_level(&self) -> Option<Level> {
        match self.counters.current_level.load(Ordering::Relaxed) {
            NO_LEVEL => None,
            i => Level::ALL.get(i - 1).copied(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        let c = &self.counters;
        ProgressSnapshot {
            current_level: self.current_level(),
            levels_completed: c.levels_completed.load(Ordering::Relaxed),
            levels_total: c.levels_total.load(Ordering::Relaxed),
            steps_completed: c.steps_completed.load(Ordering::Relaxed),
            steps_total: c.steps_total.load(Ordering::Relaxed),
        }
    }

    /// Start a new run over `levels_total` levels
    pub fn reset(&self, levels_total: usize) {
        let c = &self.counters;
        c.levels_completed.store(0, Ordering::Relaxed);
        c.levels_total.store(levels_total, Ordering::Relaxed);
        c.current_level.store(NO_LEVEL, Ordering::Relaxed);
        c.steps_completed.store(0, Ordering::Relaxed);
        c.steps_total.store(0, Ordering::Relaxed);
    }

    pub fn begin_level(&self, level: Level) {
        let index = Level::ALL.iter().position(|l| *l == level).map_or(NO_LEVEL, |i| i + 1);
        let c = &self.counters;
        c.current_level.store(index, Ordering::Relaxed);
        c.steps_completed.store(0, Ordering::Relaxed);
        c.steps_total.store(0, Ordering::Relaxed);
    }

    /// Number of groups the running level will score
    pub fn set_level_steps(&self, steps: usize) {
        self.counters.steps_total.store(steps, Ordering::Relaxed);
    }

    pub fn complete_step(&self) {
        self.counters.steps_completed.fetch_add(1, Ordering::Relaxed);
        self.notify();
    }

    pub fn finish_level(&self) {
        let c = &self.counters;
        c.current_level.store(NO_LEVEL, Ordering::Relaxed);
        c.levels_completed.fetch_add(1, Ordering::Relaxed);
        self.notify();
    }

    pub fn cancel(&self) {
        self.counters.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.counters.cancelled.load(Ordering::Relaxed)
    }

    fn notify(&self) {
        if let Some(listener) = &self.listener {
            listener(self);
        }
    }
}

/// `Err(Cancelled)` once the optional handle has been cancelled
pub fn check_cancelled(progress: Option<&AnalysisProgress>) -> Result<()> {
    match progress {
        Some(p) if p.is_cancelled() => Err(AnalysisError::Cancelled),
        _ => Ok(()),
    }
}

/// Run one step of a level: bail out if cancelled, otherwise run `work` and
/// count it
pub(crate) fn step<T>(progress: Option<&AnalysisProgress>, work: impl FnOnce() -> T) -> Result<T> {
    check_cancelled(progress)?;
    let out = work();
    if let Some(p) = progress {
        p.complete_step();
    }
    Ok(out)
}

pub(crate) fn set_level_steps(progress: Option<&AnalysisProgress>, steps: usize) {
    if let Some(p) = progress {
        p.set_level_steps(steps);
    }
}
