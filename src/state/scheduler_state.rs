//! Lifecycle states of a crawl

use std::fmt;

/// Scheduler lifecycle
///
/// A crawl moves strictly forward: `Idle → Running → Draining → Stopped`.
/// A stop request may skip straight to `Stopped` from any live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    /// Seeds loaded, nothing fetched yet
    Idle,

    /// Workers are pulling from the frontier
    Running,

    /// The frontier drained or a stop was requested; waiting for workers
    Draining,

    /// Terminal; the frontier is closed
    Stopped,
}

impl SchedulerState {
    /// Returns true once no further work will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Whether workers may take new URLs in this state
    pub fn accepts_work(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Checks if transitioning from this state to another is valid
    ///
    /// # Valid Transitions
    ///
    /// - `Idle` → `Running` (crawl started)
    /// - `Idle` → `Stopped` (stopped before starting)
    /// - `Running` → `Draining` (frontier drained or stop requested)
    /// - `Running` → `Stopped`
    /// - `Draining` → `Stopped` (last worker finished)
    pub fn can_transition_to(&self, next: SchedulerState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Idle, Self::Stopped)
                | (Self::Running, Self::Draining)
                | (Self::Running, Self::Stopped)
                | (Self::Draining, Self::Stopped)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
