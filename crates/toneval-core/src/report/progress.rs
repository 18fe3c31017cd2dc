//! Progress reporting for experiment runs. The driver emits done/total in
//! completion order; the CLI consumes it through a sink.

use std::sync::Arc;

/// How many examples are done out of the total for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub done: usize,
    pub total: usize,
}

impl ProgressEvent {
    /// Every `every`-th example, and the last one.
    pub fn is_milestone(&self, every: usize) -> bool {
        self.done == self.total || (every > 0 && self.done % every == 0)
    }
}

/// Sink for progress events. Called once per completed example.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;
