//! Fire-and-forget event emission (spec.md §4.8, §6).
//!
//! Every phase and notable decision publishes a [`PtcEvent`] onto a broadcast
//! channel. Publishing is synchronous but never blocks and never fails the
//! pipeline: a full channel or zero subscribers is simply dropped, matching
//! "failures in emission never abort the pipeline" (spec.md §4.8).

use crate::types::PtcEvent;
use tokio::sync::broadcast;

pub const PHASE: &str = "ptc:phase";
pub const EXECUTE: &str = "ptc:execute";
pub const ESCALATION: &str = "ptc:escalation";
pub const CODIE: &str = "codie";
pub const APPROVAL_CHECK: &str = "approval:check";

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PtcEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PtcEvent> {
        self.tx.subscribe()
    }

    /// Enqueue an event. A send error (no receivers) is expected and silent.
    pub fn emit(&self, event: PtcEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
