use crate::engine::populate::populate;
use crate::engine::slow_read::slow_fetch;
use crate::error::RunError;
use crate::events::{EventSink, RunEvent};
use crate::store::StoreClient;
use crate::transport::Dialer;
use slowdrip_common::RunConfig;
use std::sync::Arc;

/// Progress of a run. Phases only move forward and never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Init,
    Flushed,
    Populated,
    Drained,
    Done,
}

/// Runs flush, population and slow-read strictly one after another.
pub struct Orchestrator<D: Dialer> {
    config: Arc<RunConfig>,
    store: Arc<dyn StoreClient>,
    dialer: Arc<D>,
    events: Arc<dyn EventSink>,
    phase: Phase,
}

impl<D: Dialer> Orchestrator<D> {
    pub fn new(
        config: RunConfig,
        store: Arc<dyn StoreClient>,
        dialer: Arc<D>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            dialer,
            events,
            phase: Phase::Init,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Drives the run to completion.
    ///
    /// A failed flush stops the run before any key is written. Worker failures
    /// in either phase are reported through the event sink and never stop the
    /// run.
    pub async fn run(&mut self) -> Result<Phase, RunError> {
        if self.config.skip_flush {
            self.events.emit(RunEvent::FlushSkipped);
        } else {
            self.store.flush_all().await?;
            self.advance(Phase::Flushed);
        }

        populate(
            Arc::clone(&self.config),
            Arc::clone(&self.store),
            Arc::clone(&self.events),
        )
        .await;
        self.advance(Phase::Populated);

        slow_fetch(
            Arc::clone(&self.config),
            Arc::clone(&self.dialer),
            Arc::clone(&self.events),
        )
        .await;
        self.advance(Phase::Drained);

        self.advance(Phase::Done);
        Ok(self.phase)
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(next > self.phase, "phases only move forward");
        self.phase = next;
        self.events.emit(RunEvent::PhaseEntered(next));
    }
}
