//! Normalizes the node's status and progress feeds into `(phase, counters)` tuples.

use crate::{MalformedEvent, NodeStatusEvent, PreloadProgressEvent, SyncCounters, SyncPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    Progress {
        phase: SyncPhase,
        counters: SyncCounters,
    },
    /// `preloadEnded` flipped to true. Carries the last reported phase.
    PreloadEnded { phase: SyncPhase },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeSyncMonitor {
    preload_ended: bool,
    phase: SyncPhase,
    counters: SyncCounters,
}

impl NodeSyncMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preload_ended(&self) -> bool {
        self.preload_ended
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn counters(&self) -> SyncCounters {
        self.counters
    }

    /// Only the false to true flip produces an event; a missing flag reads as false.
    pub fn observe_status(&mut self, event: &NodeStatusEvent) -> Option<MonitorEvent> {
        if self.preload_ended || event.preload_ended != Some(true) {
            return None;
        }
        self.preload_ended = true;
        Some(MonitorEvent::PreloadEnded { phase: self.phase })
    }

    pub fn observe_progress(
        &mut self,
        event: &PreloadProgressEvent,
    ) -> Result<Option<MonitorEvent>, MalformedEvent> {
        if self.preload_ended {
            return Ok(None);
        }
        let phase = resolve_phase(event)?;
        let extra = event.extra.as_ref();
        let current = non_negative("currentCount", extra.and_then(|e| e.current_count))?;
        let total = non_negative("totalCount", extra.and_then(|e| e.total_count))?;

        self.phase = phase;
        self.counters = SyncCounters::new(current, total);
        Ok(Some(MonitorEvent::Progress {
            phase,
            counters: self.counters,
        }))
    }
}

fn resolve_phase(event: &PreloadProgressEvent) -> Result<SyncPhase, MalformedEvent> {
    if let Some(kind) = event.extra.as_ref().and_then(|e| e.kind.as_deref()) {
        return SyncPhase::from_name(kind)
            .ok_or_else(|| MalformedEvent::UnknownPhase(kind.to_string()));
    }
    match event.current_phase {
        Some(index) => {
            SyncPhase::from_index(index).ok_or(MalformedEvent::PhaseOutOfRange(index))
        }
        None => Err(MalformedEvent::MissingPhase),
    }
}

fn non_negative(field: &'static str, value: Option<i64>) -> Result<u64, MalformedEvent> {
    match value {
        None => Ok(0),
        Some(v) => u64::try_from(v).map_err(|_| MalformedEvent::NegativeCounter { field, value: v }),
    }
}
