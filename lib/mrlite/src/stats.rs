use crate::queue::QueueMetrics;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MapOutcome {
    Completed,
    /// The source could not be opened; nothing was contributed.
    Unreadable { reason: String },
    /// Reading stopped at `position`; earlier records were delivered.
    ReadError { position: u64, reason: String },
    /// The worker stopped early (rejected put or panic).
    Aborted { reason: String },
}

impl MapOutcome {
    pub fn is_completed(&self) -> bool { matches!(self, MapOutcome::Completed) }
}

#[derive(Clone, Debug, Serialize)]
pub struct MapReport {
    pub worker: usize,
    pub source: String,
    pub lines: u64,
    pub records: u64,
    pub skipped: u64,
    pub outcome: MapOutcome,
    pub wall_ms: u64,
}

impl MapReport {
    pub fn new(worker: usize, source: impl Into<String>) -> Self {
        Self { worker, source: source.into(), lines: 0, records: 0, skipped: 0, outcome: MapOutcome::Completed, wall_ms: 0 }
    }

    pub fn panicked(worker: usize, source: impl Into<String>) -> Self {
        Self { outcome: MapOutcome::Aborted { reason: "map worker panicked".into() }, ..Self::new(worker, source) }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ReduceReport {
    pub partition: usize,
    pub records: u64,
    pub keys: usize,
    pub wall_ms: u64,
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct RunTotals {
    pub sources: usize,
    pub failed_sources: usize,
    pub lines: u64,
    pub records: u64,
    pub skipped: u64,
    pub keys: usize,
    pub min_map_ms: u64,
    pub max_map_ms: u64,
    pub min_reduce_ms: u64,
    pub max_reduce_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub reducers: usize,
    pub queue_capacity: usize,
    pub totals: RunTotals,
    pub maps: Vec<MapReport>,
    pub reduces: Vec<ReduceReport>,
    pub queues: Vec<QueueMetrics>,
    pub wall_ms: u64,
}

impl RunSummary {
    pub fn new(queue_capacity: usize, maps: Vec<MapReport>, mut reduces: Vec<ReduceReport>, queues: Vec<QueueMetrics>, wall_ms: u64) -> Self {
        reduces.sort_by_key(|r| r.partition);
        let totals = RunTotals {
            sources: maps.len(),
            failed_sources: maps.iter().filter(|m| !m.outcome.is_completed()).count(),
            lines: maps.iter().map(|m| m.lines).sum(),
            records: maps.iter().map(|m| m.records).sum(),
            skipped: maps.iter().map(|m| m.skipped).sum(),
            keys: reduces.iter().map(|r| r.keys).sum(),
            min_map_ms: maps.iter().map(|m| m.wall_ms).min().unwrap_or(0),
            max_map_ms: maps.iter().map(|m| m.wall_ms).max().unwrap_or(0),
            min_reduce_ms: reduces.iter().map(|r| r.wall_ms).min().unwrap_or(0),
            max_reduce_ms: reduces.iter().map(|r| r.wall_ms).max().unwrap_or(0),
        };
        Self { reducers: queues.len(), queue_capacity, totals, maps, reduces, queues, wall_ms }
    }

    /// Records that reached a reducer. Equal to `totals.records` on every
    /// successful run.
    pub fn records_reduced(&self) -> u64 { self.reduces.iter().map(|r| r.records).sum() }

    pub fn log_phases(&self) {
        let t = &self.totals;
        info!(phase = "map",
              tasks = t.sources, failed = t.failed_sources,
              lines = t.lines, records = t.records, skipped = t.skipped,
              min_task_ms = t.min_map_ms, max_task_ms = t.max_map_ms,
              "Map phase complete");
        let blocked_puts: u64 = self.queues.iter().map(|q| q.blocked_puts).sum();
        let peak_depth = self.queues.iter().map(|q| q.peak_depth).max().unwrap_or(0);
        info!(phase = "reduce",
              reducers = self.reduces.len(), total_records = self.records_reduced(), total_keys = t.keys,
              blocked_puts, peak_depth, capacity = self.queue_capacity,
              min_reducer_ms = t.min_reduce_ms, max_reducer_ms = t.max_reduce_ms,
              wall_ms = self.wall_ms,
              "Reduce phase complete");
        if self.records_reduced() != t.records {
            warn!(emitted = t.records, reduced = self.records_reduced(), "record counts differ between map and reduce");
        }
    }
}
