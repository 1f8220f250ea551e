use crate::api::{LineSource, Normalizer, Record};
use crate::partition::Partitioner;
use crate::queue::BoundedQueue;
use crate::stats::{MapOutcome, MapReport};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Scans one source and routes every valid line to its partition queue.
///
/// `put` blocks while the target queue is full, which throttles this worker to
/// the pace of the slowest reducer it feeds. No end-of-stream marker is ever
/// enqueued; completion is observed by joining the worker's thread.
pub struct MapWorker<'a> {
    worker: usize,
    source: &'a dyn LineSource,
    normalizer: &'a dyn Normalizer,
    partitioner: Partitioner,
    queues: &'a [BoundedQueue<Record>],
}

impl<'a> MapWorker<'a> {
    /// `queues[p]` must be the queue of partition `p`.
    pub fn new(worker: usize, source: &'a dyn LineSource, normalizer: &'a dyn Normalizer, queues: &'a [BoundedQueue<Record>]) -> Self {
        Self { worker, source, normalizer, partitioner: Partitioner::new(queues.len()), queues }
    }

    pub fn run(self) -> MapReport {
        let start = Instant::now();
        let source_id: Arc<str> = Arc::from(self.source.id());
        let mut report = MapReport::new(self.worker, source_id.as_ref());
        debug!(worker = self.worker, source = %source_id, partitions = self.queues.len(), "map task starting");

        let lines = match self.source.open() {
            Ok(lines) => lines,
            Err(e) => {
                error!(worker = self.worker, source = %source_id, "no such source: {:#}", e);
                report.outcome = MapOutcome::Unreadable { reason: format!("{:#}", e) };
                report.wall_ms = start.elapsed().as_millis() as u64;
                return report;
            }
        };

        for (idx, line) in lines.enumerate() {
            let position = idx as u64 + 1;
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    error!(worker = self.worker, source = %source_id, position, "read failed: {:#}", e);
                    report.outcome = MapOutcome::ReadError { position, reason: format!("{:#}", e) };
                    break;
                }
            };
            report.lines += 1;
            let Some(key) = self.normalizer.normalize(&line) else {
                report.skipped += 1;
                continue;
            };
            let partition = self.partitioner.partition(&key);
            let record = Record { key, source_id: Arc::clone(&source_id), position };
            if let Err(e) = self.queues[partition].put(record) {
                error!(worker = self.worker, source = %source_id, position, "enqueue rejected: {}", e);
                report.outcome = MapOutcome::Aborted { reason: e.to_string() };
                break;
            }
            report.records += 1;
        }

        report.wall_ms = start.elapsed().as_millis() as u64;
        debug!(worker = self.worker, source = %source_id, lines = report.lines, records = report.records,
               skipped = report.skipped, wall_ms = report.wall_ms, "map task finished");
        report
    }
}
