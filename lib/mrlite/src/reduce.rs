use crate::api::{AggregationTable, Occurrence, OccurrenceSink, Record};
use crate::queue::{BoundedQueue, Dequeued};
use crate::stats::ReduceReport;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReducePhase {
    Running,
    Draining,
    Terminated,
}

/// Consumes one partition queue into a key -> occurrences table, then hands
/// the table to the shared sink while holding the output lock.
pub struct ReduceWorker<'a, S> {
    queue: &'a BoundedQueue<Record>,
    output: &'a Mutex<S>,
    table: AggregationTable,
    phase: ReducePhase,
    records: u64,
}

impl<'a, S: OccurrenceSink> ReduceWorker<'a, S> {
    pub fn new(queue: &'a BoundedQueue<Record>, output: &'a Mutex<S>) -> Self {
        Self { queue, output, table: AggregationTable::new(), phase: ReducePhase::Running, records: 0 }
    }

    pub fn partition(&self) -> usize { self.queue.partition() }

    pub fn phase(&self) -> ReducePhase { self.phase }

    pub fn table(&self) -> &AggregationTable { &self.table }

    pub fn run(mut self) -> Result<ReduceReport> {
        let start = Instant::now();
        debug!(partition = self.partition(), "reduce task running");

        while let Dequeued::Item(record) = self.queue.get() {
            self.absorb(record);
        }

        // `get` hands out leftovers before reporting shutdown, so this only
        // confirms the queue is empty under the shutdown condition
        self.enter(ReducePhase::Draining);
        while let Some(record) = self.queue.try_get() {
            self.absorb(record);
        }

        let report = ReduceReport {
            partition: self.partition(),
            records: self.records,
            keys: self.table.len(),
            wall_ms: 0,
        };
        self.enter(ReducePhase::Terminated);
        self.emit()?;
        Ok(ReduceReport { wall_ms: start.elapsed().as_millis() as u64, ..report })
    }

    /// Each record adds exactly one occurrence to its key's list.
    pub fn absorb(&mut self, record: Record) {
        let Record { key, source_id, position } = record;
        self.table.entry(key).or_default().push(Occurrence { source_id, position });
        self.records += 1;
    }

    fn enter(&mut self, phase: ReducePhase) {
        debug!(partition = self.partition(), from = ?self.phase, to = ?phase, records = self.records, "reduce phase change");
        self.phase = phase;
    }

    fn emit(&mut self) -> Result<()> {
        let table = std::mem::take(&mut self.table);
        let mut sink = self.output.lock();
        sink.emit(self.partition(), &table).with_context(|| format!("emit partition {}", self.partition()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::CollectSink;
    use anyhow::bail;
    use std::sync::Arc;
    use std::thread;

    fn record(key: &str, source: &str, position: u64) -> Record {
        Record { key: key.into(), source_id: Arc::from(source), position }
    }

    #[test]
    fn absorb_appends_in_dequeue_order() {
        let queue = BoundedQueue::new(0, 1);
        let output = Mutex::new(CollectSink::new());
        let mut worker = ReduceWorker::new(&queue, &output);
        worker.absorb(record("apple", "a", 1));
        worker.absorb(record("banana", "a", 2));
        worker.absorb(record("apple", "b", 1));
        assert_eq!(worker.phase(), ReducePhase::Running);
        assert_eq!(worker.table()["apple"], vec![Occurrence::new("a", 1), Occurrence::new("b", 1)]);
        assert_eq!(worker.table()["banana"], vec![Occurrence::new("a", 2)]);
    }

    #[test]
    fn runs_until_shutdown_then_emits_once() {
        let queue = BoundedQueue::new(4, 2);
        let output = Mutex::new(CollectSink::new());
        let report = thread::scope(|s| {
            let handle = s.spawn(|| ReduceWorker::new(&queue, &output).run());
            for i in 1..=5 {
                queue.put(record("pear", "f", i)).unwrap();
            }
            queue.close_for_shutdown();
            handle.join().unwrap()
        })
        .unwrap();

        assert_eq!(report.partition, 4);
        assert_eq!(report.records, 5);
        assert_eq!(report.keys, 1);
        let sink = output.into_inner();
        assert_eq!(sink.tables().len(), 1);
        let (partition, table) = &sink.tables()[0];
        assert_eq!(*partition, 4);
        let positions: Vec<u64> = table["pear"].iter().map(|o| o.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn empty_queue_after_shutdown_terminates_with_empty_table() {
        let queue = BoundedQueue::new(0, 3);
        queue.close_for_shutdown();
        let output = Mutex::new(CollectSink::new());
        let report = ReduceWorker::new(&queue, &output).run().unwrap();
        assert_eq!((report.records, report.keys), (0, 0));
        assert!(output.into_inner().tables()[0].1.is_empty());
    }

    #[test]
    fn records_queued_before_shutdown_are_all_aggregated() {
        let queue = BoundedQueue::new(2, 3);
        queue.put(record("fig", "a", 1)).unwrap();
        queue.put(record("plum", "a", 2)).unwrap();
        queue.put(record("fig", "b", 4)).unwrap();
        queue.close_for_shutdown();
        let output = Mutex::new(CollectSink::new());
        let report = ReduceWorker::new(&queue, &output).run().unwrap();

        assert_eq!((report.records, report.keys), (3, 2));
        assert!(queue.is_empty());
        let m = queue.metrics();
        assert_eq!((m.puts, m.gets), (3, 3));
        let sink = output.into_inner();
        assert_eq!(sink.tables()[0].1["fig"], vec![Occurrence::new("a", 1), Occurrence::new("b", 4)]);
    }

    struct FailingSink;

    impl OccurrenceSink for FailingSink {
        fn emit(&mut self, _partition: usize, _table: &AggregationTable) -> anyhow::Result<()> {
            bail!("disk full")
        }
    }

    #[test]
    fn sink_failure_is_reported() {
        let queue = BoundedQueue::new(1, 3);
        queue.put(record("kiwi", "f", 1)).unwrap();
        queue.close_for_shutdown();
        let output = Mutex::new(FailingSink);
        let err = ReduceWorker::new(&queue, &output).run().unwrap_err();
        assert!(format!("{:#}", err).contains("emit partition 1"));
        assert!(format!("{:#}", err).contains("disk full"));
    }
}
