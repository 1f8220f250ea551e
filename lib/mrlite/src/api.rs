use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

// ========== Records exchanged between map and reduce workers ==========

/// One normalized key occurrence. Built by a map worker for every valid line,
/// moved through exactly one partition queue, consumed by that partition's reducer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub source_id: Arc<str>,
    /// 1-based line number within the source.
    pub position: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Occurrence {
    #[serde(rename = "source")]
    pub source_id: Arc<str>,
    pub position: u64,
}

impl Occurrence {
    pub fn new(source_id: impl Into<Arc<str>>, position: u64) -> Self {
        Self { source_id: source_id.into(), position }
    }
}

/// Per-reducer aggregation: key -> occurrences in the order the reducer dequeued them.
pub type AggregationTable = BTreeMap<String, Vec<Occurrence>>;

pub type LineIter<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;

// ========== Collaborator traits ==========

/// Ingestion side of a map worker.
///
/// `open` restarts the sequence from the first line every time it is called.
/// Failing to open is reported to the caller, never a panic.
pub trait LineSource: Send + Sync {
    fn id(&self) -> &str;
    fn open(&self) -> Result<LineIter<'_>>;
}

/// Turns a raw line into a canonical key; `None` marks the line as invalid.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, raw: &str) -> Option<String>;
}

impl<F> Normalizer for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn normalize(&self, raw: &str) -> Option<String> { self(raw) }
}

/// Receives each reducer's final table. Calls are serialized by the pipeline's
/// output lock, so an implementation writes one table completely per call.
pub trait OccurrenceSink: Send {
    fn emit(&mut self, partition: usize, table: &AggregationTable) -> Result<()>;
}

impl<S: OccurrenceSink + ?Sized> OccurrenceSink for &mut S {
    fn emit(&mut self, partition: usize, table: &AggregationTable) -> Result<()> {
        (**self).emit(partition, table)
    }
}

impl<S: OccurrenceSink + ?Sized> OccurrenceSink for Box<S> {
    fn emit(&mut self, partition: usize, table: &AggregationTable) -> Result<()> {
        (**self).emit(partition, table)
    }
}
