pub mod api;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod io;
pub mod map;
pub mod normalize;
pub mod partition;
pub mod queue;
pub mod reduce;
pub mod runtime;
pub mod stats;
pub mod utils;
pub mod writer;

pub use api::{AggregationTable, LineSource, Normalizer, Occurrence, OccurrenceSink, Record};
pub use config::PipelineConfig;
pub use coordinator::TerminationCoordinator;
pub use io::{FileSource, MemorySource};
pub use normalize::AlnumPrefix;
pub use partition::Partitioner;
pub use queue::{BoundedQueue, Dequeued, QueueError, QueueMetrics};
pub use runtime::Pipeline;
pub use stats::{MapOutcome, MapReport, ReduceReport, RunSummary};
pub use writer::{CollectSink, OutputFormat, PartitionFileSink, WriterSink};
