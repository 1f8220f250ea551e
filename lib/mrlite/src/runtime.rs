use crate::api::{LineSource, Normalizer, OccurrenceSink, Record};
use crate::config::PipelineConfig;
use crate::coordinator::TerminationCoordinator;
use crate::io::{expand_inputs, FileSource};
use crate::map::MapWorker;
use crate::queue::BoundedQueue;
use crate::reduce::ReduceWorker;
use crate::stats::{ReduceReport, RunSummary};
use crate::writer::CollectSink;
use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use tracing::{error, info};

/// Wires sources, partition queues and workers into one run.
///
/// One thread per source (map) and per partition (reduce). Reducers are
/// started first, map workers are handed to a [`TerminationCoordinator`], and
/// the run returns once every reducer has emitted its table.
pub struct Pipeline {
    config: PipelineConfig,
    sources: Vec<Box<dyn LineSource>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self { Self { config, sources: vec![] } }

    pub fn config(&self) -> &PipelineConfig { &self.config }

    pub fn num_sources(&self) -> usize { self.sources.len() }

    pub fn add_source(&mut self, source: impl LineSource + 'static) { self.sources.push(Box::new(source)); }

    pub fn add_input(&mut self, path: impl Into<PathBuf>) { self.add_source(FileSource::new(path)); }

    /// Adds every file under each input; see [`expand_inputs`].
    pub fn add_inputs<P: AsRef<Path>>(&mut self, inputs: &[P]) -> Result<usize> {
        let files = expand_inputs(inputs)?;
        let n = files.len();
        for file in files {
            self.add_input(file);
        }
        Ok(n)
    }

    /// Runs with an in-memory sink and returns the tables alongside the summary.
    pub fn run_collect(&self, normalizer: &dyn Normalizer) -> Result<(RunSummary, CollectSink)> {
        let mut sink = CollectSink::new();
        let summary = self.run(normalizer, &mut sink)?;
        Ok((summary, sink))
    }

    pub fn run<S: OccurrenceSink>(&self, normalizer: &dyn Normalizer, sink: S) -> Result<RunSummary> {
        self.config.validate()?;
        let start = Instant::now();
        let PipelineConfig { reducers: num_reducers, queue_capacity } = self.config;
        let queues: Vec<BoundedQueue<Record>> = (0..num_reducers).map(|p| BoundedQueue::new(p, queue_capacity)).collect();
        let output = Mutex::new(sink);
        info!(mappers = self.sources.len(), reducers = num_reducers, queue_capacity, "mrlite starting");

        let (maps, reduce_results) = thread::scope(|scope| -> Result<_> {
            let mut reducers = Vec::with_capacity(num_reducers);
            for queue in &queues {
                let worker = ReduceWorker::new(queue, &output);
                let spawned = thread::Builder::new()
                    .name(format!("reduce-{}", queue.partition()))
                    .spawn_scoped(scope, move || worker.run());
                match spawned {
                    Ok(handle) => reducers.push((queue.partition(), handle)),
                    Err(e) => {
                        // nothing was produced yet; release the reducers already waiting
                        queues.iter().for_each(BoundedQueue::close_for_shutdown);
                        return Err(anyhow::Error::from(e).context("spawn reduce worker"));
                    }
                }
            }

            let mut coordinator = TerminationCoordinator::new(&queues);
            let mut spawn_error = None;
            for (worker, source) in self.sources.iter().enumerate() {
                let map = MapWorker::new(worker, &**source, normalizer, &queues);
                let spawned = thread::Builder::new()
                    .name(format!("map-{}", worker))
                    .spawn_scoped(scope, move || map.run());
                match spawned {
                    Ok(handle) => coordinator.register(worker, source.id(), handle),
                    Err(e) => {
                        spawn_error = Some(anyhow::Error::from(e).context(format!("spawn map worker for {}", source.id())));
                        break;
                    }
                }
            }
            let maps = coordinator.finish();

            let reduce_results: Vec<Result<ReduceReport>> = reducers
                .into_iter()
                .map(|(partition, handle)| handle.join().unwrap_or_else(|_| Err(anyhow!("reduce worker {} panicked", partition))))
                .collect();
            match spawn_error {
                Some(e) => Err(e),
                None => Ok((maps, reduce_results)),
            }
        })?;

        let mut reduces = Vec::with_capacity(reduce_results.len());
        let mut first_error = None;
        for result in reduce_results {
            match result {
                Ok(report) => reduces.push(report),
                Err(e) => {
                    error!("reduce failed: {:#}", e);
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e).context("reduce phase failed");
        }

        let queue_metrics = queues.iter().map(BoundedQueue::metrics).collect();
        let summary = RunSummary::new(queue_capacity, maps, reduces, queue_metrics, start.elapsed().as_millis() as u64);
        summary.log_phases();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;
    use crate::normalize::AlnumPrefix;

    #[test]
    fn zero_reducers_is_a_config_error() {
        let mut p = Pipeline::new(PipelineConfig::new(0, 10));
        p.add_source(MemorySource::new("a", ["x"]));
        assert!(p.run_collect(&AlnumPrefix::new()).is_err());
    }

    #[test]
    fn no_sources_still_terminates_every_reducer() {
        let p = Pipeline::new(PipelineConfig::new(3, 2));
        let (summary, sink) = p.run_collect(&AlnumPrefix::new()).unwrap();
        assert_eq!(summary.reduces.len(), 3);
        assert_eq!(sink.tables().len(), 3);
        assert!(sink.tables().iter().all(|(_, t)| t.is_empty()));
    }

    #[test]
    fn closure_normalizer_is_accepted() {
        let mut p = Pipeline::new(PipelineConfig::new(2, 1));
        p.add_source(MemorySource::new("a", ["Hello", "World", "hello"]));
        let exact = |raw: &str| (!raw.is_empty()).then(|| raw.to_string());
        let (summary, sink) = p.run_collect(&exact).unwrap();
        assert_eq!(summary.totals.records, 3);
        let merged = sink.merged();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged["Hello"].len(), 1);
    }

    #[test]
    fn add_inputs_registers_one_source_per_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "y\n").unwrap();
        let mut p = Pipeline::new(PipelineConfig::new(1, 1));
        assert_eq!(p.add_inputs(&[dir.path()]).unwrap(), 2);
        assert_eq!(p.num_sources(), 2);
    }
}
