use crate::constants::{DEFAULT_QUEUE_CAP, ENV_NUM_REDUCERS, ENV_QUEUE_CAP};
use crate::utils::env_count;
use anyhow::{ensure, Result};
use serde::Serialize;

/// Reducer count and per-partition queue capacity for one run.
///
/// The number of map workers is not configured here: it is the number of
/// sources added to the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    pub reducers: usize,
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { reducers: num_cpus::get().max(1), queue_capacity: DEFAULT_QUEUE_CAP }
    }
}

impl PipelineConfig {
    pub fn new(reducers: usize, queue_capacity: usize) -> Self { Self { reducers, queue_capacity } }

    /// Defaults overridden by `MRLITE_NUM_REDUCERS` / `MRLITE_QUEUE_CAP` when set.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            reducers: env_count(ENV_NUM_REDUCERS).unwrap_or(defaults.reducers),
            queue_capacity: env_count(ENV_QUEUE_CAP).unwrap_or(defaults.queue_capacity),
        }
    }

    pub fn with_reducers(mut self, reducers: usize) -> Self {
        self.reducers = reducers;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.reducers > 0, "number of reduce workers must be at least 1");
        ensure!(self.queue_capacity > 0, "queue capacity must be at least 1");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = PipelineConfig::default();
        assert!(c.reducers >= 1);
        assert_eq!(c.queue_capacity, 10);
        c.validate().unwrap();
    }

    #[test]
    fn builder_overrides() {
        let c = PipelineConfig::default().with_reducers(3).with_queue_capacity(2);
        assert_eq!(c, PipelineConfig::new(3, 2));
    }

    #[test]
    fn environment_overrides_defaults() {
        std::env::set_var(ENV_NUM_REDUCERS, "5");
        std::env::set_var(ENV_QUEUE_CAP, "0");
        let c = PipelineConfig::from_env();
        std::env::remove_var(ENV_NUM_REDUCERS);
        std::env::remove_var(ENV_QUEUE_CAP);
        assert_eq!(c.reducers, 5);
        assert_eq!(c.queue_capacity, DEFAULT_QUEUE_CAP);
    }

    #[test]
    fn zero_values_fail_validation() {
        let err = PipelineConfig::new(0, 10).validate().unwrap_err();
        assert!(err.to_string().contains("reduce workers"));
        let err = PipelineConfig::new(2, 0).validate().unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }
}
