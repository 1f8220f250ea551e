//! Centralized environment variable names and default values for mrlite runs.

// Environment variable names
pub const ENV_NUM_MAPPERS: &str = "MRLITE_NUM_MAPPERS";
pub const ENV_NUM_REDUCERS: &str = "MRLITE_NUM_REDUCERS";
pub const ENV_QUEUE_CAP: &str = "MRLITE_QUEUE_CAP";

// Defaults
// Slots per partition queue before map workers block
pub const DEFAULT_QUEUE_CAP: usize = 10;
