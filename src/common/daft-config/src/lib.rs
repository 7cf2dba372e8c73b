use serde::{Deserialize, Serialize};

/// Environment variable overriding [`DaftExecutionConfig::sample_size_for_sort`].
pub const SAMPLE_SIZE_FOR_SORT: &str = "DAFT_SAMPLE_SIZE_FOR_SORT";

/// Environment variable overriding [`DaftExecutionConfig::fanout_random_seed`].
pub const FANOUT_RANDOM_SEED: &str = "DAFT_FANOUT_RANDOM_SEED";

/// Configurations for Daft to use when building and running execution steps.
///  Note that this should be immutable for a given end-to-end execution of a logical plan.
///
/// These knobs only shape how individual instructions behave once a task runs:
/// 1. How many rows each partition contributes to the sort boundary estimate
/// 2. Whether random fanouts are reproducible across runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaftExecutionConfig {
    pub sample_size_for_sort: usize,
    pub fanout_random_seed: Option<u64>,
}

impl Default for DaftExecutionConfig {
    fn default() -> Self {
        Self {
            sample_size_for_sort: 20,
            fanout_random_seed: None,
        }
    }
}

impl DaftExecutionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(val) = lookup(SAMPLE_SIZE_FOR_SORT) {
            match val.trim().parse::<usize>() {
                Ok(size) if size > 0 => cfg.sample_size_for_sort = size,
                _ => log::warn!("Ignoring invalid {SAMPLE_SIZE_FOR_SORT}={val:?}"),
            }
        }
        if let Some(val) = lookup(FANOUT_RANDOM_SEED) {
            match val.trim().parse::<u64>() {
                Ok(seed) => cfg.fanout_random_seed = Some(seed),
                Err(_) => log::warn!("Ignoring invalid {FANOUT_RANDOM_SEED}={val:?}"),
            }
        }
        cfg
    }
}
