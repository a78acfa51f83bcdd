use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw per-repetition accumulation: resource name -> durations in ms,
/// one entry appended per repetition in which the resource was observed.
pub type SampleSet = BTreeMap<String, Vec<f64>>;

/// Aggregated output: resource name -> mean of its strictly-positive
/// durations, or 0.0 when none were positive.
pub type AverageMap = BTreeMap<String, f64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub url: String,
    pub cycles: u32,
    pub heading_selector: String,
    pub expected_heading: String,
    pub headless: bool,
    pub meas_id: String,
}

/// Progress events emitted by the engine and consumed by the CLI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SampleEvent {
    CycleStarted {
        cycle: u32,
        total: u32,
    },
    PageVerified {
        cycle: u32,
        heading: String,
    },
    EntriesCollected {
        cycle: u32,
        count: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default)]
    pub timestamp_utc: String,
    pub url: String,
    pub cycles: u32,
    pub meas_id: String,
    pub samples: SampleSet,
    pub averages: AverageMap,
}
