use crate::model::{AverageMap, SampleSet};

/// Arithmetic mean of the strictly-positive samples, or 0.0 if none are positive.
///
/// Zero and negative durations are excluded: the performance API reports a
/// duration of 0 for entries it could not measure, so they would drag the
/// mean toward zero without carrying timing information.
pub fn average_positive(samples: &[f64]) -> f64 {
    let positive: Vec<f64> = samples.iter().copied().filter(|d| *d > 0.0).collect();
    if positive.is_empty() {
        return 0.0;
    }
    positive.iter().sum::<f64>() / positive.len() as f64
}

/// Compute the average map for a sample set. Every resource in the input
/// appears in the output, even when its average is 0.0.
pub fn aggregate(samples: &SampleSet) -> AverageMap {
    samples
        .iter()
        .map(|(name, durations)| (name.clone(), average_positive(durations)))
        .collect()
}
