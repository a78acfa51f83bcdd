//! Text summary builder for CLI output.

use crate::model::RunResult;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build human-readable stdout lines for a completed run: a header plus the
/// slowest resources by average duration.
pub(crate) fn build_text_summary(result: &RunResult, top: usize) -> TextSummary {
    let mut lines = Vec::new();
    lines.push(format!(
        "Sampled {} over {} cycle(s); {} resource(s) observed",
        result.url,
        result.cycles,
        result.averages.len()
    ));

    let mut slowest: Vec<(&str, f64)> = result
        .averages
        .iter()
        .map(|(name, avg)| (name.as_str(), *avg))
        .collect();
    slowest.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (name, avg) in slowest.into_iter().take(top) {
        lines.push(format!("{avg:10.1} ms  {name}"));
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AverageMap, SampleSet};

    fn result_with_averages(averages: AverageMap) -> RunResult {
        RunResult {
            timestamp_utc: "2026-01-01T00:00:00Z".into(),
            url: "https://example.org/".into(),
            cycles: 3,
            meas_id: "test".into(),
            samples: SampleSet::new(),
            averages,
        }
    }

    #[test]
    fn header_reports_url_cycles_and_resource_count() {
        let mut averages = AverageMap::new();
        averages.insert("a".into(), 1.0);
        let summary = build_text_summary(&result_with_averages(averages), 10);
        assert_eq!(
            summary.lines[0],
            "Sampled https://example.org/ over 3 cycle(s); 1 resource(s) observed"
        );
    }

    #[test]
    fn slowest_resources_come_first_and_top_is_honored() {
        let mut averages = AverageMap::new();
        averages.insert("fast".into(), 5.0);
        averages.insert("slow".into(), 500.0);
        averages.insert("mid".into(), 50.0);
        let summary = build_text_summary(&result_with_averages(averages), 2);

        assert_eq!(summary.lines.len(), 3);
        assert!(summary.lines[1].ends_with("slow"));
        assert!(summary.lines[2].ends_with("mid"));
    }
}
