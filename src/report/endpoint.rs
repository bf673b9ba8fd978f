use crate::sample::Sample;
use crate::stats::{Accumulator, StatsSummary};

use super::key::normalize;

/// Every recorded invocation of one tested endpoint, plus their statistics.
/// Owned by an [`AggregateReport`](super::AggregateReport).
#[derive(Debug, Clone)]
pub struct EndpointReport {
    uri: String,
    normalized_id: String,
    samples: Vec<Sample>,
    stats: Accumulator,
}

impl EndpointReport {
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self {
            normalized_id: normalize(&uri),
            uri,
            samples: Vec::new(),
            stats: Accumulator::default(),
        }
    }

    /// Rebuilds a report from persisted parts. `samples` may be empty even
    /// when `stats` is not.
    pub(crate) fn restore(
        uri: String,
        normalized_id: String,
        samples: Vec<Sample>,
        stats: Accumulator,
    ) -> Self {
        Self {
            uri,
            normalized_id,
            samples,
            stats,
        }
    }

    pub fn add_sample(&mut self, sample: Sample) {
        self.stats.fold(sample.duration_ms, sample.is_error());
        self.samples.push(sample);
    }

    /// Drops every sample and starts the statistics over.
    pub(crate) fn reset(&mut self) {
        self.samples.clear();
        self.stats = Accumulator::default();
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn normalized_id(&self) -> &str {
        &self.normalized_id
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn stats(&self) -> &Accumulator {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut Accumulator {
        &mut self.stats
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from_accumulator(&self.stats)
    }

    pub fn size(&self) -> u64 {
        self.stats.count()
    }

    pub fn count_errors(&self) -> u64 {
        self.stats.error_count()
    }

    pub fn error_percent(&self) -> f64 {
        self.stats.error_percent()
    }

    /// Mean duration, truncated to whole milliseconds.
    pub fn average(&self) -> u64 {
        self.stats.average() as u64
    }

    pub fn min(&self) -> u64 {
        self.stats.min()
    }

    pub fn max(&self) -> u64 {
        self.stats.max()
    }

    pub fn is_failed(&self) -> bool {
        self.count_errors() > 0
    }

    /// false when the statistics were restored without their raw samples.
    pub fn has_full_samples(&self) -> bool {
        self.samples.len() as u64 == self.stats.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn alternating() -> EndpointReport {
        let now = Utc::now();
        let mut report = EndpointReport::new("uri");
        for i in 0..11 {
            report.add_sample(Sample::new("uri", i, i % 2 == 0, now));
        }
        report
    }

    #[test]
    fn counts_errors() {
        assert_eq!(alternating().count_errors(), 5);
    }

    #[test]
    fn average() {
        assert_eq!(alternating().average(), 5);
    }

    #[test]
    fn min_max() {
        let report = alternating();
        assert_eq!(report.min(), 0);
        assert_eq!(report.max(), 10);
    }

    #[test]
    fn median_and_90_line() {
        let mut report = alternating();
        assert_eq!(report.stats_mut().median().unwrap(), 5);
        assert_eq!(report.stats_mut().p90().unwrap(), 9);
    }

    #[test]
    fn is_failed_with_any_error() {
        assert!(alternating().is_failed());

        let mut ok = EndpointReport::new("ok");
        ok.add_sample(Sample::new("ok", 3, true, Utc::now()));
        assert!(!ok.is_failed());
    }

    #[test]
    fn samples_are_kept_in_arrival_order() {
        let report = alternating();
        assert!(report.has_full_samples());
        let durations: Vec<_> = report.samples().iter().map(|s| s.duration_ms).collect();
        assert_eq!(durations, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn min_max_on_an_owned_report() {
        assert_eq!(alternating().min(), 0);
        assert_eq!(alternating().max(), 10);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut report = alternating();
        report.reset();
        assert_eq!(report.size(), 0);
        assert!(report.samples().is_empty());
        assert!(!report.stats().is_frozen());
        assert_eq!(report.uri(), "uri");
    }
}
