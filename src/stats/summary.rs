use serde::Serialize;

use super::accumulator::{Accumulator, Frozen};

/// Read-only view of one accumulator.
/// Serialized straight into the API responses and the CLI output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub count: u64,
    pub errors: u64,
    pub error_percent: f64,
    pub min: u64,
    pub max: u64,
    pub average: f64,
    pub median: u64,
    pub p90: u64,
}

impl StatsSummary {
    /// Returns zeroed values if the snapshot is empty.
    pub fn from_frozen(frozen: &Frozen) -> Self {
        if frozen.count == 0 {
            return Self::empty();
        }

        Self {
            count: frozen.count,
            errors: frozen.error_count,
            error_percent: frozen.error_percent(),
            min: frozen.min,
            max: frozen.max,
            average: frozen.average(),
            median: frozen.median,
            p90: frozen.p90,
        }
    }

    pub fn from_accumulator(acc: &Accumulator) -> Self {
        Self::from_frozen(&acc.to_frozen())
    }

    /// All-zero placeholder used before any samples are folded.
    pub fn empty() -> Self {
        Self {
            count: 0,
            errors: 0,
            error_percent: 0.0,
            min: 0,
            max: 0,
            average: 0.0,
            median: 0,
            p90: 0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_accumulator_gives_zeroed_summary() {
        let summary = StatsSummary::from_accumulator(&Accumulator::default());
        assert_eq!(summary, StatsSummary::empty());
        assert!(!summary.has_data());
    }

    #[test]
    fn summary_mirrors_accumulator() {
        let mut acc = Accumulator::default();
        for d in [100, 200, 300, 400] {
            acc.fold(d, d == 400);
        }
        let summary = StatsSummary::from_accumulator(&acc);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.error_percent, 0.25);
        assert_eq!(summary.average, 250.0);
        assert_eq!(summary.median, 300);
        assert_eq!(summary.p90, 400);
    }
}
