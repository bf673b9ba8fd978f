use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Percentile rank used for the median.
pub const MEDIAN: f64 = 0.5;
/// Percentile rank used for the "90% line".
pub const LINE_90: f64 = 0.9;

// ─── Accumulator ─────────────────────────────────────────────────

/// Incremental latency statistics, either still accumulating
/// (`Unfrozen`) or captured as an immutable snapshot (`Frozen`).
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Unfrozen(Unfrozen),
    Frozen(Frozen),
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::Unfrozen(Unfrozen::new())
    }
}

impl Accumulator {
    /// Folds one observation in. A frozen accumulator holds no raw
    /// samples, so it is replaced by an empty unfrozen one first.
    pub fn fold(&mut self, duration_ms: u64, is_error: bool) {
        if let Self::Frozen(frozen) = self {
            *self = Self::Unfrozen(frozen.unfreeze());
        }
        if let Self::Unfrozen(unfrozen) = self {
            unfrozen.fold(duration_ms, is_error);
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            Self::Unfrozen(u) => u.count(),
            Self::Frozen(f) => f.count,
        }
    }

    pub fn sum(&self) -> u64 {
        match self {
            Self::Unfrozen(u) => u.sum(),
            Self::Frozen(f) => f.sum,
        }
    }

    pub fn min(&self) -> u64 {
        match self {
            Self::Unfrozen(u) => u.min(),
            Self::Frozen(f) => f.min,
        }
    }

    pub fn max(&self) -> u64 {
        match self {
            Self::Unfrozen(u) => u.max(),
            Self::Frozen(f) => f.max,
        }
    }

    pub fn error_count(&self) -> u64 {
        match self {
            Self::Unfrozen(u) => u.error_count(),
            Self::Frozen(f) => f.error_count,
        }
    }

    pub fn average(&self) -> f64 {
        ratio(self.sum(), self.count())
    }

    pub fn error_percent(&self) -> f64 {
        ratio(self.error_count(), self.count())
    }

    pub fn median(&mut self) -> Result<u64> {
        match self {
            Self::Unfrozen(u) => u.median(),
            Self::Frozen(f) => f.checked(f.median),
        }
    }

    pub fn p90(&mut self) -> Result<u64> {
        match self {
            Self::Unfrozen(u) => u.p90(),
            Self::Frozen(f) => f.checked(f.p90),
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::Frozen(_))
    }

    /// Forces any pending sort and returns the snapshot. The accumulator
    /// itself stays as it is.
    pub fn freeze(&mut self) -> Frozen {
        match self {
            Self::Unfrozen(u) => u.freeze(),
            Self::Frozen(f) => f.clone(),
        }
    }

    /// Snapshot without touching the cache. A stale unfrozen accumulator
    /// sorts a copy of its samples.
    pub fn to_frozen(&self) -> Frozen {
        match self {
            Self::Unfrozen(u) => u.to_frozen(),
            Self::Frozen(f) => f.clone(),
        }
    }

    /// Sorts and caches percentiles so later `&self` reads are free.
    pub fn refresh(&mut self) {
        if let Self::Unfrozen(u) = self {
            u.refresh();
        }
    }
}

fn ratio(numerator: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        numerator as f64 / count as f64
    }
}

// ─── Unfrozen ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Unfrozen {
    sum: u64,
    count: u64,
    // Sentinels while empty; never exposed.
    min: u64,
    max: u64,
    errors: u64,
    samples: Vec<u64>,
    /// Set by every fold; cleared once `samples` is re-sorted.
    dirty: bool,
    /// (median, p90) as of the last refresh
    cached: Option<(u64, u64)>,
}

impl Default for Unfrozen {
    fn default() -> Self {
        Self::new()
    }
}

impl Unfrozen {
    pub fn new() -> Self {
        Self {
            sum: 0,
            count: 0,
            min: u64::MAX,
            max: u64::MIN,
            errors: 0,
            samples: Vec::new(),
            dirty: false,
            cached: None,
        }
    }

    pub fn fold(&mut self, duration_ms: u64, is_error: bool) {
        self.sum = self.sum.saturating_add(duration_ms);
        self.count += 1;
        self.min = self.min.min(duration_ms);
        self.max = self.max.max(duration_ms);
        if is_error {
            self.errors += 1;
        }
        self.samples.push(duration_ms);
        self.dirty = true;
        self.cached = None;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> u64 {
        self.sum
    }

    pub fn min(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.min
        }
    }

    pub fn max(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.max
        }
    }

    pub fn error_count(&self) -> u64 {
        self.errors
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn median(&mut self) -> Result<u64> {
        self.refresh();
        self.cached.map(|(median, _)| median).ok_or(ReportError::OutOfRange)
    }

    pub fn p90(&mut self) -> Result<u64> {
        self.refresh();
        self.cached.map(|(_, p90)| p90).ok_or(ReportError::OutOfRange)
    }

    /// Re-sorts once per burst of folds and recomputes the cached
    /// percentiles. No-op when nothing changed since the last call.
    pub fn refresh(&mut self) {
        if self.dirty {
            self.samples.sort_unstable();
            self.dirty = false;
            self.cached = None;
        }
        if self.cached.is_none() && !self.samples.is_empty() {
            self.cached = Some((
                nearest_rank(&self.samples, MEDIAN),
                nearest_rank(&self.samples, LINE_90),
            ));
        }
    }

    pub fn freeze(&mut self) -> Frozen {
        self.refresh();
        self.to_frozen()
    }

    pub fn to_frozen(&self) -> Frozen {
        let (median, p90) = match self.cached {
            Some(cached) if !self.dirty => cached,
            _ if self.samples.is_empty() => (0, 0),
            _ => {
                let mut sorted = self.samples.clone();
                sorted.sort_unstable();
                (nearest_rank(&sorted, MEDIAN), nearest_rank(&sorted, LINE_90))
            }
        };
        Frozen {
            count: self.count,
            sum: self.sum,
            min: self.min(),
            max: self.max(),
            error_count: self.errors,
            median,
            p90,
        }
    }
}

/// Element at index `floor(len * percentile)` of an ascending slice.
/// `sorted` must be non-empty.
fn nearest_rank(sorted: &[u64], percentile: f64) -> u64 {
    let idx = (sorted.len() as f64 * percentile) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

// ─── Frozen ──────────────────────────────────────────────────────

/// Immutable statistics captured from an [`Unfrozen`] accumulator.
/// Holds no raw samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frozen {
    pub count: u64,
    pub sum: u64,
    pub min: u64,
    pub max: u64,
    pub error_count: u64,
    pub median: u64,
    pub p90: u64,
}

impl Frozen {
    /// Always empty: there is nothing to resume from.
    pub fn unfreeze(&self) -> Unfrozen {
        Unfrozen::new()
    }

    pub fn average(&self) -> f64 {
        ratio(self.sum, self.count)
    }

    pub fn error_percent(&self) -> f64 {
        ratio(self.error_count, self.count)
    }

    fn checked(&self, value: u64) -> Result<u64> {
        if self.count == 0 {
            Err(ReportError::OutOfRange)
        } else {
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn alternating(n: u64) -> Accumulator {
        let mut acc = Accumulator::default();
        for i in 0..n {
            acc.fold(i, i % 2 != 0);
        }
        acc
    }

    #[test]
    fn eleven_alternating_samples() {
        let mut acc = alternating(11);
        assert_eq!(acc.count(), 11);
        assert_eq!(acc.error_count(), 5);
        assert_eq!(acc.average(), 5.0);
        assert_eq!(acc.min(), 0);
        assert_eq!(acc.max(), 10);
        assert_eq!(acc.median().unwrap(), 5);
        assert_eq!(acc.p90().unwrap(), 9);
    }

    #[test]
    fn empty_accumulator_reports_zeros_and_refuses_percentiles() {
        let mut acc = Accumulator::default();
        assert_eq!(acc.count(), 0);
        assert_eq!(acc.min(), 0);
        assert_eq!(acc.max(), 0);
        assert_eq!(acc.average(), 0.0);
        assert_eq!(acc.error_percent(), 0.0);
        assert!(matches!(acc.median(), Err(ReportError::OutOfRange)));
        assert!(matches!(acc.p90(), Err(ReportError::OutOfRange)));
    }

    #[test]
    fn fold_marks_cache_stale_and_query_resorts_once() {
        let mut u = Unfrozen::new();
        u.fold(30, false);
        u.fold(10, false);
        assert!(u.is_dirty());
        assert_eq!(u.median().unwrap(), 30);
        assert!(!u.is_dirty());

        u.fold(20, false);
        u.fold(5, true);
        assert!(u.is_dirty());
        assert_eq!(u.median().unwrap(), 20);
        assert_eq!(u.p90().unwrap(), 30);
        assert!(!u.is_dirty());
    }

    #[test]
    fn to_frozen_on_stale_state_matches_freeze() {
        let mut u = Unfrozen::new();
        for d in [7, 3, 9, 1, 4] {
            u.fold(d, false);
        }
        let peeked = u.to_frozen();
        assert!(u.is_dirty());
        assert_eq!(peeked, u.freeze());
    }

    #[test]
    fn freeze_captures_current_percentiles() {
        let mut acc = alternating(11);
        let frozen = acc.freeze();
        assert_eq!(
            frozen,
            Frozen { count: 11, sum: 55, min: 0, max: 10, error_count: 5, median: 5, p90: 9 }
        );
        assert_eq!(frozen.average(), 5.0);
    }

    #[test]
    fn unfreeze_starts_over() {
        let frozen = alternating(11).freeze();
        let unfrozen = frozen.unfreeze();
        assert_eq!(unfrozen.count(), 0);
        assert_eq!(unfrozen.sum(), 0);
    }

    #[test]
    fn folding_into_frozen_discards_snapshot() {
        let mut acc = Accumulator::Frozen(alternating(4).freeze());
        assert!(acc.is_frozen());
        assert_eq!(acc.count(), 4);

        acc.fold(42, false);
        assert!(!acc.is_frozen());
        assert_eq!(acc.count(), 1);
        assert_eq!(acc.min(), 42);
        assert_eq!(acc.median().unwrap(), 42);
    }

    #[test]
    fn ordering_invariant_holds_after_every_fold() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut acc = Accumulator::default();
        for _ in 0..500 {
            acc.fold(rng.gen_range(0..10_000), rng.gen_bool(0.1));
            let (min, max) = (acc.min(), acc.max());
            let median = acc.median().unwrap();
            let p90 = acc.p90().unwrap();
            assert!(min <= median && median <= p90 && p90 <= max);
        }
    }
}
