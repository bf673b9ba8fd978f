use hdrhistogram::Histogram;
use serde::Serialize;

use crate::sample::Sample;

/// Histogram range: 1 ms → 1 h, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 3_600_000;
const HIST_SIGFIG: u8 = 3;

/// Bucket boundaries (ms). Covers typical web response times.
const BOUNDARIES: &[u64] = &[
    10, 25, 50, 100, 250, 500, 750, 1_000, 1_500, 2_000, 3_000, 5_000, 10_000,
    30_000, 60_000,
];

/// A bucket in the latency distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistBucket {
    pub range_start_ms: u64,
    pub range_end_ms: u64,
    pub count: u64,
}

/// Buckets the samples' durations, to three significant figures. A bucket
/// is closed at its upper boundary. Empty buckets are skipped; values past
/// the last boundary land in one overflow bucket ending at the max.
pub fn distribution<'a, I>(samples: I) -> Vec<DistBucket>
where
    I: IntoIterator<Item = &'a Sample>,
{
    let mut hist = match Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG) {
        Ok(hist) => hist,
        Err(_) => return Vec::new(),
    };
    for sample in samples {
        hist.saturating_record(sample.duration_ms.max(HIST_LOW));
    }
    if hist.len() == 0 {
        return Vec::new();
    }

    let num_buckets = BOUNDARIES.len() + 1;
    let mut counts = vec![0u64; num_buckets];

    for iv in hist.iter_recorded() {
        // Bottom of the recorded value's equivalence range, so a value on a
        // boundary stays in the bucket that boundary closes.
        let val = hist.lowest_equivalent(iv.value_iterated_to());
        // first boundary >= val
        let idx = match BOUNDARIES.binary_search(&val) {
            Ok(i) | Err(i) => i,
        };
        counts[idx.min(BOUNDARIES.len())] += iv.count_at_value();
    }

    let mut result = Vec::with_capacity(num_buckets);
    let mut prev = 0u64;
    for (i, &boundary) in BOUNDARIES.iter().enumerate() {
        if counts[i] > 0 {
            result.push(DistBucket {
                range_start_ms: prev,
                range_end_ms: boundary,
                count: counts[i],
            });
        }
        prev = boundary;
    }
    if counts[BOUNDARIES.len()] > 0 {
        result.push(DistBucket {
            range_start_ms: prev,
            range_end_ms: hist.max(),
            count: counts[BOUNDARIES.len()],
        });
    }

    result
}
