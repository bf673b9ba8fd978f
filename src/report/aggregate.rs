use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{ReportError, Result};
use crate::sample::Sample;
use crate::snapshot::{EndpointSnapshot, ReportSnapshot};
use crate::stats::{Accumulator, StatsSummary};

use super::endpoint::EndpointReport;
use super::key::{normalize, EndpointKey};

/// All samples parsed from one source file, grouped per endpoint.
#[derive(Debug, Clone)]
pub struct AggregateReport {
    source_name: String,
    /// Keyed by normalized endpoint id
    endpoints: BTreeMap<String, EndpointReport>,
    stats: Accumulator,
}

impl AggregateReport {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            endpoints: BTreeMap::new(),
            stats: Accumulator::default(),
        }
    }

    /// Routes one sample to its endpoint and folds it into the overall
    /// statistics. Fails without side effects when the label is empty.
    ///
    /// A report restored from a snapshot starts over on its first new
    /// sample: every endpoint is emptied along with the overall statistics.
    pub fn add_sample(
        &mut self,
        raw_endpoint: &str,
        duration_ms: u64,
        success: bool,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        if raw_endpoint.is_empty() {
            return Err(ReportError::InvalidSample(format!(
                "{}: label cannot be empty, make sure every sample is named: skipping sample",
                self.source_name
            )));
        }

        if self.stats.is_frozen() {
            for endpoint in self.endpoints.values_mut() {
                endpoint.reset();
            }
        }

        let endpoint = self
            .endpoints
            .entry(normalize(raw_endpoint))
            .or_insert_with(|| EndpointReport::new(raw_endpoint));
        endpoint.add_sample(Sample::new(raw_endpoint, duration_ms, success, timestamp));
        self.stats.fold(duration_ms, !success);
        Ok(())
    }

    pub fn add(&mut self, sample: Sample) -> Result<()> {
        self.add_sample(&sample.endpoint, sample.duration_ms, sample.success, sample.timestamp)
    }

    /// Sorts every accumulator once, so later reads through `&self`
    /// hit the cache. Parsers call this when a file is done.
    pub fn settle(&mut self) {
        self.stats.refresh();
        for endpoint in self.endpoints.values_mut() {
            endpoint.stats_mut().refresh();
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
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

    pub fn endpoint(&self, normalized_id: &str) -> Option<&EndpointReport> {
        self.endpoints.get(normalized_id)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointReport> {
        self.endpoints.values()
    }

    /// Endpoints sorted by raw URI.
    pub fn endpoints_ordered(&self) -> Vec<&EndpointReport> {
        let mut list: Vec<_> = self.endpoints.values().collect();
        list.sort_by(|a, b| a.uri().cmp(b.uri()));
        list
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn endpoint_key(&self, endpoint: &EndpointReport) -> EndpointKey {
        EndpointKey::new(&self.source_name, endpoint.normalized_id())
    }

    pub fn has_full_samples(&self, normalized_id: &str) -> bool {
        self.endpoints
            .get(normalized_id)
            .is_some_and(EndpointReport::has_full_samples)
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

    pub fn average(&self) -> u64 {
        self.stats.average() as u64
    }

    pub fn min(&self) -> u64 {
        self.stats.min()
    }

    pub fn max(&self) -> u64 {
        self.stats.max()
    }

    /// Frozen statistics plus, when `with_samples` is set, every raw sample.
    pub fn to_snapshot(&self, with_samples: bool) -> ReportSnapshot {
        ReportSnapshot {
            source_name: self.source_name.clone(),
            stats: self.stats.to_frozen(),
            endpoints: self
                .endpoints
                .values()
                .map(|endpoint| EndpointSnapshot {
                    uri: endpoint.uri().to_string(),
                    normalized_id: endpoint.normalized_id().to_string(),
                    stats: endpoint.stats().to_frozen(),
                    samples: if with_samples {
                        endpoint.samples().to_vec()
                    } else {
                        Vec::new()
                    },
                })
                .collect(),
        }
    }

    pub fn from_snapshot(snapshot: ReportSnapshot) -> Self {
        let endpoints = snapshot
            .endpoints
            .into_iter()
            .map(|e| {
                let report = EndpointReport::restore(
                    e.uri,
                    e.normalized_id.clone(),
                    e.samples,
                    Accumulator::Frozen(e.stats),
                );
                (e.normalized_id, report)
            })
            .collect();

        Self {
            source_name: snapshot.source_name,
            endpoints,
            stats: Accumulator::Frozen(snapshot.stats),
        }
    }
}
