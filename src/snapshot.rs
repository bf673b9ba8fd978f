use std::fs;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::report::AggregateReport;
use crate::sample::Sample;
use crate::stats::Frozen;

// ─── Snapshot shape ──────────────────────────────────────────────

/// Persisted form of an [`AggregateReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub source_name: String,
    pub stats: Frozen,
    pub endpoints: Vec<EndpointSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSnapshot {
    pub uri: String,
    pub normalized_id: String,
    pub stats: Frozen,
    /// Empty for summary-only snapshots
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<Sample>,
}

/// How much of a report gets written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotDetail {
    /// Statistics only; per-sample detail needs a re-parse.
    #[default]
    Summary,
    /// Statistics and every raw sample.
    Full,
}

// ─── Store ───────────────────────────────────────────────────────

/// One JSON file per source name, under a single directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    detail: SnapshotDetail,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, detail: SnapshotDetail) -> Self {
        Self {
            dir: dir.into(),
            detail,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, source_name: &str) -> PathBuf {
        self.dir.join(format!("{source_name}.json"))
    }

    /// `Ok(None)` when nothing has been stored for this source yet.
    pub fn load(&self, source_name: &str) -> Result<Option<AggregateReport>> {
        let file = match fs::File::open(self.path_for(source_name)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: ReportSnapshot = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(AggregateReport::from_snapshot(snapshot)))
    }

    pub fn save(&self, report: &AggregateReport) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let snapshot = report.to_snapshot(self.detail == SnapshotDetail::Full);
        let file = fs::File::create(self.path_for(report.source_name()))?;
        serde_json::to_writer(BufWriter::new(file), &snapshot)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use tempfile::tempdir;

    fn report() -> AggregateReport {
        let mut report = AggregateReport::new("results.jtl");
        for (label, d, ok) in [("Home", 501, true), ("Home", 900, true), ("Workgroup", 58, false)] {
            report.add_sample(label, d, ok, DateTime::<Utc>::UNIX_EPOCH).unwrap();
        }
        report.settle();
        report
    }

    #[test]
    fn missing_snapshot_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), SnapshotDetail::Summary);
        assert!(store.load("absent.jtl").unwrap().is_none());
    }

    #[test]
    fn summary_store_round_trips_statistics_only() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("summaries"), SnapshotDetail::Summary);
        let original = report();
        store.save(&original).unwrap();

        let loaded = store.load("results.jtl").unwrap().unwrap();
        assert_eq!(loaded.summary(), original.summary());
        assert_eq!(loaded.endpoint_count(), 2);
        assert!(!loaded.has_full_samples("Home"));
        assert_eq!(loaded.endpoint("Workgroup").unwrap().count_errors(), 1);
    }

    #[test]
    fn full_store_keeps_samples() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), SnapshotDetail::Full);
        store.save(&report()).unwrap();

        let loaded = store.load("results.jtl").unwrap().unwrap();
        assert!(loaded.has_full_samples("Home"));
        assert_eq!(loaded.endpoint("Home").unwrap().samples().len(), 2);
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), SnapshotDetail::Summary);
        fs::write(store.path_for("broken.jtl"), "{ not json").unwrap();
        assert!(store.load("broken.jtl").is_err());
    }
}
