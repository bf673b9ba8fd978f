use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinSet;

use crate::config::ReportInput;
use crate::diagnostics::DiagnosticSink;
use crate::error::Result;
use crate::parser::{self, ParserKind};
use crate::snapshot::SnapshotStore;

use super::aggregate::AggregateReport;
use super::endpoint::EndpointReport;
use super::key::EndpointKey;

/// Where a report came from, so it can be parsed again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOrigin {
    pub path: PathBuf,
    pub kind: ParserKind,
}

struct Entry {
    report: Arc<AggregateReport>,
    origin: Option<ReportOrigin>,
}

/// One endpoint, together with the report version it was found in.
#[derive(Debug, Clone)]
pub struct EndpointView {
    pub report: Arc<AggregateReport>,
    pub endpoint_id: String,
}

impl EndpointView {
    pub fn endpoint(&self) -> Option<&EndpointReport> {
        self.report.endpoint(&self.endpoint_id)
    }

    pub fn key(&self) -> EndpointKey {
        EndpointKey::new(self.report.source_name(), &self.endpoint_id)
    }
}

/// Every published report, keyed and listed by source name.
///
/// Reports are never mutated once inserted; a reload swaps in a new `Arc`,
/// so readers holding the old one keep a consistent view.
pub struct ReportMap {
    entries: RwLock<BTreeMap<String, Entry>>,
    sink: Arc<dyn DiagnosticSink>,
}

impl ReportMap {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            sink,
        }
    }

    /// Builds the map from `inputs`, one blocking task per file. A stored
    /// snapshot is preferred over parsing; fresh parses are written back.
    /// Inputs that cannot be loaded are reported to `sink` and skipped.
    pub async fn load(
        inputs: Vec<ReportInput>,
        store: Option<SnapshotStore>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let map = Self::new(sink.clone());
        let mut tasks = JoinSet::new();

        for input in inputs {
            let store = store.clone();
            let sink = sink.clone();
            tasks.spawn_blocking(move || {
                let loaded = load_one(&input, store.as_ref(), sink.as_ref());
                (input, loaded)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((input, Ok(report))) => {
                    let origin = ReportOrigin {
                        path: input.path,
                        kind: input.parser,
                    };
                    map.insert(report, Some(origin));
                }
                Ok((input, Err(e))) => sink.report(parser::skip_message(&input.path, &e)),
                Err(e) => sink.report(format!("Performance: load task failed: {e}")),
            }
        }

        tracing::info!(reports = map.len(), "Performance: reports loaded");
        map
    }

    /// Publishes `report`, replacing any report with the same source name.
    pub fn insert(&self, report: AggregateReport, origin: Option<ReportOrigin>) -> Arc<AggregateReport> {
        let report = Arc::new(report);
        self.entries.write().insert(
            report.source_name().to_string(),
            Entry {
                report: report.clone(),
                origin,
            },
        );
        report
    }

    pub fn get(&self, source_name: &str) -> Option<Arc<AggregateReport>> {
        self.entries
            .read()
            .get(source_name)
            .map(|entry| entry.report.clone())
    }

    pub fn origin(&self, source_name: &str) -> Option<ReportOrigin> {
        self.entries
            .read()
            .get(source_name)
            .and_then(|entry| entry.origin.clone())
    }

    /// All reports, ordered by source name.
    pub fn reports(&self) -> Vec<Arc<AggregateReport>> {
        self.entries
            .read()
            .values()
            .map(|entry| entry.report.clone())
            .collect()
    }

    /// true when no report was published under this name.
    pub fn is_failed(&self, source_name: &str) -> bool {
        !self.entries.read().contains_key(source_name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up one endpoint by composite key.
    ///
    /// If the stored report lacks that endpoint's raw samples, the source
    /// file is parsed again and the fresh report replaces the stored one.
    /// When that fails the stale endpoint is returned as-is. Blocks while
    /// re-parsing.
    pub fn endpoint(&self, key: &EndpointKey) -> Option<EndpointView> {
        let (report, origin) = {
            let entries = self.entries.read();
            let entry = entries.get(&key.source_name)?;
            (entry.report.clone(), entry.origin.clone())
        };
        report.endpoint(&key.endpoint_id)?;

        let stale = EndpointView {
            report,
            endpoint_id: key.endpoint_id.clone(),
        };
        if stale.report.has_full_samples(&key.endpoint_id) {
            return Some(stale);
        }
        let Some(origin) = origin else {
            return Some(stale);
        };

        match self.reload(&origin) {
            Ok(fresh) => {
                fresh.endpoint(&key.endpoint_id)?;
                Some(EndpointView {
                    report: fresh,
                    endpoint_id: key.endpoint_id.clone(),
                })
            }
            Err(e) => {
                tracing::error!(key = %key.encode(), error = %e, "Unable to re-parse for endpoint report");
                Some(stale)
            }
        }
    }

    fn reload(&self, origin: &ReportOrigin) -> Result<Arc<AggregateReport>> {
        let parsed = origin.kind.parser().parse_file(&origin.path, self.sink.as_ref())?;
        Ok(self.insert(parsed, Some(origin.clone())))
    }
}

fn load_one(
    input: &ReportInput,
    store: Option<&SnapshotStore>,
    sink: &dyn DiagnosticSink,
) -> Result<AggregateReport> {
    let name = parser::source_name(&input.path);

    if let Some(store) = store {
        match store.load(&name) {
            Ok(Some(report)) => {
                tracing::debug!(source = %name, "Performance: using stored summary");
                return Ok(report);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(source = %name, error = %e, "ignoring unreadable summary"),
        }
    }

    let report = input.parser.parser().parse_file(&input.path, sink)?;
    if let Some(store) = store {
        if let Err(e) = store.save(&report) {
            tracing::warn!(source = %name, error = %e, "could not store summary");
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use chrono::{DateTime, Utc};

    fn report(name: &str, labels: &[&str]) -> AggregateReport {
        let mut report = AggregateReport::new(name);
        for label in labels {
            report.add_sample(label, 10, true, DateTime::<Utc>::UNIX_EPOCH).unwrap();
        }
        report
    }

    #[test]
    fn reports_are_listed_by_source_name() {
        let map = ReportMap::new(Arc::new(MemorySink::new()));
        map.insert(report("b.jtl", &["x"]), None);
        map.insert(report("a.jtl", &["x"]), None);
        map.insert(report("c.jtl", &["x"]), None);

        let names: Vec<_> = map.reports().iter().map(|r| r.source_name().to_string()).collect();
        assert_eq!(names, ["a.jtl", "b.jtl", "c.jtl"]);
        assert!(!map.is_failed("a.jtl"));
        assert!(map.is_failed("missing.jtl"));
    }

    #[test]
    fn endpoint_with_full_samples_is_served_directly() {
        let map = ReportMap::new(Arc::new(MemorySink::new()));
        let published = map.insert(report("a.jtl", &["http://host/x"]), None);

        let view = map.endpoint(&EndpointKey::new("a.jtl", "__host_x")).unwrap();
        assert!(Arc::ptr_eq(&view.report, &published));
        assert_eq!(view.endpoint().unwrap().uri(), "http://host/x");
        assert!(map.endpoint(&EndpointKey::new("a.jtl", "nope")).is_none());
        assert!(map.endpoint(&EndpointKey::new("b.jtl", "__host_x")).is_none());
    }

    #[test]
    fn summary_only_report_without_origin_degrades_to_stale() {
        let map = ReportMap::new(Arc::new(MemorySink::new()));
        let restored = AggregateReport::from_snapshot(report("a.jtl", &["x"]).to_snapshot(false));
        map.insert(restored, None);

        let view = map.endpoint(&EndpointKey::new("a.jtl", "x")).unwrap();
        let endpoint = view.endpoint().unwrap();
        assert!(!endpoint.has_full_samples());
        assert_eq!(endpoint.size(), 1);
    }

    #[test]
    fn failed_reload_keeps_last_known_report() {
        let map = ReportMap::new(Arc::new(MemorySink::new()));
        let restored = AggregateReport::from_snapshot(report("a.jtl", &["x"]).to_snapshot(false));
        let origin = ReportOrigin {
            path: PathBuf::from("/definitely/not/here/a.jtl"),
            kind: ParserKind::JMeter,
        };
        let published = map.insert(restored, Some(origin));

        let view = map.endpoint(&EndpointKey::new("a.jtl", "x")).unwrap();
        assert!(Arc::ptr_eq(&view.report, &published));
        assert!(Arc::ptr_eq(&map.get("a.jtl").unwrap(), &published));
    }
}
