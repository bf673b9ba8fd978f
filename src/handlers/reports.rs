use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::report::{AggregateReport, EndpointKey, EndpointReport};
use crate::sample::Sample;
use crate::stats::{distribution, DistBucket, StatsSummary};
use crate::AppState;

use super::AppError;

// ─── Response types ──────────────────────────────────────────────

/// One row of the report list.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub name: String,
    pub endpoints: usize,
    pub failed: bool,
    pub stats: StatsSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointSummary {
    pub uri: String,
    pub id: String,
    /// Composite key for `/api/endpoints/:key`
    pub key: String,
    pub failed: bool,
    pub stats: StatsSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDetail {
    pub name: String,
    pub stats: StatsSummary,
    pub endpoints: Vec<EndpointSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointDetail {
    pub report: String,
    pub uri: String,
    pub id: String,
    pub failed: bool,
    /// false when only restored statistics were available
    pub complete: bool,
    pub stats: StatsSummary,
    pub distribution: Vec<DistBucket>,
    pub samples: Vec<Sample>,
}

impl ReportSummary {
    pub fn from_report(report: &AggregateReport) -> Self {
        Self {
            name: report.source_name().to_string(),
            endpoints: report.endpoint_count(),
            failed: report.count_errors() > 0,
            stats: report.summary(),
        }
    }
}

fn endpoint_summary(report: &AggregateReport, endpoint: &EndpointReport) -> EndpointSummary {
    EndpointSummary {
        uri: endpoint.uri().to_string(),
        id: endpoint.normalized_id().to_string(),
        key: report.endpoint_key(endpoint).encode(),
        failed: endpoint.is_failed(),
        stats: endpoint.summary(),
    }
}

// ─── GET /api/reports ────────────────────────────────────────────

pub async fn list_reports(State(state): State<Arc<AppState>>) -> Json<Vec<ReportSummary>> {
    let reports = state
        .reports
        .reports()
        .iter()
        .map(|report| ReportSummary::from_report(report))
        .collect();
    Json(reports)
}

// ─── GET /api/reports/:name ──────────────────────────────────────

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ReportDetail>, AppError> {
    let report = state
        .reports
        .get(&name)
        .ok_or_else(|| AppError::NotFound(format!("Report {name} not found")))?;

    let endpoints = report
        .endpoints_ordered()
        .into_iter()
        .map(|endpoint| endpoint_summary(&report, endpoint))
        .collect();

    Ok(Json(ReportDetail {
        name: report.source_name().to_string(),
        stats: report.summary(),
        endpoints,
    }))
}

// ─── GET /api/endpoints/:key ─────────────────────────────────────
/// The router has already URL-decoded the path segment once.

pub async fn get_endpoint(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<EndpointDetail>, AppError> {
    let key = EndpointKey::parse(&key)?;
    let missing = format!("Endpoint {} not found in {}", key.endpoint_id, key.source_name);

    // A lookup may re-parse the source file.
    let reports = state.reports.clone();
    let view = tokio::task::spawn_blocking(move || reports.endpoint(&key))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(missing.clone()))?;
    let endpoint = view.endpoint().ok_or(AppError::NotFound(missing))?;

    Ok(Json(EndpointDetail {
        report: view.report.source_name().to_string(),
        uri: endpoint.uri().to_string(),
        id: endpoint.normalized_id().to_string(),
        failed: endpoint.is_failed(),
        complete: endpoint.has_full_samples(),
        stats: endpoint.summary(),
        distribution: distribution(endpoint.samples()),
        samples: endpoint.samples().to_vec(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::report::ReportMap;
    use chrono::{DateTime, Utc};

    fn state() -> Arc<AppState> {
        let reports = ReportMap::new(Arc::new(MemorySink::new()));
        for (name, label, ok) in [("b.jtl", "http://host/b", true), ("a.jtl", "Home", false)] {
            let mut report = AggregateReport::new(name);
            report.add_sample(label, 40, ok, DateTime::<Utc>::UNIX_EPOCH).unwrap();
            report.add_sample(label, 60, true, DateTime::<Utc>::UNIX_EPOCH).unwrap();
            report.settle();
            reports.insert(report, None);
        }
        Arc::new(AppState {
            reports: Arc::new(reports),
        })
    }

    #[tokio::test]
    async fn list_is_ordered_by_name() {
        let Json(list) = list_reports(State(state())).await;
        let names: Vec<_> = list.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a.jtl", "b.jtl"]);
        assert!(list[0].failed);
        assert_eq!(list[1].stats.count, 2);
    }

    #[tokio::test]
    async fn report_detail_carries_endpoint_keys() {
        let Json(detail) = get_report(State(state()), Path("b.jtl".into())).await.unwrap();
        assert_eq!(detail.endpoints.len(), 1);
        assert_eq!(detail.endpoints[0].id, "__host_b");
        assert_eq!(detail.endpoints[0].key, EndpointKey::new("b.jtl", "__host_b").encode());
    }

    #[tokio::test]
    async fn unknown_report_is_not_found() {
        let err = get_report(State(state()), Path("zzz.jtl".into())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn endpoint_detail_by_key() {
        let Json(detail) = get_endpoint(State(state()), Path("a.jtl;Home.endperformanceparameter".into()))
            .await
            .unwrap();
        assert_eq!(detail.uri, "Home");
        assert!(detail.failed);
        assert!(detail.complete);
        assert_eq!(detail.samples.len(), 2);
        assert_eq!(detail.stats.median, 60);
        assert_eq!(detail.distribution.iter().map(|b| b.count).sum::<u64>(), 2);
    }

    #[tokio::test]
    async fn malformed_key_is_bad_request() {
        let err = get_endpoint(State(state()), Path("no-separator".into())).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
