//! Response-time summaries of JMeter and JUnit performance logs,
//! per report file and per tested endpoint.

use std::sync::Arc;

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod parser;
pub mod report;
pub mod sample;
pub mod server;
pub mod snapshot;
pub mod stats;

pub use config::{ReportConfig, ReportInput};
pub use diagnostics::{DiagnosticSink, MemorySink, TracingSink};
pub use error::{ReportError, Result};
pub use parser::{parse_batch, JMeterParser, JUnitParser, ParserKind, ReportParser};
pub use report::{AggregateReport, EndpointKey, EndpointReport, ReportMap};
pub use sample::Sample;
pub use snapshot::{SnapshotDetail, SnapshotStore};
pub use stats::{Accumulator, Frozen, StatsSummary, Unfrozen};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Every loaded report; lookups may swap in re-parsed versions.
    pub reports: Arc<ReportMap>,
}
