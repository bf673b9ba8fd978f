use std::io::BufRead;

use chrono::{DateTime, Utc};

use crate::diagnostics::DiagnosticSink;
use crate::error::Result;
use crate::report::AggregateReport;

use super::xml::{Attributes, XmlEvent, XmlEvents};
use super::{ParserKind, ReportParser};

/// Parser for JUnit XML reports (also written by SoapUI).
///
/// Each `testcase` becomes one sample named after the case, lasting its
/// `time` attribute. A `failure` inside the case marks it failed.
#[derive(Debug, Default, Clone, Copy)]
pub struct JUnitParser;

/// The test case currently open and not yet emitted.
#[derive(Debug)]
struct PendingCase {
    name: String,
    duration_ms: u64,
    success: bool,
}

/// Seconds with a fractional part, as JUnit writes them, to milliseconds.
fn to_millis(time: &str) -> Option<u64> {
    let secs: f64 = time.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0).round() as u64)
}

fn read_case(attributes: &Attributes) -> Option<PendingCase> {
    let duration_ms = to_millis(attributes.get("time")?)?;
    Some(PendingCase {
        name: attributes.get("name").unwrap_or_default().to_string(),
        duration_ms,
        success: true,
    })
}

fn emit(report: &mut AggregateReport, case: PendingCase, sink: &dyn DiagnosticSink) {
    // JUnit carries no per-case start time.
    let timestamp = DateTime::<Utc>::UNIX_EPOCH;
    if let Err(e) = report.add_sample(&case.name, case.duration_ms, case.success, timestamp) {
        sink.report(e.to_string());
    }
}

impl ReportParser for JUnitParser {
    fn kind(&self) -> ParserKind {
        ParserKind::JUnit
    }

    fn parse(
        &self,
        source_name: &str,
        input: &mut dyn BufRead,
        sink: &dyn DiagnosticSink,
    ) -> Result<AggregateReport> {
        let mut report = AggregateReport::new(source_name);
        let mut events = XmlEvents::new(source_name, input);
        let mut pending: Option<PendingCase> = None;

        while let Some(event) = events.next_event()? {
            match event {
                XmlEvent::Open { name, attributes } if name.eq_ignore_ascii_case("testcase") => {
                    // Previous case never closed: flush it rather than lose it.
                    if let Some(previous) = pending.take() {
                        emit(&mut report, previous, sink);
                    }
                    pending = read_case(&attributes);
                    if pending.is_none() {
                        tracing::debug!(source = source_name, "testcase without a usable time, skipping");
                    }
                }
                XmlEvent::Open { name, .. } if name.eq_ignore_ascii_case("failure") => {
                    if let Some(mut case) = pending.take() {
                        case.success = false;
                        emit(&mut report, case, sink);
                    }
                }
                XmlEvent::Close { name }
                    if name.eq_ignore_ascii_case("testcase")
                        || name.eq_ignore_ascii_case("testsuite") =>
                {
                    if let Some(case) = pending.take() {
                        emit(&mut report, case, sink);
                    }
                }
                _ => {}
            }
        }

        report.settle();
        Ok(report)
    }
}
