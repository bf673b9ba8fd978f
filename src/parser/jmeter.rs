use std::io::BufRead;

use chrono::{DateTime, TimeZone, Utc};

use crate::diagnostics::DiagnosticSink;
use crate::error::Result;
use crate::report::AggregateReport;

use super::xml::{Attributes, XmlEvent, XmlEvents};
use super::{ParserKind, ReportParser};

/// Tags delimiting one JMeter record: `httpSample` for HTTP samplers,
/// `sample` for everything else. Matched case-insensitively.
const RECORD_TAGS: &[&str] = &["httpSample", "sample"];

// JTL 2.1 short keys first, 2.0 long keys second.
const TIMESTAMP_KEYS: &[&str] = &["ts", "timeStamp"];
const DURATION_KEYS: &[&str] = &["t", "time"];
const SUCCESS_KEYS: &[&str] = &["s", "success"];
const LABEL_KEYS: &[&str] = &["lb", "label"];

/// Parser for JMeter XML result logs (`.jtl`).
///
/// Records may nest (sub-results of a transaction or embedded resources).
/// Only the outermost record of each nesting run becomes a sample.
/// `httpSample` and `sample` share one depth counter, so a `sample` wrapping
/// `httpSample` children yields only the `sample`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JMeterParser;

/// One outer record waiting for its closing tag.
#[derive(Debug)]
struct PendingRecord {
    label: String,
    duration_ms: u64,
    success: bool,
    timestamp: DateTime<Utc>,
}

fn is_record(name: &str) -> bool {
    RECORD_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(name))
}

/// `None` when the timestamp or elapsed time is missing or unreadable.
fn read_record(attributes: &Attributes) -> Option<PendingRecord> {
    let ts: i64 = attributes.first_of(TIMESTAMP_KEYS)?.trim().parse().ok()?;
    let duration_ms: u64 = attributes.first_of(DURATION_KEYS)?.trim().parse().ok()?;
    let timestamp = Utc.timestamp_millis_opt(ts).single()?;
    let success = attributes
        .first_of(SUCCESS_KEYS)
        .is_some_and(|s| s.trim().eq_ignore_ascii_case("true"));
    let label = attributes.first_of(LABEL_KEYS).unwrap_or_default().to_string();

    Some(PendingRecord {
        label,
        duration_ms,
        success,
        timestamp,
    })
}

impl ReportParser for JMeterParser {
    fn kind(&self) -> ParserKind {
        ParserKind::JMeter
    }

    fn parse(
        &self,
        source_name: &str,
        input: &mut dyn BufRead,
        sink: &dyn DiagnosticSink,
    ) -> Result<AggregateReport> {
        let mut report = AggregateReport::new(source_name);
        let mut events = XmlEvents::new(source_name, input);
        let mut depth = 0usize;
        let mut pending: Option<PendingRecord> = None;

        while let Some(event) = events.next_event()? {
            match event {
                XmlEvent::Open { name, attributes } if is_record(&name) => {
                    if depth == 0 {
                        pending = read_record(&attributes);
                        if pending.is_none() {
                            tracing::debug!(source = source_name, "incomplete <{name}> record, skipping");
                        }
                    }
                    depth += 1;
                }
                XmlEvent::Close { name } if is_record(&name) => {
                    if depth == 1 {
                        if let Some(record) = pending.take() {
                            if let Err(e) = report.add_sample(
                                &record.label,
                                record.duration_ms,
                                record.success,
                                record.timestamp,
                            ) {
                                sink.report(e.to_string());
                            }
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
        }

        report.settle();
        Ok(report)
    }
}
