pub mod jmeter;
pub mod junit;
pub mod xml;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::diagnostics::DiagnosticSink;
use crate::error::{ReportError, Result};
use crate::report::AggregateReport;

pub use jmeter::JMeterParser;
pub use junit::JUnitParser;

/// Turns one raw log into an [`AggregateReport`].
pub trait ReportParser: Send + Sync {
    fn kind(&self) -> ParserKind;

    /// Streams `input` to completion. Dropped samples go to `sink`;
    /// an untokenizable stream is returned as `MalformedInput`.
    fn parse(
        &self,
        source_name: &str,
        input: &mut dyn BufRead,
        sink: &dyn DiagnosticSink,
    ) -> Result<AggregateReport>;

    /// Parses a file, naming the report after the file name.
    fn parse_file(&self, path: &Path, sink: &dyn DiagnosticSink) -> Result<AggregateReport> {
        let source_name = source_name(path);
        tracing::info!(
            "Performance: Parsing {} report file {source_name}",
            self.kind().display_name()
        );
        let mut input = BufReader::new(File::open(path)?);
        self.parse(&source_name, &mut input, sink).map_err(|e| {
            tracing::warn!("Performance: Failed to parse {}: {e}", path.display());
            e
        })
    }
}

/// Report name for a source file: its file name.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ─── Parser kinds ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    JMeter,
    JUnit,
}

impl ParserKind {
    pub fn id(self) -> &'static str {
        match self {
            Self::JMeter => "jmeter",
            Self::JUnit => "junit",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::JMeter => "JMeter",
            Self::JUnit => "JUnit",
        }
    }

    /// Where this kind of log conventionally lives, for discovery tools.
    pub fn default_glob(self) -> &'static str {
        match self {
            Self::JMeter => "**/*.jtl",
            Self::JUnit => "**/TEST-*.xml",
        }
    }

    pub fn parser(self) -> Arc<dyn ReportParser> {
        match self {
            Self::JMeter => Arc::new(JMeterParser),
            Self::JUnit => Arc::new(JUnitParser),
        }
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ParserKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jmeter" => Ok(Self::JMeter),
            "junit" => Ok(Self::JUnit),
            other => Err(format!("unknown parser {other:?}, expected jmeter or junit")),
        }
    }
}

// ─── Batch ───────────────────────────────────────────────────────

/// Parses every file on the blocking pool, one report per file.
/// Files that fail are reported to `sink` and left out; the rest come
/// back in input order.
pub async fn parse_batch(
    parser: Arc<dyn ReportParser>,
    paths: Vec<PathBuf>,
    sink: Arc<dyn DiagnosticSink>,
) -> Vec<AggregateReport> {
    let mut tasks = JoinSet::new();

    for (idx, path) in paths.into_iter().enumerate() {
        let parser = parser.clone();
        let sink = sink.clone();
        tasks.spawn_blocking(move || {
            let parsed = parser.parse_file(&path, sink.as_ref());
            (idx, path, parsed)
        });
    }

    let mut reports = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, _, Ok(report))) => reports.push((idx, report)),
            Ok((_, path, Err(e))) => sink.report(skip_message(&path, &e)),
            Err(e) => sink.report(format!("Performance: parse task failed: {e}")),
        }
    }

    reports.sort_by_key(|(idx, _)| *idx);
    reports.into_iter().map(|(_, report)| report).collect()
}

pub(crate) fn skip_message(path: &Path, err: &ReportError) -> String {
    format!("Performance: skipping report {}: {err}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_ids() {
        assert_eq!("JMeter".parse::<ParserKind>().unwrap(), ParserKind::JMeter);
        assert_eq!("junit".parse::<ParserKind>().unwrap(), ParserKind::JUnit);
        assert!("gatling".parse::<ParserKind>().is_err());
    }

    #[test]
    fn parser_matches_its_kind() {
        for kind in [ParserKind::JMeter, ParserKind::JUnit] {
            assert_eq!(kind.parser().kind(), kind);
        }
    }

    #[test]
    fn source_name_is_the_file_name() {
        assert_eq!(source_name(Path::new("/tmp/run/JMeterResults.jtl")), "JMeterResults.jtl");
    }
}
