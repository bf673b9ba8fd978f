use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::parser::ParserKind;
use crate::snapshot::{SnapshotDetail, SnapshotStore};

/// Service configuration, usually read from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Address the HTTP API binds to
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Directory holding parsed-report snapshots
    #[serde(default = "default_summary_dir")]
    pub summary_dir: PathBuf,

    /// Whether snapshots keep raw samples
    #[serde(default)]
    pub snapshot_detail: SnapshotDetail,

    /// Log files to load at startup
    #[serde(default)]
    pub inputs: Vec<ReportInput>,
}

/// One log file and the format it is written in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportInput {
    pub path: PathBuf,
    pub parser: ParserKind,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_summary_dir() -> PathBuf {
    PathBuf::from("performance-summaries")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            summary_dir: default_summary_dir(),
            snapshot_detail: SnapshotDetail::default(),
            inputs: Vec::new(),
        }
    }
}

impl ReportConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn snapshot_store(&self) -> SnapshotStore {
        SnapshotStore::new(&self.summary_dir, self.snapshot_detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_takes_defaults() {
        let config: ReportConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.listen, default_listen());
        assert_eq!(config.summary_dir, PathBuf::from("performance-summaries"));
        assert_eq!(config.snapshot_detail, SnapshotDetail::Summary);
        assert!(config.inputs.is_empty());
    }

    #[test]
    fn inputs_name_their_parser() {
        let config: ReportConfig = serde_json::from_str(
            r#"{
                "listen": "127.0.0.1:8080",
                "snapshot_detail": "full",
                "inputs": [
                    { "path": "results/run.jtl", "parser": "jmeter" },
                    { "path": "results/TEST-suite.xml", "parser": "junit" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.listen.port(), 8080);
        assert_eq!(config.snapshot_detail, SnapshotDetail::Full);
        assert_eq!(config.inputs[1].parser, ParserKind::JUnit);
    }

    #[test]
    fn unknown_parser_is_rejected() {
        let parsed: std::result::Result<ReportConfig, _> =
            serde_json::from_str(r#"{ "inputs": [{ "path": "x", "parser": "gatling" }] }"#);
        assert!(parsed.is_err());
    }
}
