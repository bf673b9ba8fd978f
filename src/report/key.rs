use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::error::{ReportError, Result};

/// Suffix terminating every composite endpoint key.
pub const END_PERFORMANCE_PARAMETER: &str = ".endperformanceparameter";

/// Separates the source name from the endpoint id inside a key.
pub const SEPARATOR: char = ';';

/// Everything except `A-Z a-z 0-9 . - * _` is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'*')
    .remove(b'_');

/// Turns a raw endpoint label into a token usable as one URL path segment:
/// drops `http:` and replaces every `/` with `_`.
pub fn normalize(raw: &str) -> String {
    raw.replace("http:", "").replace('/', "_")
}

fn escape(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

fn unescape(value: &str) -> Result<String> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ReportError::InvalidKey(format!("{value}: {e}")))
}

/// Address of one endpoint across all loaded reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EndpointKey {
    pub source_name: String,
    pub endpoint_id: String,
}

impl EndpointKey {
    pub fn new(source_name: impl Into<String>, endpoint_id: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            endpoint_id: endpoint_id.into(),
        }
    }

    /// `<source>;<endpoint id>.endperformanceparameter`, with each field
    /// escaped so the separator cannot leak, then escaped again as a
    /// whole so the key survives one round of URL decoding.
    pub fn encode(&self) -> String {
        let inner = format!(
            "{}{SEPARATOR}{}{END_PERFORMANCE_PARAMETER}",
            escape(&self.source_name),
            escape(&self.endpoint_id),
        );
        escape(&inner)
    }

    /// Inverse of [`encode`](Self::encode).
    pub fn decode(encoded: &str) -> Result<Self> {
        Self::parse(&unescape(encoded)?)
    }

    /// Parses a key that has already been URL-decoded once, as handed
    /// over by a router's path extractor.
    pub fn parse(key: &str) -> Result<Self> {
        let body = key.strip_suffix(END_PERFORMANCE_PARAMETER).unwrap_or(key);
        let (source, endpoint) = body
            .split_once(SEPARATOR)
            .ok_or_else(|| ReportError::InvalidKey(format!("missing separator in {key:?}")))?;
        if source.is_empty() || endpoint.is_empty() {
            return Err(ReportError::InvalidKey(format!("empty field in {key:?}")));
        }
        Ok(Self::new(unescape(source)?, unescape(endpoint)?))
    }
}
