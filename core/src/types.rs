//! Verdicts and result maps.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LookupFailure;

/// Classification of a single URL.
///
/// Serialized as the token the service uses on the wire, with `"error"` as the
/// sentinel for URLs that could not be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "ok")]
    Clean,
    #[serde(rename = "malware")]
    Malware,
    #[serde(rename = "phishing")]
    Phishing,
    #[serde(rename = "malware,phishing", alias = "phishing,malware")]
    MalwarePhishing,
    #[serde(rename = "error")]
    Error,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Clean => "ok",
            Verdict::Malware => "malware",
            Verdict::Phishing => "phishing",
            Verdict::MalwarePhishing => "malware,phishing",
            Verdict::Error => "error",
        }
    }

    /// Parse one line of a lookup response. The service lists both lists in
    /// either order, so `"phishing,malware"` is accepted as well. `"error"` is
    /// never sent by the service and is rejected.
    pub fn from_token(token: &str) -> Option<Verdict> {
        match token.trim() {
            "ok" => Some(Verdict::Clean),
            "malware" => Some(Verdict::Malware),
            "phishing" => Some(Verdict::Phishing),
            "malware,phishing" | "phishing,malware" => Some(Verdict::MalwarePhishing),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict per input URL, keyed by the URL exactly as the caller passed it.
///
/// A URL that occurs more than once in the input has a single entry holding
/// the verdict of its last occurrence.
pub type ResultMap = HashMap<String, Verdict>;

/// Outcome of one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    /// One entry per URL of the chunk, in chunk order.
    pub verdicts: Vec<(String, Verdict)>,
    pub failure: Option<LookupFailure>,
}

/// Per-chunk diagnostics of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReport {
    pub index: usize,
    pub len: usize,
    pub failure: Option<LookupFailure>,
}

/// Result of a lookup together with the diagnostics of every chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupReport {
    pub results: ResultMap,
    pub chunks: Vec<ChunkReport>,
}

impl LookupReport {
    /// Merge the next chunk. Chunks must be merged in order; a URL already in
    /// the map is overwritten.
    pub fn merge(&mut self, index: usize, chunk: ChunkResult) {
        self.chunks.push(ChunkReport {
            index,
            len: chunk.verdicts.len(),
            failure: chunk.failure,
        });
        self.results.extend(chunk.verdicts);
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChunkReport> {
        self.chunks.iter().filter(|c| c.failure.is_some())
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }

    /// The result map as a JSON object of URL to wire token.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.results)
    }
}
