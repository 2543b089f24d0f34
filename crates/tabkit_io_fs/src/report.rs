//! Transfer report model.

use std::collections::BTreeMap;
use std::fmt;

/// Counters for one streamed download.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportTransfer {
    /// Bytes written to the response body.
    pub cnt_bytes: u64,
    /// Non-empty chunks written.
    pub cnt_chunks: u64,
}

impl ReportTransfer {
    /// Account for one written chunk of `n_bytes`.
    pub fn add_chunk(&mut self, n_bytes: usize) {
        self.cnt_bytes += n_bytes as u64;
        self.cnt_chunks += 1;
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_bytes".to_string(), self.cnt_bytes);
        dict_counts.insert("cnt_chunks".to_string(), self.cnt_chunks);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} bytes={} chunks={}",
            self.cnt_bytes, self.cnt_chunks
        )
    }
}

impl fmt::Display for ReportTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[DOWNLOAD]"))
    }
}
