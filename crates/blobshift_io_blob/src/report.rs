//! Per-object progress events and the aggregate batch report.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{error, info};

use crate::spec::EnumTransferKind;

/// Result of processing one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumTransferOutcome {
    Succeeded,
    /// Failure reason; the batch stops after this entry.
    Failed(String),
    /// Planned only (dry run).
    Skipped,
}

impl fmt::Display for EnumTransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

/// One processed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTransferEntry {
    /// 1-based position in the batch.
    pub ordinal: usize,
    /// Source object key or local path.
    pub source: String,
    /// Destination key or local path; `None` for deletes.
    pub destination: Option<String>,
    pub outcome: EnumTransferOutcome,
}

/// Side-effect-only observer, called once per processed object.
pub trait TransferObserver {
    fn on_object(&mut self, kind: EnumTransferKind, n_total: usize, entry: &SpecTransferEntry);
}

impl<F> TransferObserver for F
where
    F: FnMut(EnumTransferKind, usize, &SpecTransferEntry),
{
    fn on_object(&mut self, kind: EnumTransferKind, n_total: usize, entry: &SpecTransferEntry) {
        self(kind, n_total, entry)
    }
}

/// Observer that emits one `tracing` event per object.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TransferObserver for TracingObserver {
    fn on_object(&mut self, kind: EnumTransferKind, n_total: usize, entry: &SpecTransferEntry) {
        let c_destination = entry.destination.as_deref().unwrap_or("-");
        match &entry.outcome {
            EnumTransferOutcome::Failed(reason) => error!(
                "{} file {} of {n_total} failed: {} -> {c_destination}: {reason}",
                kind.verb(),
                entry.ordinal,
                entry.source
            ),
            outcome => info!(
                "{} file {} of {n_total}: {} -> {c_destination} ({outcome})",
                kind.verb(),
                entry.ordinal,
                entry.source
            ),
        }
    }
}

/// Aggregate counters for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTransfer {
    pub kind: EnumTransferKind,
    /// Candidates returned by the listing (0 in exact mode).
    pub cnt_listed: u64,
    /// Objects selected for processing.
    pub cnt_matched: u64,
    pub cnt_succeeded: u64,
    /// Objects only planned (dry run).
    pub cnt_skipped: u64,
    /// Processed objects, in batch order.
    pub entries: Vec<SpecTransferEntry>,
}

impl ReportTransfer {
    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_listed".to_string(), self.cnt_listed);
        dict_counts.insert("cnt_matched".to_string(), self.cnt_matched);
        dict_counts.insert("cnt_succeeded".to_string(), self.cnt_succeeded);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} listed={} matched={} succeeded={} skipped={}",
            self.cnt_listed, self.cnt_matched, self.cnt_succeeded, self.cnt_skipped
        )
    }
}

impl fmt::Display for ReportTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_prefix = format!("[{}]", self.kind.label().to_ascii_uppercase());
        write!(f, "{}", self.format(&c_prefix))
    }
}

/// Mutable accumulator for one batch.
#[derive(Debug, Clone)]
pub struct ReportTransferBuilder {
    kind: EnumTransferKind,
    cnt_listed: u64,
    cnt_matched: u64,
    cnt_succeeded: u64,
    cnt_skipped: u64,
    entries: Vec<SpecTransferEntry>,
}

impl ReportTransferBuilder {
    pub fn new(kind: EnumTransferKind) -> Self {
        Self {
            kind,
            cnt_listed: 0,
            cnt_matched: 0,
            cnt_succeeded: 0,
            cnt_skipped: 0,
            entries: Vec::new(),
        }
    }

    pub fn kind(&self) -> EnumTransferKind {
        self.kind
    }

    pub fn set_listed(&mut self, n_listed: usize) {
        self.cnt_listed = n_listed as u64;
    }

    pub fn set_matched(&mut self, n_matched: usize) {
        self.cnt_matched = n_matched as u64;
    }

    /// Record `entry`, notify `observer`, and bump the matching counter.
    pub fn add_entry(
        &mut self,
        entry: SpecTransferEntry,
        observer: &mut dyn TransferObserver,
    ) {
        observer.on_object(self.kind, self.cnt_matched as usize, &entry);
        match entry.outcome {
            EnumTransferOutcome::Succeeded => self.cnt_succeeded += 1,
            EnumTransferOutcome::Skipped => self.cnt_skipped += 1,
            EnumTransferOutcome::Failed(_) => {}
        }
        self.entries.push(entry);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportTransfer {
        ReportTransfer {
            kind: self.kind,
            cnt_listed: self.cnt_listed,
            cnt_matched: self.cnt_matched,
            cnt_succeeded: self.cnt_succeeded,
            cnt_skipped: self.cnt_skipped,
            entries: self.entries,
        }
    }
}
