//! Typed append-only ledger
//!
//! Entries are never mutated or removed; sequence numbers are assigned
//! in append order and are dense. Reads return snapshots so callers
//! never observe a half-appended state.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use veris_core::{now, Result, Timestamp, VerisError};

/// A single ledger entry: the appended value plus its position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry<T> {
    /// Dense, monotonically increasing position in the ledger
    pub seq: u64,
    /// When the entry was appended
    pub recorded_at: Timestamp,
    /// The appended value
    pub value: T,
}

/// Append-only ledger over values of one type
#[derive(Debug)]
pub struct Ledger<T> {
    name: String,
    entries: RwLock<Vec<Entry<T>>>,
}

impl<T: Clone> Ledger<T> {
    /// Create an empty ledger. The name appears in logs and exports.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Ledger name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a value, returning its sequence number
    pub fn append(&self, value: T) -> u64 {
        let mut entries = self.entries.write();
        let seq = entries.len() as u64;
        entries.push(Entry {
            seq,
            recorded_at: now(),
            value,
        });
        seq
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of all entries in append order
    pub fn entries(&self) -> Vec<Entry<T>> {
        self.entries.read().clone()
    }

    /// The most recently appended entry
    pub fn latest(&self) -> Option<Entry<T>> {
        self.entries.read().last().cloned()
    }

    /// Snapshot of all values in append order
    pub fn replay(&self) -> Vec<T> {
        self.entries
            .read()
            .iter()
            .map(|entry| entry.value.clone())
            .collect()
    }

    /// Entries whose value satisfies the predicate
    pub fn filtered(&self, predicate: impl Fn(&T) -> bool) -> Vec<Entry<T>> {
        self.entries
            .read()
            .iter()
            .filter(|entry| predicate(&entry.value))
            .cloned()
            .collect()
    }
}

impl<T: Clone + Serialize + DeserializeOwned> Ledger<T> {
    /// Export the ledger as JSON lines, one entry per line.
    ///
    /// The export is the ledger's durable form; feeding it back through
    /// [`Ledger::import`] rebuilds identical in-memory state.
    pub fn export(&self) -> Result<String> {
        let entries = self.entries.read();
        let mut out = String::new();
        for entry in entries.iter() {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Rebuild a ledger from a JSON-lines export.
    ///
    /// Rejects exports whose sequence numbers are not dense from zero:
    /// a gap means the log was truncated somewhere other than the tail.
    pub fn import(name: impl Into<String>, lines: &str) -> Result<Self> {
        let mut entries: Vec<Entry<T>> = Vec::new();
        for (i, line) in lines.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: Entry<T> = serde_json::from_str(line)?;
            if entry.seq != i as u64 {
                return Err(VerisError::invariant(format!(
                    "ledger import: expected seq {i}, found {}",
                    entry.seq
                )));
            }
            entries.push(entry);
        }
        let ledger = Self {
            name: name.into(),
            entries: RwLock::new(entries),
        };
        tracing::debug!(name = %ledger.name, entries = ledger.len(), "ledger replayed");
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_are_dense() {
        let ledger = Ledger::new("test");
        assert_eq!(ledger.append("a"), 0);
        assert_eq!(ledger.append("b"), 1);
        assert_eq!(ledger.append("c"), 2);
        assert_eq!(ledger.replay(), vec!["a", "b", "c"]);
    }

    #[test]
    fn latest_is_last_appended() {
        let ledger = Ledger::new("test");
        assert!(ledger.latest().is_none());
        ledger.append(1);
        ledger.append(2);
        assert_eq!(ledger.latest().map(|entry| entry.value), Some(2));
    }

    #[test]
    fn export_import_round_trip() {
        let ledger = Ledger::new("chain");
        ledger.append("x".to_string());
        ledger.append("y".to_string());
        let lines = ledger.export().unwrap();
        let rebuilt: Ledger<String> = Ledger::import("chain", &lines).unwrap();
        assert_eq!(rebuilt.replay(), ledger.replay());
    }

    #[test]
    fn import_rejects_gapped_log() {
        let ledger = Ledger::new("chain");
        ledger.append(1u32);
        ledger.append(2u32);
        ledger.append(3u32);
        let lines = ledger.export().unwrap();
        // Drop the middle line to simulate a corrupted log
        let gapped: Vec<&str> = lines.lines().enumerate()
            .filter(|(i, _)| *i != 1)
            .map(|(_, line)| line)
            .collect();
        assert!(Ledger::<u32>::import("chain", &gapped.join("\n")).is_err());
    }

    #[test]
    fn filtered_preserves_order() {
        let ledger = Ledger::new("numbers");
        for n in 0..10u32 {
            ledger.append(n);
        }
        let evens: Vec<u32> = ledger
            .filtered(|n| n % 2 == 0)
            .into_iter()
            .map(|entry| entry.value)
            .collect();
        assert_eq!(evens, vec![0, 2, 4, 6, 8]);
    }
}
