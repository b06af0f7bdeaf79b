//! Stream accumulator — owner of the growing record sequence.
//!
//! The accumulator is the single owner of the in-memory records; classifiers
//! and the query engine only borrow read access through [`snapshot`]. It
//! also does the flush bookkeeping:
//!
//! - a **size trigger** fires once when the count of records appended since
//!   the last successful flush first reaches the threshold (an edge trigger
//!   per crossing, not a level trigger — see [`append`]);
//! - the host's periodic timer asks [`needs_periodic_flush`] and skips the
//!   flush when nothing new arrived.
//!
//! A flush persists the *full* serialized snapshot through the Store — a
//! total-state overwrite, not an append log. Flush and clear failures are
//! logged and counted, never propagated, and never touch the in-memory
//! records; the next scheduled flush retries with the then-current snapshot.
//!
//! Hosts that must keep appending while the Store write is outstanding use
//! the split form: [`begin_flush`] serializes the batch and the host runs
//! `save_batch` on its own task, reporting back through [`finish_flush`].
//! [`flush`] is the inline composition of the two.
//!
//! [`begin_flush`]: Accumulator::begin_flush
//! [`finish_flush`]: Accumulator::finish_flush
//! [`flush`]: Accumulator::flush
//!
//! [`snapshot`]: Accumulator::snapshot
//! [`append`]: Accumulator::append
//! [`needs_periodic_flush`]: Accumulator::needs_periodic_flush

use crate::error::Result;
use crate::normalize::normalize;
use crate::store::Store;
use crate::types::Record;
use chrono::{DateTime, Utc};

/// Number of appends since the last successful flush that arms the size
/// trigger.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 100;

/// Counters describing flush activity, for status reporting.
#[derive(Debug, Default, Clone)]
pub struct FlushStats {
    /// Successful flushes
    pub flushes: usize,
    /// Failed flush attempts
    pub flush_failures: usize,
    /// Records written by the most recent successful flush
    pub last_flush_size: usize,
}

/// Bookkeeping for a flush whose Store write is still outstanding.
#[derive(Debug)]
struct InFlightFlush {
    /// Appends covered by the outstanding batch; later appends stay in the
    /// counter when the flush completes
    covered_appends: usize,
    batch_len: usize,
}

/// Owner of the append-only record sequence and its persistence triggers.
pub struct Accumulator<S: Store> {
    store: S,
    records: Vec<Record>,
    appended_since_flush: usize,
    size_threshold: usize,
    /// Set while the current threshold crossing's flush has not completed,
    /// so the trigger cannot re-fire from appends racing the flush.
    size_flush_pending: bool,
    in_flight: Option<InFlightFlush>,
    last_flush_at: Option<DateTime<Utc>>,
    stats: FlushStats,
}

impl<S: Store> Accumulator<S> {
    /// Empty accumulator with the default size threshold.
    pub fn new(store: S) -> Self {
        Self::with_threshold(store, DEFAULT_FLUSH_THRESHOLD)
    }

    pub fn with_threshold(store: S, size_threshold: usize) -> Self {
        Self {
            store,
            records: Vec::new(),
            appended_since_flush: 0,
            size_threshold: size_threshold.max(1),
            size_flush_pending: false,
            in_flight: None,
            last_flush_at: None,
            stats: FlushStats::default(),
        }
    }

    /// Rebuild the in-memory sequence from the Store's last persisted batch.
    ///
    /// Entries that fail to deserialize as records are re-normalized, so a
    /// corrupted entry degrades to a synthetic raw record instead of being
    /// dropped. Returns the number of records loaded. Hydration does not
    /// count toward the flush counter.
    pub async fn hydrate(&mut self) -> Result<usize> {
        let batch = self.store.load_batch().await?;
        let count = batch.len();
        for entry in batch {
            let record =
                serde_json::from_str::<Record>(&entry).unwrap_or_else(|_| normalize(&entry));
            self.records.push(record);
        }
        Ok(count)
    }

    /// Append one record to the live sequence.
    ///
    /// Returns `true` exactly when this append crosses the size threshold —
    /// the caller should then run [`flush`](Self::flush). The trigger fires
    /// once per crossing: further appends while the flush is outstanding,
    /// or while a failed flush leaves the counter above the threshold, do
    /// not re-fire it. A fresh crossing requires the counter to climb to
    /// the threshold again after a successful flush.
    pub fn append(&mut self, record: Record) -> bool {
        self.records.push(record);
        self.appended_since_flush += 1;

        if self.appended_since_flush == self.size_threshold && !self.size_flush_pending {
            self.size_flush_pending = true;
            return true;
        }
        false
    }

    /// Read-only view of the full record sequence.
    pub fn snapshot(&self) -> &[Record] {
        &self.records
    }

    /// The underlying Store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records appended since the last successful flush.
    pub fn appended_since_flush(&self) -> usize {
        self.appended_since_flush
    }

    /// Whether the periodic timer should flush: true only when at least one
    /// record arrived since the previous flush.
    pub fn needs_periodic_flush(&self) -> bool {
        self.appended_since_flush > 0
    }

    /// Time of the last successful flush.
    pub fn last_flush_at(&self) -> Option<DateTime<Utc>> {
        self.last_flush_at
    }

    pub fn stats(&self) -> &FlushStats {
        &self.stats
    }

    /// Whether a [`begin_flush`](Self::begin_flush) batch is outstanding.
    pub fn flush_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Serialize the current snapshot for a flush the caller runs itself.
    ///
    /// The host hands the returned batch to `Store::save_batch` on its own
    /// task and reports the outcome through
    /// [`finish_flush`](Self::finish_flush); appends keep landing in the
    /// live sequence while the write is outstanding, and the ones not
    /// covered by the batch stay in the flush counter afterwards.
    ///
    /// Returns `None` when another flush is already in flight, when the
    /// accumulator is empty (the counters reset trivially), or when
    /// serialization fails (logged and counted as a flush failure).
    pub fn begin_flush(&mut self) -> Option<Vec<String>> {
        if self.in_flight.is_some() {
            return None;
        }
        if self.records.is_empty() {
            self.size_flush_pending = false;
            self.appended_since_flush = 0;
            return None;
        }

        match serialize_records(&self.records) {
            Ok(batch) => {
                self.in_flight = Some(InFlightFlush {
                    covered_appends: self.appended_since_flush,
                    batch_len: batch.len(),
                });
                Some(batch)
            }
            Err(e) => {
                self.stats.flush_failures += 1;
                self.size_flush_pending = false;
                tracing::warn!(error = %e, "Failed to serialize records for flush");
                None
            }
        }
    }

    /// Record the outcome of an outstanding [`begin_flush`](Self::begin_flush)
    /// batch.
    ///
    /// On success the appends covered by the batch leave the flush counter;
    /// appends that arrived during the write remain and count toward the
    /// next crossing. On failure the counter keeps its full value so the
    /// next scheduled flush retries. Calling this with no flush in flight
    /// (e.g. after [`clear`](Self::clear)) is a no-op.
    pub fn finish_flush(&mut self, ok: bool) -> bool {
        let Some(flight) = self.in_flight.take() else {
            return ok;
        };

        if ok {
            self.appended_since_flush = self
                .appended_since_flush
                .saturating_sub(flight.covered_appends);
            self.size_flush_pending = false;
            self.last_flush_at = Some(Utc::now());
            self.stats.flushes += 1;
            self.stats.last_flush_size = flight.batch_len;
        } else {
            self.stats.flush_failures += 1;
            self.size_flush_pending = false;
        }
        ok
    }

    /// Persist the full current snapshot through the Store, inline.
    ///
    /// Returns `true` on success. Failures are logged and counted but do
    /// not propagate and do not roll back the in-memory records; the flush
    /// counter keeps its value so the next scheduled flush retries. An
    /// empty accumulator flushes trivially without touching the Store.
    pub async fn flush(&mut self) -> bool {
        if self.records.is_empty() {
            self.size_flush_pending = false;
            self.appended_since_flush = 0;
            return true;
        }

        let Some(batch) = self.begin_flush() else {
            return false;
        };

        let count = batch.len();
        match self.store.save_batch(&batch).await {
            Ok(()) => {
                tracing::debug!(records = count, "Flushed record batch");
                self.finish_flush(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, records = count, "Failed to persist record batch");
                self.finish_flush(false)
            }
        }
    }

    /// Empty the in-memory sequence and ask the Store to drop the persisted
    /// batch.
    ///
    /// The in-memory clear always takes effect; a Store failure is logged
    /// and reflected in the `false` return value only.
    pub async fn clear(&mut self) -> bool {
        self.records.clear();
        self.appended_since_flush = 0;
        self.size_flush_pending = false;
        // A flush still in flight is orphaned; its late finish_flush is a no-op
        self.in_flight = None;

        match self.store.clear_batch().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to clear persisted batch");
                false
            }
        }
    }
}

/// Serialize records to the Store's batch representation: one JSON string
/// per record, in sequence order.
pub fn serialize_records(records: &[Record]) -> Result<Vec<String>> {
    records
        .iter()
        .map(|r| serde_json::to_string(r).map_err(Into::into))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn record(level: i64) -> Record {
        normalize(&format!(r#"{{"level":{},"messages":["m"]}}"#, level))
    }

    #[tokio::test]
    async fn test_append_and_snapshot() {
        let mut acc = Accumulator::new(MemoryStore::new());
        assert!(acc.is_empty());

        acc.append(record(1));
        acc.append(record(2));
        assert_eq!(acc.len(), 2);
        assert_eq!(acc.snapshot()[1].level, 2);
    }

    #[tokio::test]
    async fn test_size_trigger_fires_once_per_crossing() {
        let mut acc = Accumulator::with_threshold(MemoryStore::new(), 3);

        assert!(!acc.append(record(0)));
        assert!(!acc.append(record(0)));
        assert!(acc.append(record(0)));
        // Past the threshold with the flush still pending: no re-fire
        assert!(!acc.append(record(0)));
        assert!(!acc.append(record(0)));
    }

    #[tokio::test]
    async fn test_flush_persists_full_snapshot_and_resets_counter() {
        let store = MemoryStore::new();
        let mut acc = Accumulator::with_threshold(store, 3);

        for _ in 0..3 {
            acc.append(record(1));
        }
        assert!(acc.flush().await);
        assert_eq!(acc.appended_since_flush(), 0);
        assert_eq!(acc.len(), 3, "flush must not drain in-memory records");
        assert_eq!(acc.stats().last_flush_size, 3);

        // Next crossing arms the trigger again
        assert!(!acc.append(record(1)));
        assert!(!acc.append(record(1)));
        assert!(acc.append(record(1)));
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_records_and_retries_later() {
        let store = MemoryStore::new();
        store.fail_batch_saves(true);
        let mut acc = Accumulator::with_threshold(store, 2);

        acc.append(record(1));
        assert!(acc.append(record(1)));
        assert!(!acc.flush().await);
        assert_eq!(acc.len(), 2);
        assert_eq!(acc.stats().flush_failures, 1);
        // Counter not reset by the failure
        assert!(acc.needs_periodic_flush());

        // Appends while over the threshold do not re-fire the size trigger
        assert!(!acc.append(record(1)));
    }

    #[tokio::test]
    async fn test_periodic_flush_skipped_when_idle() {
        let mut acc = Accumulator::new(MemoryStore::new());
        assert!(!acc.needs_periodic_flush());

        acc.append(record(1));
        assert!(acc.needs_periodic_flush());
        acc.flush().await;
        assert!(!acc.needs_periodic_flush());
    }

    #[tokio::test]
    async fn test_appends_during_outstanding_flush_are_not_blocked() {
        let store = MemoryStore::new();
        let mut acc = Accumulator::with_threshold(store, 3);

        for _ in 0..3 {
            acc.append(record(1));
        }
        let batch = acc.begin_flush().unwrap();
        assert_eq!(batch.len(), 3);
        assert!(acc.flush_in_flight());

        // Arrivals while the Store write is outstanding land immediately
        acc.append(record(2));
        acc.append(record(2));
        assert_eq!(acc.len(), 5);

        acc.store().save_batch(&batch).await.unwrap();
        acc.finish_flush(true);
        assert!(!acc.flush_in_flight());
        assert_eq!(acc.stats().last_flush_size, 3);

        // Only the covered appends left the counter; the late two count
        // toward the next crossing
        assert_eq!(acc.appended_since_flush(), 2);
        assert!(acc.append(record(2)));
    }

    #[tokio::test]
    async fn test_begin_flush_refused_while_one_is_outstanding() {
        let mut acc = Accumulator::with_threshold(MemoryStore::new(), 2);

        acc.append(record(1));
        acc.append(record(1));
        let _batch = acc.begin_flush().unwrap();
        assert!(acc.begin_flush().is_none());

        acc.finish_flush(false);
        assert_eq!(acc.stats().flush_failures, 1);
        // Retry possible once the outcome is recorded
        assert!(acc.begin_flush().is_some());
    }

    #[tokio::test]
    async fn test_finish_flush_after_clear_is_a_no_op() {
        let store = MemoryStore::new();
        let mut acc = Accumulator::new(store);

        acc.append(record(1));
        let _batch = acc.begin_flush().unwrap();
        acc.clear().await;
        assert!(!acc.flush_in_flight());

        acc.finish_flush(true);
        assert_eq!(acc.stats().flushes, 0);
        assert_eq!(acc.appended_since_flush(), 0);
    }

    #[tokio::test]
    async fn test_clear_survives_store_failure() {
        let store = MemoryStore::new();
        let mut acc = Accumulator::new(store);

        acc.append(record(1));
        acc.flush().await;

        acc.store().fail_batch_clears(true);
        assert!(!acc.clear().await);
        assert!(acc.is_empty(), "in-memory clear must take effect anyway");
        assert_eq!(acc.appended_since_flush(), 0);
    }

    #[tokio::test]
    async fn test_hydrate_restores_records_and_renormalizes_garbage() {
        let store = MemoryStore::new();
        store
            .save_batch(&[
                serde_json::to_string(&record(4)).unwrap(),
                "not json at all".to_string(),
            ])
            .await
            .unwrap();

        let mut acc = Accumulator::new(store);
        let loaded = acc.hydrate().await.unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(acc.snapshot()[0].level, 4);
        assert_eq!(acc.snapshot()[1].label, "raw");
        assert!(!acc.needs_periodic_flush());
    }

    #[tokio::test]
    async fn test_serialize_round_trip() {
        let records = vec![record(0), record(3)];
        let serialized = serialize_records(&records).unwrap();
        let restored: Vec<Record> = serialized
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect();
        assert_eq!(records, restored);
    }
}
