// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::interrupt::Waiter;
use crate::record::Record;

/// The ordered set of live reservation records.
///
/// Always contains the sentinel, so the minimum is always defined. Every
/// operation takes the internal lock for a short, bounded section: an insert
/// or removal is logarithmic in the number of live records, and a scan only
/// walks the records at a single tick.
#[derive(Debug)]
pub(crate) struct Registry {
    records: Mutex<BTreeSet<Record>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(BTreeSet::from([Record::sentinel()])),
        }
    }

    pub(crate) fn insert(&self, record: Record) {
        self.records.lock().insert(record);
    }

    /// Removes the record with the same identity, returning whether it was live.
    pub(crate) fn remove(&self, record: &Record) -> bool {
        debug_assert!(!record.is_sentinel(), "the sentinel is never removed");
        self.records.lock().remove(record)
    }

    /// Target tick of the smallest live record. The sentinel's when nothing else is live.
    pub(crate) fn minimum_target(&self) -> u64 {
        self.records
            .lock()
            .first()
            .map(Record::target)
            .expect("the sentinel record keeps the registry non-empty")
    }

    /// Collects the owners of awaiting records whose target is exactly `tick`.
    ///
    /// The caller wakes them after the lock is released.
    pub(crate) fn awaiting_at(&self, tick: u64) -> Vec<Arc<Waiter>> {
        self.records
            .lock()
            .iter()
            .take_while(|record| record.target() <= tick)
            .filter(|record| record.target() == tick && record.is_awaiting())
            .filter_map(|record| record.owner().map(Arc::clone))
            .collect()
    }

    /// Number of live records, not counting the sentinel.
    pub(crate) fn len(&self) -> usize {
        self.records.lock().len() - 1
    }
}
