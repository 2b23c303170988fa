// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicU64};

use crate::interrupt::Waiter;

/// Source of record sequence ids. Zero is reserved for the sentinel.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// One entry of the reservation registry.
///
/// Records are ordered by target tick, then by sequence id, then with plain
/// reservations before awaiting markers. The owner only takes part in the
/// ordering through the sequence id, which is unique per reservation.
#[derive(Debug, Clone)]
pub(crate) struct Record {
    target: u64,
    sequence: u64,
    awaiting: bool,
    owner: Option<Arc<Waiter>>,
}

impl Record {
    /// A plain reservation for `target`, with a fresh sequence id.
    pub(crate) fn reservation(target: u64, owner: Arc<Waiter>) -> Self {
        Self {
            target,
            sequence: NEXT_SEQUENCE.fetch_add(1, atomic::Ordering::Relaxed),
            awaiting: false,
            owner: Some(owner),
        }
    }

    /// The always-present record at tick infinity.
    pub(crate) const fn sentinel() -> Self {
        Self {
            target: u64::MAX,
            sequence: 0,
            awaiting: false,
            owner: None,
        }
    }

    /// The awaiting marker of this reservation. Same target and sequence id.
    pub(crate) fn to_awaiting(&self) -> Self {
        Self {
            awaiting: true,
            ..self.clone()
        }
    }

    pub(crate) const fn target(&self) -> u64 {
        self.target
    }

    pub(crate) const fn is_awaiting(&self) -> bool {
        self.awaiting
    }

    pub(crate) const fn is_sentinel(&self) -> bool {
        self.owner.is_none()
    }

    pub(crate) fn owner(&self) -> Option<&Arc<Waiter>> {
        self.owner.as_ref()
    }

    fn key(&self) -> (u64, u64, bool) {
        (self.target, self.sequence, self.awaiting)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Record {}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}
