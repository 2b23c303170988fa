// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::interrupt::Waiter;

/// Notification gate between registry mutations and a clock driver waiting for admission.
///
/// The driver declares its intent to block while holding the gate lock and only
/// then re-checks its condition. A notifier first mutates the registry and then
/// tests-and-clears the intent flag, taking the lock only if a driver declared
/// intent. One of the two always observes the other, so no wakeup is lost.
#[derive(Debug, Default)]
pub(crate) struct Gate {
    intent: AtomicBool,
    parked: Mutex<Option<Arc<Waiter>>>,
}

/// Exclusive access to the gate, held by the driver while it scans and advances.
#[derive(Debug)]
pub(crate) struct GateGuard<'a> {
    gate: &'a Gate,
    parked: MutexGuard<'a, Option<Arc<Waiter>>>,
}

impl Gate {
    pub(crate) fn lock(&self) -> GateGuard<'_> {
        GateGuard {
            gate: self,
            parked: self.parked.lock(),
        }
    }

    /// Wakes the parked driver, if one has declared intent to wait.
    #[cfg_attr(test, mutants::skip)] // Losing the wake parks the driver forever, tests time out.
    pub(crate) fn notify(&self) {
        if self
            .intent
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        if let Some(driver) = self.parked.lock().as_ref() {
            driver.wake();
        }
    }
}

impl GateGuard<'_> {
    /// Announces that the driver is about to block. Must precede the final condition check.
    pub(crate) fn declare_intent(&self) {
        self.gate.intent.store(true, Ordering::SeqCst);
    }

    /// Registers `driver` as the thread to wake and releases the gate.
    ///
    /// The caller parks right after. A notification arriving in between leaves a
    /// wake token behind, so the park returns immediately.
    pub(crate) fn release_parked(mut self, driver: &Arc<Waiter>) {
        *self.parked = Some(Arc::clone(driver));
    }

    /// Leaves the gate without waiting.
    pub(crate) fn withdraw(mut self) {
        self.gate.intent.store(false, Ordering::SeqCst);
        *self.parked = None;
    }
}
