// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{Level, event};

use crate::gate::Gate;
use crate::interrupt::Waiter;
use crate::participant::Participant;
use crate::record::Record;
use crate::registry::Registry;
use crate::{Error, Result};

/// A shared logical clock whose advancement is gated by reservations.
///
/// Threads take part through a [`Participant`] obtained from
/// [`participant`][Self::participant]. A participant reserves the next tick at
/// which it will be ready, and [`tick`][Self::tick] only moves the clock past
/// its current value once every live reservation lies beyond it.
///
/// `Ticker` is `Send` and `Sync`. Share it by reference (e.g. with
/// [`std::thread::scope`]) or wrap it in an `Arc`.
///
/// # Examples
///
/// ```
/// use lockstep::Ticker;
///
/// let ticker = Ticker::new();
/// let mut participant = ticker.participant();
/// participant.reserve(2).unwrap();
///
/// // Reserved up to tick 2, so the clock may advance twice.
/// ticker.tick().unwrap();
/// ticker.tick().unwrap();
/// assert_eq!(ticker.now(), 2);
///
/// // A third tick would block until the participant reserves further or relaxes.
/// participant.relax();
/// ticker.tick().unwrap();
/// assert_eq!(ticker.now(), 3);
/// ```
pub struct Ticker {
    now: AtomicU64,
    registry: Registry,
    gate: Gate,
    // Held for the whole of `tick()`: there is at most one driver at a time.
    driver: Mutex<()>,
}

impl Ticker {
    /// Creates a ticker with the clock at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a ticker with the clock at `tick`.
    #[must_use]
    pub fn starting_at(tick: u64) -> Self {
        Self {
            now: AtomicU64::new(tick),
            registry: Registry::new(),
            gate: Gate::default(),
            driver: Mutex::new(()),
        }
    }

    /// Returns the current tick. Wait-free.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }

    /// Creates the participant handle of the calling thread.
    ///
    /// The participant starts unregistered and does not hold the clock back
    /// until it reserves or waits.
    #[must_use]
    pub fn participant(&self) -> Participant<'_> {
        Participant::new(self)
    }

    /// Number of live reservation records, including awaiting markers.
    #[must_use]
    pub fn live_reservations(&self) -> usize {
        self.registry.len()
    }

    /// Advances the clock by exactly one tick.
    ///
    /// Blocks until every live reservation targets a tick beyond the current one.
    /// Participants waiting for the current tick are woken first, and those
    /// waiting for the new tick are woken right after the increment. Concurrent
    /// callers take turns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the calling thread is interrupted while
    /// waiting for admission. The clock is left unchanged in that case.
    pub fn tick(&self) -> Result<()> {
        let _driver = self.driver.lock();

        self.admit()?;

        let now = {
            let _gate = self.gate.lock();
            self.now.fetch_add(1, Ordering::AcqRel) + 1
        };

        event!(Level::TRACE, tick = now, "clock advanced");

        self.wake_awaiting(now);
        Ok(())
    }

    /// Waits until advancing past the current tick is legal.
    fn admit(&self) -> Result<()> {
        let driver = Waiter::current();

        loop {
            let gate = self.gate.lock();
            let now = self.now();

            self.wake_awaiting(now);

            gate.declare_intent();
            if self.registry.minimum_target() > now {
                gate.withdraw();
                return Ok(());
            }

            gate.release_parked(&driver);
            driver.park();

            if driver.take_interrupt() {
                self.gate.lock().withdraw();
                event!(Level::DEBUG, tick = now, "tick cancelled while waiting for admission");
                return Err(Error::Cancelled);
            }
        }
    }

    fn wake_awaiting(&self, tick: u64) {
        for owner in self.registry.awaiting_at(tick) {
            event!(Level::TRACE, tick = tick, "waking participant");
            owner.wake();
        }
    }

    pub(crate) fn insert(&self, record: Record) {
        self.registry.insert(record);
    }

    pub(crate) fn remove(&self, record: &Record) {
        self.registry.remove(record);
    }

    /// Signals a driver parked in admission that the registry changed.
    ///
    /// Only pays for the gate lock when a driver has declared intent and the
    /// smallest reservation has moved past the current tick.
    pub(crate) fn notify(&self) {
        if self.now() < self.registry.minimum_target() {
            self.gate.notify();
        }
    }

    /// Unconditional variant of [`notify`][Self::notify], for removals.
    pub(crate) fn notify_removed(&self) {
        self.gate.notify();
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticker")
            .field("now", &self.now())
            .field("live_reservations", &self.live_reservations())
            .finish_non_exhaustive()
    }
}
