// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{Level, event};

use crate::interrupt::Waiter;
use crate::record::Record;
use crate::{Error, Result, Ticker};

/// The handle through which one thread takes part in a [`Ticker`].
///
/// A participant moves through these states:
///
/// 1. **Unregistered** when created. It does not hold the clock back.
/// 2. **Reserved** after [`reserve`][Self::reserve]. The clock cannot advance
///    past the reserved tick until the participant reserves further or relaxes.
/// 3. **Awaiting** while blocked in [`wait`][Self::wait]. Returns to
///    *reserved* at the same tick once the clock reaches it.
/// 4. **Relaxed** after [`relax`][Self::relax] or when dropped. Terminal.
///
/// Dropping a participant relaxes it, so a thread that leaves through an error
/// or a panic never leaves a reservation behind that would stall the clock.
///
/// The handle is bound to the thread that created it and cannot be sent to
/// another thread.
///
/// # Examples
///
/// Threads taking turns, one per tick:
///
/// ```
/// use std::sync::{Barrier, Mutex};
/// use std::thread;
///
/// use lockstep::Ticker;
///
/// const THREADS: i64 = 3;
/// const ROUNDS: usize = 4;
///
/// let ticker = Ticker::new();
/// let order = Mutex::new(Vec::new());
/// let reserved = Barrier::new(THREADS as usize + 1);
///
/// thread::scope(|s| {
///     for id in 0..THREADS {
///         let (ticker, order, reserved) = (&ticker, &order, &reserved);
///         s.spawn(move || {
///             let mut participant = ticker.participant();
///             participant.reserve(id).unwrap();
///             reserved.wait();
///
///             for _ in 0..ROUNDS {
///                 participant.wait().unwrap();
///                 order.lock().unwrap().push(id);
///                 participant.reserve(THREADS).unwrap();
///             }
///         });
///     }
///
///     reserved.wait();
///     for _ in 0..THREADS as usize * ROUNDS {
///         ticker.tick().unwrap();
///     }
/// });
///
/// assert_eq!(order.into_inner().unwrap(), [0_i64, 1, 2].repeat(ROUNDS));
/// ```
#[derive(Debug)]
pub struct Participant<'a> {
    ticker: &'a Ticker,
    waiter: Arc<Waiter>,
    current: Option<Record>,
    // Left behind by a cancelled `wait()` until the participant relaxes.
    marker: Option<Record>,
    _not_send: PhantomData<*const ()>,
}

impl<'a> Participant<'a> {
    pub(crate) fn new(ticker: &'a Ticker) -> Self {
        Self {
            ticker,
            waiter: Waiter::current(),
            current: None,
            marker: None,
            _not_send: PhantomData,
        }
    }

    /// The tick this participant has reserved, or `None` while unregistered.
    #[must_use]
    pub fn target(&self) -> Option<u64> {
        self.current.as_ref().map(Record::target)
    }

    /// Reserves `ticks` more ticks during which the clock may advance without
    /// waiting for this participant.
    ///
    /// The new target is `ticks` past the later of the current tick and the
    /// previously reserved tick. The new reservation replaces the previous one.
    /// Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `ticks` is negative. Nothing is
    /// changed in that case.
    pub fn reserve(&mut self, ticks: i64) -> Result<()> {
        let ticks = validate(ticks)?;
        self.register(ticks);
        Ok(())
    }

    /// Blocks until the clock reaches the reserved tick.
    ///
    /// An unregistered participant first reserves the current tick, which makes
    /// the call return immediately. After a successful wait, everything other
    /// participants did before reserving a tick no later than this one is
    /// visible to the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the calling thread is interrupted through
    /// an [`Interrupt`][crate::Interrupt] while blocked. The participant keeps
    /// holding the clock back until it is relaxed or dropped.
    pub fn wait(&mut self) -> Result<()> {
        let reservation = match &self.current {
            Some(record) => record.clone(),
            None => self.register(0),
        };

        if let Some(stale) = self.marker.take() {
            self.ticker.remove(&stale);
        }

        let marker = reservation.to_awaiting();
        self.ticker.insert(marker.clone());
        self.marker = Some(marker);

        let target = reservation.target();
        while self.ticker.now() < target {
            self.waiter.park();

            if self.waiter.take_interrupt() {
                event!(Level::DEBUG, target = target, "wait cancelled");
                return Err(Error::Cancelled);
            }
        }

        if let Some(marker) = self.marker.take() {
            self.ticker.remove(&marker);
        }
        self.ticker.notify();

        Ok(())
    }

    /// Waits for the reserved tick, then reserves `ticks` more.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `ticks` is negative, before waiting.
    /// Returns [`Error::Cancelled`] if the wait is interrupted, in which case
    /// nothing new is reserved.
    pub fn wait_and_reserve(&mut self, ticks: i64) -> Result<()> {
        let ticks = validate(ticks)?;
        self.wait()?;
        self.register(ticks);
        Ok(())
    }

    /// Reserves `ticks` more, then waits for the newly reserved tick.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `ticks` is negative, before
    /// reserving. Returns [`Error::Cancelled`] if the wait is interrupted.
    pub fn reserve_and_wait(&mut self, ticks: i64) -> Result<()> {
        let ticks = validate(ticks)?;
        self.register(ticks);
        self.wait()
    }

    /// Withdraws this participant, letting the clock advance freely past its
    /// reservation.
    ///
    /// Equivalent to dropping the participant.
    pub fn relax(mut self) {
        self.release();
    }

    fn register(&mut self, ticks: u64) -> Record {
        let base = self.target().map_or(self.ticker.now(), |target| target.max(self.ticker.now()));
        let record = Record::reservation(base.saturating_add(ticks), Arc::clone(&self.waiter));

        // The replacement goes in before the previous record leaves, so the
        // participant never stops holding the clock back in between.
        self.ticker.insert(record.clone());
        if let Some(previous) = self.current.replace(record.clone()) {
            self.ticker.remove(&previous);
        }

        self.ticker.notify();
        record
    }

    fn release(&mut self) {
        for record in [self.current.take(), self.marker.take()].into_iter().flatten() {
            self.ticker.remove(&record);
        }

        self.ticker.notify_removed();
    }
}

impl Drop for Participant<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

fn validate(ticks: i64) -> Result<u64> {
    if ticks < 0 {
        event!(Level::DEBUG, ticks = ticks, "rejected negative tick budget");
        return Err(Error::InvalidArgument { ticks });
    }

    Ok(ticks.unsigned_abs())
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interrupt;

    #[test]
    fn assert_types() {
        static_assertions::assert_not_impl_any!(Participant<'static>: Send, Sync);
    }

    #[test]
    fn starts_unregistered() {
        let ticker = Ticker::new();
        let participant = ticker.participant();

        assert_eq!(participant.target(), None);
        assert_eq!(ticker.live_reservations(), 0);
    }

    #[test]
    fn reserve_adds_to_current_tick() {
        let ticker = Ticker::starting_at(10);
        let mut participant = ticker.participant();

        participant.reserve(3).unwrap();

        assert_eq!(participant.target(), Some(13));
        assert_eq!(ticker.live_reservations(), 1);
    }

    #[test]
    fn reserve_accumulates_on_previous_target() {
        let ticker = Ticker::new();
        let mut participant = ticker.participant();

        participant.reserve(2).unwrap();
        participant.reserve(5).unwrap();

        assert_eq!(participant.target(), Some(7));
        assert_eq!(ticker.live_reservations(), 1);
    }

    #[test]
    fn reserve_follows_clock_in_lockstep() {
        let ticker = Ticker::new();
        let mut participant = ticker.participant();
        participant.reserve(1).unwrap();

        ticker.tick().unwrap();
        participant.reserve(1).unwrap();
        ticker.tick().unwrap();
        participant.reserve(0).unwrap();

        assert_eq!(ticker.now(), 2);
        assert_eq!(participant.target(), Some(2));
    }

    #[test]
    fn reserve_zero_replaces_previous_record() {
        let ticker = Ticker::new();
        let mut participant = ticker.participant();

        for _ in 0..5 {
            participant.reserve(0).unwrap();
        }

        assert_eq!(ticker.live_reservations(), 1);

        participant.relax();
        ticker.tick().unwrap();
        assert_eq!(ticker.now(), 1);
    }

    #[test]
    fn negative_budget_is_rejected_without_changes() {
        let ticker = Ticker::new();
        let mut participant = ticker.participant();
        participant.reserve(4).unwrap();

        assert_eq!(participant.reserve(-1), Err(Error::InvalidArgument { ticks: -1 }));
        assert_eq!(participant.reserve_and_wait(-1), Err(Error::InvalidArgument { ticks: -1 }));
        assert_eq!(participant.wait_and_reserve(-2), Err(Error::InvalidArgument { ticks: -2 }));

        assert_eq!(participant.target(), Some(4));
        assert_eq!(ticker.live_reservations(), 1);
    }

    #[test]
    fn wait_registers_unregistered_participant() {
        let ticker = Ticker::starting_at(5);
        let mut participant = ticker.participant();

        participant.wait().unwrap();

        assert_eq!(participant.target(), Some(5));
        assert_eq!(ticker.live_reservations(), 1);
    }

    #[test]
    fn wait_returns_immediately_when_target_reached() {
        let ticker = Ticker::new();
        let mut participant = ticker.participant();

        participant.reserve_and_wait(0).unwrap();
        participant.wait_and_reserve(2).unwrap();

        assert_eq!(participant.target(), Some(2));
        assert_eq!(ticker.live_reservations(), 1);
    }

    #[test]
    fn cancelled_wait_keeps_marker_until_relax() {
        let ticker = Ticker::new();
        let mut participant = ticker.participant();
        participant.reserve(1).unwrap();

        Interrupt::current().interrupt();

        assert_eq!(participant.wait(), Err(Error::Cancelled));
        assert_eq!(ticker.live_reservations(), 2);
        assert!(!Interrupt::current().is_pending());

        participant.relax();
        assert_eq!(ticker.live_reservations(), 0);
    }

    #[test]
    fn retried_wait_replaces_stale_marker() {
        let ticker = Ticker::new();
        let mut participant = ticker.participant();
        participant.reserve(1).unwrap();

        Interrupt::current().interrupt();
        assert_eq!(participant.wait(), Err(Error::Cancelled));

        ticker.tick().unwrap();
        participant.wait().unwrap();

        assert_eq!(ticker.live_reservations(), 1);
    }

    #[test]
    fn drop_relaxes() {
        let ticker = Ticker::new();

        {
            let mut participant = ticker.participant();
            participant.reserve(0).unwrap();
            assert_eq!(ticker.live_reservations(), 1);
        }

        assert_eq!(ticker.live_reservations(), 0);
        ticker.tick().unwrap();
    }

    #[test]
    fn participants_of_one_thread_are_independent() {
        let ticker = Ticker::new();
        let mut first = ticker.participant();
        let mut second = ticker.participant();

        first.reserve(1).unwrap();
        second.reserve(3).unwrap();
        ticker.tick().unwrap();

        first.relax();
        ticker.tick().unwrap();
        ticker.tick().unwrap();

        assert_eq!(ticker.now(), 3);
        assert_eq!(second.target(), Some(3));
    }
}
