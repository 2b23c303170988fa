// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};

thread_local! {
    static CURRENT: Arc<Waiter> = Arc::new(Waiter::new(thread::current()));
}

/// The wake target of one OS thread.
///
/// Reservation records point at the waiter of their owning thread so that the
/// clock driver can wake exactly that thread. A waiter holds nothing but the
/// thread handle and the interruption flag, so a record never keeps any other
/// participant state alive.
#[derive(Debug)]
pub(crate) struct Waiter {
    thread: Thread,
    interrupted: AtomicBool,
}

impl Waiter {
    fn new(thread: Thread) -> Self {
        Self {
            thread,
            interrupted: AtomicBool::new(false),
        }
    }

    /// Returns the waiter of the calling thread.
    pub(crate) fn current() -> Arc<Self> {
        CURRENT.with(Arc::clone)
    }

    /// Directed wake of the owning thread.
    ///
    /// If the thread is not parked right now, its next park returns immediately.
    pub(crate) fn wake(&self) {
        self.thread.unpark();
    }

    /// Blocks the calling thread until it is woken.
    ///
    /// Must only be called on the owning thread. May return spuriously, callers
    /// re-check their condition in a loop.
    pub(crate) fn park(&self) {
        debug_assert_eq!(thread::current().id(), self.thread.id(), "parked a foreign waiter");
        thread::park();
    }

    fn interrupt(&self) {
        // The flag must be visible before the wake so the woken thread observes it.
        self.interrupted.store(true, Ordering::Release);
        self.wake();
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    /// Consumes a pending interruption, returning whether there was one.
    pub(crate) fn take_interrupt(&self) -> bool {
        self.interrupted.swap(false, Ordering::AcqRel)
    }
}

/// Cancels blocking ticker operations on a specific thread.
///
/// Obtain the handle on the thread that should become cancellable via
/// [`Interrupt::current`] and hand it to whichever thread decides to cancel.
/// Calling [`interrupt`][Self::interrupt] makes a [`Participant::wait`] or
/// [`Ticker::tick`] that is blocked on that thread fail promptly with
/// [`Error::Cancelled`]. If the thread is not blocked at that moment, the
/// interruption stays pending and is delivered at its next block.
///
/// # Examples
///
/// ```
/// use std::thread;
///
/// use lockstep::{Error, Interrupt, Ticker};
///
/// let ticker = Ticker::new();
///
/// thread::scope(|s| {
///     let ticker = &ticker;
///     let (tx, rx) = std::sync::mpsc::channel();
///
///     let driver = s.spawn(move || {
///         let mut participant = ticker.participant();
///         participant.reserve(0).unwrap();
///         tx.send(Interrupt::current()).unwrap();
///
///         // Our own reservation holds the clock at tick 0, so this blocks.
///         ticker.tick()
///     });
///
///     rx.recv().unwrap().interrupt();
///     assert_eq!(driver.join().unwrap(), Err(Error::Cancelled));
/// });
/// ```
///
/// [`Participant::wait`]: crate::Participant::wait
/// [`Ticker::tick`]: crate::Ticker::tick
/// [`Error::Cancelled`]: crate::Error::Cancelled
#[derive(Debug, Clone)]
pub struct Interrupt {
    waiter: Arc<Waiter>,
}

impl Interrupt {
    /// Returns an interrupt handle for the calling thread.
    #[must_use]
    pub fn current() -> Self {
        Self { waiter: Waiter::current() }
    }

    /// Interrupts the thread this handle was obtained on.
    pub fn interrupt(&self) {
        self.waiter.interrupt();
    }

    /// Returns `true` if an interruption was raised and not yet delivered.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.waiter.is_interrupted()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(Interrupt: Send, Sync, Clone);
    }

    #[test]
    fn current_is_per_thread() {
        let here = Waiter::current();
        assert!(Arc::ptr_eq(&here, &Waiter::current()));

        let there = thread::spawn(Waiter::current).join().unwrap();
        assert!(!Arc::ptr_eq(&here, &there));
    }

    #[test]
    fn interrupt_is_consumed_once() {
        let interrupt = Interrupt::current();
        let waiter = Waiter::current();

        interrupt.interrupt();
        assert!(interrupt.is_pending());

        // The wake token from the interrupt lets this return immediately.
        waiter.park();

        assert!(waiter.take_interrupt());
        assert!(!waiter.take_interrupt());
        assert!(!interrupt.is_pending());
    }

    #[test]
    fn interrupt_from_other_thread() {
        let interrupt = Interrupt::current();
        let waiter = Waiter::current();

        thread::spawn(move || interrupt.interrupt()).join().unwrap();

        while !waiter.take_interrupt() {
            waiter.park();
        }
    }
}
