// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Interrupting threads blocked in `tick()` and `wait()`.

use std::sync::mpsc;
use std::thread;

use lockstep::{Error, Interrupt, Ticker};
use testing_aids::{Latch, execute_or_abandon, still_blocked};

#[test]
fn interrupt_cancels_parked_tick() {
    execute_or_abandon(|| {
        let ticker = Ticker::new();
        let reserved = Latch::new(1);
        let release = Latch::new(1);

        thread::scope(|s| {
            let ticker = &ticker;
            s.spawn(|| {
                let mut participant = ticker.participant();
                participant.reserve(2).unwrap();
                reserved.count_down();
                release.wait();
            });

            reserved.wait();

            let (handle_tx, handle_rx) = mpsc::channel();
            let driver = s.spawn(move || {
                handle_tx.send(Interrupt::current()).unwrap();
                (0..3).try_for_each(|_| ticker.tick())
            });

            let interrupt = handle_rx.recv().unwrap();
            assert!(still_blocked(&driver));

            interrupt.interrupt();
            assert_eq!(driver.join().unwrap(), Err(Error::Cancelled));
            assert_eq!(ticker.now(), 2);

            release.count_down();
        });

        // The reservation is gone and the failed tick left nothing behind.
        assert_eq!(ticker.live_reservations(), 0);
        ticker.tick().unwrap();
        assert_eq!(ticker.now(), 3);
    })
    .expect("interrupted tick did not return");
}

#[test]
fn tick_on_own_reservation_is_cancellable() {
    execute_or_abandon(|| {
        let ticker = Ticker::new();

        thread::scope(|s| {
            let ticker = &ticker;
            let (handle_tx, handle_rx) = mpsc::channel();
            let driver = s.spawn(move || {
                let mut participant = ticker.participant();
                participant.reserve(0).unwrap();
                handle_tx.send(Interrupt::current()).unwrap();

                let result = ticker.tick();
                assert!(!Interrupt::current().is_pending(), "the interrupt was not consumed");
                result
            });

            let interrupt = handle_rx.recv().unwrap();
            assert!(still_blocked(&driver));

            interrupt.interrupt();
            assert_eq!(driver.join().unwrap(), Err(Error::Cancelled));
        });

        assert_eq!(ticker.now(), 0);
        assert_eq!(ticker.live_reservations(), 0);
    })
    .expect("interrupted tick did not return");
}

#[test]
fn driver_recovers_after_cancelled_tick() {
    execute_or_abandon(|| {
        let ticker = Ticker::new();
        let mut participant = ticker.participant();
        participant.reserve(0).unwrap();

        Interrupt::current().interrupt();
        assert_eq!(ticker.tick(), Err(Error::Cancelled));

        participant.reserve(1).unwrap();
        ticker.tick().unwrap();
        assert_eq!(ticker.now(), 1);
    })
    .expect("tick after cancellation blocked");
}

#[test]
fn interrupt_cancels_parked_wait() {
    execute_or_abandon(|| {
        let ticker = Ticker::new();

        thread::scope(|s| {
            let ticker = &ticker;
            let (handle_tx, handle_rx) = mpsc::channel();
            let waiter = s.spawn(move || {
                let mut participant = ticker.participant();
                participant.reserve(1).unwrap();
                handle_tx.send(Interrupt::current()).unwrap();

                let result = participant.wait();

                // Both the reservation and the awaiting marker stay until relax.
                assert_eq!(ticker.live_reservations(), 2);
                participant.relax();
                assert_eq!(ticker.live_reservations(), 0);
                result
            });

            let interrupt = handle_rx.recv().unwrap();
            assert!(still_blocked(&waiter));

            interrupt.interrupt();
            assert_eq!(waiter.join().unwrap(), Err(Error::Cancelled));
        });

        ticker.tick().unwrap();
        ticker.tick().unwrap();
        assert_eq!(ticker.now(), 2);
    })
    .expect("interrupted wait did not return");
}

#[test]
fn cancelled_wait_holds_clock_until_dropped() {
    execute_or_abandon(|| {
        let ticker = Ticker::new();
        let cancelled = Latch::new(1);
        let release = Latch::new(1);

        thread::scope(|s| {
            let ticker = &ticker;
            s.spawn(|| {
                let mut participant = ticker.participant();
                participant.reserve(1).unwrap();

                Interrupt::current().interrupt();
                assert_eq!(participant.reserve_and_wait(0), Err(Error::Cancelled));
                cancelled.count_down();
                release.wait();
            });

            cancelled.wait();
            ticker.tick().unwrap();

            let driver = s.spawn(|| ticker.tick());
            assert!(still_blocked(&driver), "tick passed a cancelled participant's reservation");

            release.count_down();
            driver.join().unwrap().unwrap();
        });

        assert_eq!(ticker.now(), 2);
    })
    .expect("clock stayed stalled after the participant left");
}
