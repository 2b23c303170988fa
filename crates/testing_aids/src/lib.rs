// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! An unpublished crate containing testing utilities for use within this repo.

use std::env;
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ScopedJoinHandle};
use std::time::Duration;

mod latch;
mod log;

pub use latch::*;
pub use log::*;

/// If a test scenario does not finish within this time, it is considered deadlocked.
///
/// This is only there to turn a hang into a failure. Scenarios that are expected to
/// block must be unblocked explicitly by the test, never by this timeout.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Short delay used to give another thread the chance to reach a blocking call before
/// the test checks that it is indeed still blocked.
pub const SETTLE_DELAY: Duration = Duration::from_millis(50);

#[must_use]
pub fn is_mutation_testing() -> bool {
    env::var("MUTATION_TESTING").as_deref() == Ok("1")
}

/// Runs `f` on a background thread and gives up on it after [`TEST_TIMEOUT`].
///
/// Returns `None` if `f` timed out or panicked. A timed-out thread is abandoned, it
/// keeps running until the test process exits.
///
/// Under mutation testing `f` runs inline without a timeout, so that a mutation
/// that deadlocks shows up as a timeout of the mutation run itself.
#[must_use]
pub fn execute_or_abandon<F, R>(f: F) -> Option<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if is_mutation_testing() {
        return Some(f());
    }

    let (sender, receiver) = mpsc::channel();

    // If `f` panics the sender is dropped unsent and the receive fails right away.
    spawn_named("abandonable test body", move || {
        // The receiver is gone if we already timed out, nobody cares about the result then.
        _ = sender.send(f());
    });

    receiver.recv_timeout(TEST_TIMEOUT).ok()
}

/// Spawns a thread with a name that shows up in panic messages and logs.
///
/// # Panics
///
/// Panics if the operating system refuses to create the thread.
pub fn spawn_named<F, R>(name: impl Into<String>, f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    thread::Builder::new().name(name.into()).spawn(f).expect("failed to spawn test thread")
}

/// A handle to a thread that may or may not have finished running.
pub trait ThreadHandle {
    fn is_finished(&self) -> bool;
}

impl<T> ThreadHandle for JoinHandle<T> {
    fn is_finished(&self) -> bool {
        Self::is_finished(self)
    }
}

impl<T> ThreadHandle for ScopedJoinHandle<'_, T> {
    fn is_finished(&self) -> bool {
        Self::is_finished(self)
    }
}

/// Returns `true` if the thread behind `handle` is still running after [`SETTLE_DELAY`].
///
/// A `true` result is only meaningful for threads that are expected to block: it
/// shows the thread did not get past its blocking call in a reasonable time.
#[must_use]
pub fn still_blocked(handle: &impl ThreadHandle) -> bool {
    thread::sleep(SETTLE_DELAY);
    !handle.is_finished()
}
