// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use parking_lot::{Condvar, Mutex};

/// A one-shot countdown: threads block in [`wait`][Self::wait] until
/// [`count_down`][Self::count_down] was called `count` times.
///
/// Unlike `std::sync::Barrier`, the threads counting down do not block and the
/// waiting threads do not have to count down themselves.
#[derive(Debug)]
pub struct Latch {
    remaining: Mutex<usize>,
    reached_zero: Condvar,
}

impl Latch {
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            reached_zero: Condvar::new(),
        }
    }

    /// Counts down by one. Extra calls past zero are ignored.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        *remaining = remaining.saturating_sub(1);

        if *remaining == 0 {
            self.reached_zero.notify_all();
        }
    }

    /// Blocks until the count reaches zero.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.reached_zero.wait(&mut remaining);
        }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }
}
