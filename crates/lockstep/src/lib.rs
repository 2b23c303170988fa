// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A shared logical clock whose advancement is gated by per-thread reservations.
//!
//! Threads declare, through a reservation, the next tick at which they intend to be
//! ready. The clock only advances past its current tick once every live reservation
//! lies beyond it, and threads can block until the clock reaches the tick they reserved.
//! This gives deterministic round-based coordination between many threads ("everyone
//! finishes round k before anyone starts round k+1") without a central scheduler that
//! needs to know who takes part.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Barrier;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::thread;
//!
//! use lockstep::Ticker;
//!
//! let ticker = Ticker::new();
//! let reserved = Barrier::new(3);
//! let total = AtomicU64::new(0);
//!
//! thread::scope(|s| {
//!     for first_tick in 1..=2 {
//!         let (ticker, reserved, total) = (&ticker, &reserved, &total);
//!         s.spawn(move || {
//!             let mut participant = ticker.participant();
//!             participant.reserve(first_tick).unwrap();
//!             reserved.wait();
//!
//!             participant.wait().unwrap();
//!             total.fetch_add(1, Ordering::Relaxed);
//!         });
//!     }
//!
//!     reserved.wait();
//!     ticker.tick().unwrap();
//!     ticker.tick().unwrap();
//! });
//!
//! assert_eq!(total.load(Ordering::Relaxed), 2);
//! ```
//!
//! # Overview
//!
//! - [`Ticker`] - The clock. [`Ticker::tick`] advances it by one tick once that is
//!   legal, [`Ticker::now`] reads it without blocking.
//! - [`Participant`] - A thread's handle for reserving ticks and waiting for them.
//!   Relaxes itself when dropped.
//! - [`Interrupt`] - Cancels a blocked [`Participant::wait`] or [`Ticker::tick`] on
//!   a specific thread.
//! - [`Error`] - Invalid tick budgets and cancellations.
//!
//! # Ordering
//!
//! If one participant reserves a tick no later than the tick another participant waits
//! for, everything the first thread did before reserving is visible to the second once
//! its wait returns. Both the registry update and the clock increment go through the
//! same synchronized gate, which is what provides this happens-before edge.
//!
//! # Liveness
//!
//! Nothing here times out. The clock only advances while participants keep reserving
//! further ticks or relax, so every participant must eventually do one of the two. Since
//! dropping a [`Participant`] relaxes it, this holds on error and panic paths as well.

mod error;
mod gate;
mod interrupt;
mod participant;
mod record;
mod registry;
mod ticker;

pub use error::{Error, Result};
pub use interrupt::Interrupt;
pub use participant::Participant;
pub use ticker::Ticker;
