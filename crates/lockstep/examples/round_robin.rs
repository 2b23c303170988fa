// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Workers taking turns in a fixed order, one worker per tick.
//!
//! Each worker reserves its offset within the round, then repeatedly waits for its
//! tick, does its share of work and reserves the same tick of the next round. The
//! main thread drives the clock and never needs to know which worker runs when.

use std::sync::Barrier;
use std::thread;

use lockstep::Ticker;
use tracing::{Level, info};

const WORKERS: i64 = 4;
const ROUNDS: usize = 3;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).with_thread_names(true).init();

    let ticker = Ticker::new();
    let reserved = Barrier::new(WORKERS.unsigned_abs() as usize + 1);

    thread::scope(|s| -> anyhow::Result<()> {
        let workers: Vec<_> = (0..WORKERS)
            .map(|id| {
                let (ticker, reserved) = (&ticker, &reserved);
                thread::Builder::new().name(format!("worker-{id}")).spawn_scoped(s, move || -> lockstep::Result<()> {
                    let mut participant = ticker.participant();
                    participant.reserve(id)?;
                    reserved.wait();

                    for round in 0..ROUNDS {
                        participant.wait()?;
                        info!(round = round, tick = ticker.now(), "my turn");
                        participant.reserve(WORKERS)?;
                    }

                    Ok(())
                })
            })
            .collect::<Result<_, _>>()?;

        reserved.wait();
        for _ in 0..WORKERS.unsigned_abs() as usize * ROUNDS {
            ticker.tick()?;
        }

        for worker in workers {
            worker.join().map_err(|_panic| anyhow::anyhow!("worker panicked"))??;
        }

        Ok(())
    })?;

    info!(tick = ticker.now(), "all rounds done");
    Ok(())
}
