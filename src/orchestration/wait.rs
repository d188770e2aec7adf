// Copyright (c) 2024 Mike Tsao

use crate::util::Configuration;
use std::time::Duration;

/// How a context waits for something another context will do: a bounded
/// number of busy spins, then short sleeps.
#[derive(Clone, Debug)]
pub struct PollWaiter {
    spin_limit: u32,
    poll_interval: Duration,
    spins: u32,
    polls: u64,
}
impl PollWaiter {
    /// Uses the configured spin bound and poll interval.
    pub fn new(configuration: &Configuration) -> Self {
        Self::with_limits(configuration.spin_limit(), configuration.poll_interval())
    }

    #[allow(missing_docs)]
    pub fn with_limits(spin_limit: u32, poll_interval: Duration) -> Self {
        Self {
            spin_limit,
            poll_interval,
            spins: 0,
            polls: 0,
        }
    }

    /// Waits once. Spins while the spin budget lasts, then sleeps.
    pub fn wait(&mut self) {
        if self.spins < self.spin_limit {
            self.spins += 1;
            std::hint::spin_loop();
        } else if self.poll_interval.is_zero() {
            std::thread::yield_now();
        } else {
            std::thread::sleep(self.poll_interval);
        }
        self.polls += 1;
    }

    /// Call after the awaited condition came true.
    pub fn reset(&mut self) {
        self.spins = 0;
        self.polls = 0;
    }

    /// Waits since the last reset.
    pub fn polls(&self) -> u64 {
        self.polls
    }
}
