// Copyright (c) 2024 Mike Tsao

use crate::{types::prelude::*, util::Configuration};

/// Converts carrier amplitudes into duty-cycle pulses of a fixed period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseTiming {
    base_period: u16,
}
impl Default for PulseTiming {
    fn default() -> Self {
        Self {
            base_period: Self::DEFAULT_BASE_PERIOD,
        }
    }
}
impl PulseTiming {
    /// Ticks per pulse unless configured otherwise.
    pub const DEFAULT_BASE_PERIOD: u16 = 64;

    /// Uses the configured base period.
    pub fn new(configuration: &Configuration) -> Self {
        Self::with_base_period(configuration.base_period().clamp(2, u16::MAX as u32) as u16)
    }

    /// `base_period` must be at least 2 so that both halves get a tick.
    pub fn with_base_period(base_period: u16) -> Self {
        Self {
            base_period: base_period.max(2),
        }
    }

    /// `high` is proportional to the amplitude, and `high + low` is always the
    /// base period. Neither half is ever shorter than one tick.
    pub fn encode(&self, amplitude: Amplitude) -> PulsePair {
        let period = self.base_period as u32;
        let level = (amplitude.0 as u32).min(Amplitude::FULL_SCALE);
        let high = (level * period / Amplitude::LEVELS).clamp(1, period - 1);
        PulsePair::new(high as u16, (period - high) as u16)
    }

    #[allow(missing_docs)]
    pub fn base_period(&self) -> u16 {
        self.base_period
    }
}
