// Copyright (c) 2024 Mike Tsao

use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Samples per second of the incoming audio.
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[derivative(Default)]
pub struct SampleRate(#[derivative(Default(value = "44100"))] pub u32);
#[allow(missing_docs)]
impl SampleRate {
    pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
    pub const DEFAULT: SampleRate = SampleRate::new(Self::DEFAULT_SAMPLE_RATE);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// The rate at which the output hardware consumes pulses when each audio
    /// sample is expanded `factor` times.
    pub fn oversampled(&self, factor: u8) -> TickRate {
        TickRate(self.0 as u64 * factor as u64)
    }

    /// How long `samples` samples last at this rate.
    pub fn duration_of(&self, samples: u64) -> Duration {
        if self.0 == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(samples as f64 / self.0 as f64)
        }
    }
}
impl From<u32> for SampleRate {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}
impl From<SampleRate> for f64 {
    fn from(value: SampleRate) -> Self {
        value.0 as f64
    }
}
impl From<SampleRate> for u32 {
    fn from(value: SampleRate) -> Self {
        value.0
    }
}

/// Pulses per second consumed by the output hardware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TickRate(pub u64);
impl From<TickRate> for f64 {
    fn from(value: TickRate) -> Self {
        value.0 as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversampled_rate() {
        assert_eq!(SampleRate::DEFAULT.oversampled(8), TickRate(352_800));
        assert_eq!(SampleRate::new(48000).oversampled(1), TickRate(48000));
    }

    #[test]
    fn durations() {
        assert_eq!(
            SampleRate::new(1000).duration_of(2500),
            Duration::from_millis(2500)
        );
        assert_eq!(SampleRate::new(0).duration_of(100), Duration::ZERO);
    }
}
