// Copyright (c) 2024 Mike Tsao

//! Numeric types used throughout the system.

use core::fmt::Display;
use serde::{Deserialize, Serialize};

/// A single signed 16-bit PCM audio sample, as it arrives from the source.
pub type AudioSample = i16;

/// An unsigned carrier amplitude in the 12-bit range `0..=Amplitude::FULL_SCALE`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amplitude(pub u16);
impl Amplitude {
    /// Number of distinct amplitude levels (12 bits).
    pub const LEVELS: u32 = 4096;
    /// The largest representable amplitude.
    pub const FULL_SCALE: u32 = Self::LEVELS - 1;
    /// The decision threshold of the one-bit quantizer.
    pub const HALF_SCALE: u32 = Self::LEVELS / 2;

    /// The loudest amplitude.
    pub const MAX: Amplitude = Amplitude(Self::FULL_SCALE as u16);
    /// Carrier off.
    pub const ZERO: Amplitude = Amplitude(0);

    /// Rounds and clamps a floating-point amplitude into range. Negative and
    /// NaN inputs become zero.
    pub fn from_f64_clamped(value: f64) -> Self {
        if value.is_nan() || value <= 0.0 {
            Self::ZERO
        } else {
            Self(value.round().min(Self::FULL_SCALE as f64) as u16)
        }
    }

    /// Clamps a signed integer amplitude into range.
    pub fn from_i64_clamped(value: i64) -> Self {
        Self(value.clamp(0, Self::FULL_SCALE as i64) as u16)
    }

    /// The amplitude mapped to `0.0..=1.0`.
    pub fn normalized(&self) -> f64 {
        self.0 as f64 / Self::FULL_SCALE as f64
    }
}
impl From<Amplitude> for u32 {
    fn from(value: Amplitude) -> Self {
        value.0 as u32
    }
}
impl Display for Amplitude {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hertz.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct FrequencyHz(pub f64);
impl From<u32> for FrequencyHz {
    fn from(value: u32) -> Self {
        Self(value as f64)
    }
}
impl Display for FrequencyHz {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.0 >= 1000.0 {
            write!(f, "{:.1} kHz", self.0 / 1000.0)
        } else {
            write!(f, "{:.1} Hz", self.0)
        }
    }
}

/// One duty-cycle pulse as replayed by the output hardware: `high` ticks with
/// the line asserted, then `low` ticks with it released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PulsePair {
    /// Ticks spent high.
    pub high: u16,
    /// Ticks spent low.
    pub low: u16,
}
impl PulsePair {
    /// Creates a new [PulsePair].
    pub const fn new(high: u16, low: u16) -> Self {
        Self { high, low }
    }

    /// Packs the pair into the hardware word: `high` in the upper 16 bits,
    /// `low` in the lower 16 bits.
    pub const fn to_word(self) -> u32 {
        ((self.high as u32) << 16) | self.low as u32
    }

    /// Unpacks a hardware word.
    pub const fn from_word(word: u32) -> Self {
        Self {
            high: (word >> 16) as u16,
            low: (word & 0xFFFF) as u16,
        }
    }

    /// Total length of the pulse in ticks.
    pub fn period(&self) -> u32 {
        self.high as u32 + self.low as u32
    }
}
impl From<PulsePair> for u32 {
    fn from(value: PulsePair) -> Self {
        value.to_word()
    }
}
