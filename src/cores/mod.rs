// Copyright (c) 2024 Mike Tsao

//! The signal path: filter design and application, modulation encoding, and
//! pulse timing. Cores know nothing about threads or buffers, so each can be
//! exercised one sample at a time.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        encoder::{ModulationEncoder, SignalEncoder},
        filter::FilterBank,
        timing::PulseTiming,
    };
}

pub use {
    encoder::{
        modulated, predistort, ModulationEncoder, SignalEncoder, MAX_ENVELOPE, MIN_ENVELOPE,
    },
    filter::{Biquad, BiquadCoefficients, FilterBank, FirFilter},
    timing::PulseTiming,
};

mod encoder;
mod filter;
mod timing;
