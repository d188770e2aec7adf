// Copyright (c) 2024 Mike Tsao

//! Common data types used throughout the system.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{Amplitude, AudioSample, FrequencyHz, PulsePair, SampleRate, TickRate};
}

pub use {
    channels::CrossbeamChannel,
    numbers::{Amplitude, AudioSample, FrequencyHz, PulsePair},
    time::{SampleRate, TickRate},
};

mod channels;
mod numbers;
mod time;
