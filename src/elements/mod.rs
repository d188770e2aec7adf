// Copyright (c) 2024 Mike Tsao

//! Building blocks for other parts of the system, especially the carrier.

/// The most commonly used imports.
pub mod prelude {
    pub use super::oscillator::CarrierOscillator;
}

pub use oscillator::CarrierOscillator;

mod oscillator;
