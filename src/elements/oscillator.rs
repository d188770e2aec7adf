// Copyright (c) 2024 Mike Tsao

use crate::{types::prelude::*, util::Configuration};
use std::sync::Arc;

/// A direct digital synthesis carrier. The top 12 bits of a 32-bit phase
/// accumulator index a 4096-entry table of unsigned 12-bit sine amplitudes.
#[derive(Clone, Debug)]
pub struct CarrierOscillator {
    table: Arc<[u16; Self::TABLE_SIZE]>,
    phase: u32,
    phase_increment: u32,
}
impl CarrierOscillator {
    /// Entries in the waveform table.
    pub const TABLE_SIZE: usize = 4096;
    const INDEX_SHIFT: u32 = 20;
    const INDEX_MASK: u32 = (Self::TABLE_SIZE as u32) - 1;

    /// Builds the oscillator described by the configuration, with the phase
    /// at zero.
    pub fn new(configuration: &Configuration) -> Self {
        Self::with_increment(Self::calculate_phase_increment(
            configuration.carrier_frequency(),
            configuration.tick_rate(),
        ))
    }

    /// Builds an oscillator that advances by exactly `phase_increment` per
    /// tick.
    pub fn with_increment(phase_increment: u32) -> Self {
        Self {
            table: Arc::new(Self::build_table()),
            phase: 0,
            phase_increment,
        }
    }

    /// `carrier * table_size * 2^32 / tick_rate`, reduced modulo 2^32.
    pub fn calculate_phase_increment(carrier_frequency: u32, tick_rate: TickRate) -> u32 {
        if tick_rate.0 == 0 {
            return 0;
        }
        let numerator = ((carrier_frequency as u128) * (Self::TABLE_SIZE as u128)) << 32;
        (numerator / tick_rate.0 as u128) as u32
    }

    fn build_table() -> [u16; Self::TABLE_SIZE] {
        let half_range = (Amplitude::LEVELS - 1) as f64 / 2.0;
        let mut table = [0u16; Self::TABLE_SIZE];
        for (i, entry) in table.iter_mut().enumerate() {
            let angle = 2.0 * core::f64::consts::PI * i as f64 / Self::TABLE_SIZE as f64;
            *entry = ((angle.sin() + 1.0) * half_range)
                .round()
                .clamp(0.0, Amplitude::FULL_SCALE as f64) as u16;
        }
        table
    }

    /// Returns the table entry at the current phase, then advances the phase.
    pub fn next_base_amplitude(&mut self) -> Amplitude {
        let amplitude = self.table_lookup();
        self.advance();
        amplitude
    }

    /// The table entry at the current phase.
    pub fn table_lookup(&self) -> Amplitude {
        Amplitude(self.table[self.table_index()])
    }

    /// Moves the phase forward by one tick.
    pub fn advance(&mut self) {
        self.phase = self.phase.wrapping_add(self.phase_increment);
    }

    #[allow(missing_docs)]
    pub fn table_index(&self) -> usize {
        ((self.phase >> Self::INDEX_SHIFT) & Self::INDEX_MASK) as usize
    }

    /// Whether the phase is in the upper half of the cycle.
    pub fn phase_is_high(&self) -> bool {
        self.phase & 0x8000_0000 != 0
    }

    #[allow(missing_docs)]
    pub fn phase(&self) -> u32 {
        self.phase
    }

    #[allow(missing_docs)]
    pub fn phase_increment(&self) -> u32 {
        self.phase_increment
    }

    /// The waveform table.
    pub fn table(&self) -> &[u16] {
        self.table.as_slice()
    }
}
