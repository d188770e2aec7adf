// Copyright (c) 2024 Mike Tsao

use crate::{
    cores::FilterBank,
    elements::CarrierOscillator,
    traits::TransformsSample,
    types::prelude::*,
    util::{Configuration, SignalMode},
};

/// The lowest the carrier envelope is allowed to go.
pub const MIN_ENVELOPE: f64 = 0.1;
/// The highest the carrier envelope is allowed to go.
pub const MAX_ENVELOPE: f64 = 1.9;

/// The carrier envelope for one audio sample: `1 + depth * audio`, with
/// `audio` normalized to -1.0..1.0, clamped to
/// [MIN_ENVELOPE]..=[MAX_ENVELOPE].
pub fn modulated(sample: AudioSample, depth_percent: u8) -> f64 {
    let audio = sample as f64 / 32768.0;
    (1.0 + (depth_percent as f64 / 100.0) * audio).clamp(MIN_ENVELOPE, MAX_ENVELOPE)
}

/// Odd-order polynomial that pre-compensates output stage compression.
pub fn predistort(x: f64) -> f64 {
    x - 0.1 * x.powi(3) + 0.05 * x.powi(5)
}

/// One variant per [SignalMode], carrying whatever state that mode keeps
/// between samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalEncoder {
    #[allow(missing_docs)]
    Simple,
    #[allow(missing_docs)]
    Square,
    #[allow(missing_docs)]
    SigmaDelta {
        /// The running quantization error.
        error: i64,
    },
    #[allow(missing_docs)]
    Sine,
    #[allow(missing_docs)]
    Predistortion,
    #[allow(missing_docs)]
    Oversampled,
}
impl From<SignalMode> for SignalEncoder {
    fn from(value: SignalMode) -> Self {
        match value {
            SignalMode::Simple => SignalEncoder::Simple,
            SignalMode::Square => SignalEncoder::Square,
            SignalMode::SigmaDelta => SignalEncoder::SigmaDelta { error: 0 },
            SignalMode::Sine => SignalEncoder::Sine,
            SignalMode::Predistortion => SignalEncoder::Predistortion,
            SignalMode::Oversampled => SignalEncoder::Oversampled,
        }
    }
}

/// Turns audio samples into carrier amplitudes, one oscillator tick per
/// sample. Owns the oscillator and the filter bank; the session's consumer is
/// its only user.
#[derive(Clone, Debug)]
pub struct ModulationEncoder {
    encoder: SignalEncoder,
    oscillator: CarrierOscillator,
    filter_bank: FilterBank,
    depth_percent: u8,
    predistortion: bool,
}
impl ModulationEncoder {
    /// Builds the oscillator and designs the filter bank described by the
    /// configuration.
    pub fn new(configuration: &Configuration) -> Self {
        Self::with_oscillator(configuration, CarrierOscillator::new(configuration))
    }

    /// Like [ModulationEncoder::new()], but with a caller-supplied
    /// oscillator.
    pub fn with_oscillator(configuration: &Configuration, oscillator: CarrierOscillator) -> Self {
        Self {
            encoder: configuration.signal_mode().into(),
            oscillator,
            filter_bank: FilterBank::design(configuration),
            depth_percent: configuration.modulation_depth(),
            predistortion: configuration.predistortion(),
        }
    }

    /// Encodes one audio sample and advances the oscillator by one tick.
    pub fn encode(&mut self, sample: AudioSample) -> Amplitude {
        let mut envelope = modulated(sample, self.depth_percent);
        if self.predistortion || self.encoder == SignalEncoder::Predistortion {
            envelope = predistort(envelope - 1.0) + 1.0;
        }

        let base = self.oscillator.table_lookup();
        let amplitude = match &mut self.encoder {
            SignalEncoder::Simple | SignalEncoder::Sine | SignalEncoder::Predistortion => {
                Amplitude::from_f64_clamped(base.0 as f64 * envelope)
            }
            SignalEncoder::Square => {
                if self.oscillator.phase_is_high() {
                    Amplitude::from_f64_clamped(Amplitude::FULL_SCALE as f64 * envelope)
                } else {
                    Amplitude::ZERO
                }
            }
            SignalEncoder::SigmaDelta { error } => {
                let corrected = (base.0 as f64 * envelope).round() as i64 + *error;
                let out = if corrected > Amplitude::HALF_SCALE as i64 {
                    Amplitude::FULL_SCALE as i64
                } else {
                    0
                };
                *error = corrected - out;
                Amplitude::from_i64_clamped(out)
            }
            SignalEncoder::Oversampled => {
                let filtered = self
                    .filter_bank
                    .transform_sample(base.normalized() * envelope);
                Amplitude::from_f64_clamped(filtered * Amplitude::FULL_SCALE as f64)
            }
        };
        self.oscillator.advance();

        // Any active bank filters the encoded amplitude here, whatever its
        // design. Only the oversampled encoder filters before encoding.
        if self.encoder != SignalEncoder::Oversampled && self.filter_bank.is_active() {
            let filtered = self.filter_bank.transform_sample(amplitude.normalized());
            Amplitude::from_f64_clamped(filtered * Amplitude::FULL_SCALE as f64)
        } else {
            amplitude
        }
    }

    #[allow(missing_docs)]
    pub fn encoder(&self) -> &SignalEncoder {
        &self.encoder
    }

    #[allow(missing_docs)]
    pub fn oscillator(&self) -> &CarrierOscillator {
        &self.oscillator
    }

    #[allow(missing_docs)]
    pub fn filter_bank(&self) -> &FilterBank {
        &self.filter_bank
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{ConfigurationBuilder, FilterMode};
    use float_cmp::approx_eq;
    use more_asserts::{assert_ge, assert_le};

    fn configuration(signal_mode: SignalMode) -> ConfigurationBuilder {
        let mut builder = ConfigurationBuilder::default();
        builder.signal_mode(signal_mode).modulation_depth(80);
        builder
    }

    fn encoder(builder: &ConfigurationBuilder, phase_increment: u32) -> ModulationEncoder {
        ModulationEncoder::with_oscillator(
            &builder.build().unwrap(),
            CarrierOscillator::with_increment(phase_increment),
        )
    }

    #[test]
    fn envelope_is_bounded() {
        for depth in [0, 1, 50, 80, 99, 100] {
            for sample in (i16::MIN..=i16::MAX).step_by(97).chain([i16::MIN, i16::MAX]) {
                let envelope = modulated(sample, depth);
                assert_ge!(envelope, MIN_ENVELOPE);
                assert_le!(envelope, MAX_ENVELOPE);
            }
        }
        assert_eq!(modulated(i16::MIN, 100), MIN_ENVELOPE);
        assert_eq!(modulated(0, 100), 1.0);
        assert!(approx_eq!(f64, modulated(16384, 80), 1.4, epsilon = 1e-12));
    }

    #[test]
    fn simple_scales_the_table() {
        let mut e = encoder(&configuration(SignalMode::Simple), 1 << 30);
        // Phases 0, 1/4, 1/2, 3/4 of a cycle.
        let out: Vec<u16> = (0..4).map(|_| e.encode(0).0).collect();
        assert_eq!(out, vec![2048, 4095, 2048, 0]);

        let mut e = encoder(&configuration(SignalMode::Simple), 1 << 30);
        let out: Vec<u16> = (0..4).map(|_| e.encode(16384).0).collect();
        // 2048 * 1.4 and 4095 * 1.4 (clamped).
        assert_eq!(out, vec![2867, 4095, 2867, 0]);
    }

    #[test]
    fn sine_matches_simple() {
        let mut simple = encoder(&configuration(SignalMode::Simple), 0x1234_5678);
        let mut sine = encoder(&configuration(SignalMode::Sine), 0x1234_5678);
        for i in 0..10_000 {
            let sample = ((i * 37) % 65536 - 32768) as i16;
            assert_eq!(simple.encode(sample), sine.encode(sample));
        }
    }

    #[test]
    fn square_follows_top_phase_bit() {
        let mut e = encoder(&configuration(SignalMode::Square), 1 << 30);
        let out: Vec<u16> = (0..8).map(|_| e.encode(0).0).collect();
        assert_eq!(out, vec![0, 0, 4095, 4095, 0, 0, 4095, 4095]);

        let mut e = encoder(&configuration(SignalMode::Square), 1 << 31);
        e.encode(i16::MIN);
        // 4095 * (1 - 0.8)
        assert_eq!(e.encode(i16::MIN), Amplitude(819));
    }

    #[test]
    fn sigma_delta_average_converges() {
        let mut e = encoder(&configuration(SignalMode::SigmaDelta), 0x0123_4567);
        let mut target: i64 = 0;
        let mut produced: i64 = 0;
        for _ in 0..100_000 {
            target += e.oscillator().table_lookup().0 as i64;
            let out = e.encode(0);
            assert!(out == Amplitude::ZERO || out == Amplitude::MAX);
            produced += out.0 as i64;
        }
        assert_le!((target - produced).abs(), Amplitude::FULL_SCALE as i64);
        let SignalEncoder::SigmaDelta { error } = e.encoder() else {
            panic!("expected sigma-delta state");
        };
        assert_eq!(*error, target - produced);
    }

    #[test]
    fn predistortion_is_applied_once() {
        assert_eq!(predistort(0.0), 0.0);
        assert!(approx_eq!(f64, predistort(1.0), 0.95, epsilon = 1e-12));

        let mut mode = encoder(&configuration(SignalMode::Predistortion), 0x0765_4321);
        let mut flagged = encoder(
            configuration(SignalMode::Simple).predistortion(true),
            0x0765_4321,
        );
        let mut both = encoder(
            configuration(SignalMode::Predistortion).predistortion(true),
            0x0765_4321,
        );
        let mut plain = encoder(&configuration(SignalMode::Simple), 0x0765_4321);
        let mut differs = false;
        for i in 0..5_000 {
            let sample = ((i * 131) % 65536 - 32768) as i16;
            let expected = mode.encode(sample);
            assert_eq!(flagged.encode(sample), expected);
            assert_eq!(both.encode(sample), expected);
            differs |= plain.encode(sample) != expected;
        }
        assert!(differs);
    }

    #[test]
    fn oversampled_without_filter_matches_simple() {
        let mut simple = encoder(&configuration(SignalMode::Simple), 0x0ABC_DEF0);
        let mut oversampled = encoder(&configuration(SignalMode::Oversampled), 0x0ABC_DEF0);
        for i in 0..10_000 {
            let sample = ((i * 211) % 65536 - 32768) as i16;
            let a = simple.encode(sample).0 as i32;
            let b = oversampled.encode(sample).0 as i32;
            assert_le!((a - b).abs(), 1);
        }
    }

    #[test]
    fn oversampled_filters_exactly_once() {
        let mut builder = configuration(SignalMode::Oversampled);
        builder
            .filter_mode(FilterMode::BandpassFir)
            .filter_order(4);
        let mut e = encoder(&builder, 0x0800_0000);
        let mut bank = FilterBank::design(&builder.build().unwrap());
        let mut oscillator = CarrierOscillator::with_increment(0x0800_0000);
        for _ in 0..500 {
            let base = oscillator.next_base_amplitude();
            let expected = Amplitude::from_f64_clamped(
                bank.transform_sample(base.normalized()) * Amplitude::FULL_SCALE as f64,
            );
            assert_eq!(e.encode(0), expected);
        }
    }

    #[test]
    fn other_modes_filter_after_encoding() {
        for filter_mode in [
            FilterMode::BandpassIir,
            FilterMode::BandpassFir,
            FilterMode::Lowpass,
        ] {
            let mut builder = configuration(SignalMode::Simple);
            builder.filter_mode(filter_mode);
            let mut e = encoder(&builder, 0x0800_0000);
            let mut bank = FilterBank::design(&builder.build().unwrap());
            let mut plain = encoder(&configuration(SignalMode::Simple), 0x0800_0000);
            for _ in 0..500 {
                let unfiltered = plain.encode(0);
                let expected = Amplitude::from_f64_clamped(
                    bank.transform_sample(unfiltered.normalized())
                        * Amplitude::FULL_SCALE as f64,
                );
                assert_eq!(e.encode(0), expected, "{filter_mode}");
            }
        }
    }

    #[test]
    fn every_mode_advances_once_and_stays_in_range() {
        for mode in [
            SignalMode::Simple,
            SignalMode::Square,
            SignalMode::SigmaDelta,
            SignalMode::Sine,
            SignalMode::Predistortion,
            SignalMode::Oversampled,
        ] {
            let mut e = encoder(&configuration(mode), 0x0040_0000);
            for i in 0..1_000u32 {
                assert_eq!(e.oscillator().phase(), i.wrapping_mul(0x0040_0000));
                let out = e.encode(i16::MAX);
                assert_le!(out.0 as u32, Amplitude::FULL_SCALE);
            }
        }
    }
}
