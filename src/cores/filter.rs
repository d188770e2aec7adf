// Copyright (c) 2024 Mike Tsao

use crate::{
    traits::TransformsSample,
    util::{Configuration, FilterMode},
};
use core::f64::consts::{FRAC_1_SQRT_2, PI};
use log::debug;

/// Feedforward and feedback coefficients of one biquad section, with `a0`
/// already divided out.
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}
impl Default for BiquadCoefficients {
    // This is an identity set.
    fn default() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}
impl BiquadCoefficients {
    // Excerpted from Robert Bristow-Johnson's audio cookbook:
    //
    // BW is the bandwidth in octaves between -3 dB frequencies. Here it is
    // driven by the ratio of center frequency to bandwidth, which makes the
    // passband very wide relative to a true constant-Q design.
    fn rbj_intermediates_bandwidth(sample_rate: f64, cutoff: f64, bandwidth: f64) -> (f64, f64) {
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let w0sin = w0.sin();
        let alpha = w0sin * (2.0f64.ln() / 2.0 * bandwidth * w0 / w0sin).sinh();
        (w0.cos(), alpha)
    }

    fn rbj_intermediates_q(sample_rate: f64, cutoff: f64, q: f64) -> (f64, f64) {
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let alpha = w0.sin() / (2.0 * q.max(f64::EPSILON));
        (w0.cos(), alpha)
    }

    /// Constant 0 dB peak gain bandpass centered on `center`.
    pub fn bandpass(sample_rate: f64, center: f64, q: f64) -> Self {
        let (w0cos, alpha) = Self::rbj_intermediates_bandwidth(sample_rate, center, q);
        let norm = 1.0 + alpha;
        Self {
            b0: alpha / norm,
            b1: 0.0,
            b2: -alpha / norm,
            a1: -2.0 * w0cos / norm,
            a2: (1.0 - alpha) / norm,
        }
    }

    /// Unity DC gain lowpass.
    pub fn lowpass(sample_rate: f64, cutoff: f64, q: f64) -> Self {
        let (w0cos, alpha) = Self::rbj_intermediates_q(sample_rate, cutoff, q);
        let norm = 1.0 + alpha;
        let b1 = (1.0 - w0cos) / norm;
        Self {
            b0: b1 / 2.0,
            b1,
            b2: b1 / 2.0,
            a1: -2.0 * w0cos / norm,
            a2: (1.0 - alpha) / norm,
        }
    }
}

/// <https://en.wikipedia.org/wiki/Digital_biquad_filter>
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Biquad {
    coefficients: BiquadCoefficients,

    // x[0] is the current input, x[1] is x(n-1), and x[2] is x(n-2). Same for y.
    x: [f64; 3],
    y: [f64; 3],
}
impl TransformsSample for Biquad {
    fn transform_sample(&mut self, input: f64) -> f64 {
        // Scroll everything forward in time.
        self.x = [input, self.x[0], self.x[1]];
        self.y = [0.0, self.y[0], self.y[1]];

        let c = &self.coefficients;
        self.y[0] = c.b0 * self.x[0] + c.b1 * self.x[1] + c.b2 * self.x[2]
            - c.a1 * self.y[1]
            - c.a2 * self.y[2];
        self.y[0]
    }
}
impl Biquad {
    /// A section with zeroed history.
    pub fn new(coefficients: BiquadCoefficients) -> Self {
        Self {
            coefficients,
            ..Default::default()
        }
    }

    #[allow(missing_docs)]
    pub fn coefficients(&self) -> &BiquadCoefficients {
        &self.coefficients
    }

    /// Input and output history, newest first.
    pub fn history(&self) -> ([f64; 3], [f64; 3]) {
        (self.x, self.y)
    }
}

/// A direct-form FIR filter with a circular delay line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FirFilter {
    coefficients: Vec<f64>,
    delay_line: Vec<f64>,
    index: usize,
}
impl TransformsSample for FirFilter {
    fn transform_sample(&mut self, input: f64) -> f64 {
        let taps = self.coefficients.len();
        if taps == 0 {
            return input;
        }
        self.delay_line[self.index] = input;
        self.index = (self.index + 1) % taps;

        self.coefficients
            .iter()
            .enumerate()
            .map(|(i, c)| self.delay_line[(self.index + i) % taps] * c)
            .sum()
    }
}
impl FirFilter {
    /// The longest kernel the filter bank will design.
    pub const MAX_TAPS: usize = 256;

    /// A filter with the given kernel and a zeroed delay line.
    pub fn new(coefficients: Vec<f64>) -> Self {
        let delay_line = vec![0.0; coefficients.len()];
        Self {
            coefficients,
            delay_line,
            index: 0,
        }
    }

    /// A Hamming-windowed sinc bandpass kernel passing `low..high`, both in
    /// Hz. The kernel is centered between taps, so it is symmetric for every
    /// tap count.
    pub fn bandpass_kernel(taps: usize, sample_rate: f64, low: f64, high: f64) -> Vec<f64> {
        let f1 = low / sample_rate;
        let f2 = high / sample_rate;
        let center = (taps as f64 - 1.0) / 2.0;
        (0..taps)
            .map(|i| {
                let n = i as f64 - center;
                let h = if n == 0.0 {
                    2.0 * (f2 - f1)
                } else {
                    ((2.0 * PI * f2 * n).sin() - (2.0 * PI * f1 * n).sin()) / (PI * n)
                };
                h * Self::hamming(i, taps)
            })
            .collect()
    }

    fn hamming(i: usize, taps: usize) -> f64 {
        if taps < 2 {
            1.0
        } else {
            0.54 - 0.46 * (2.0 * PI * i as f64 / (taps - 1) as f64).cos()
        }
    }

    #[allow(missing_docs)]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    #[allow(missing_docs)]
    pub fn taps(&self) -> usize {
        self.coefficients.len()
    }
}

/// The filter applied to the normalized carrier. Designed once per session
/// from the [Configuration] and never redesigned or reset afterward.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FilterBank {
    /// Passthrough.
    #[default]
    None,
    /// Biquad sections applied in order.
    IirCascade(Vec<Biquad>),
    /// A single FIR kernel.
    Fir(FirFilter),
}
impl TransformsSample for FilterBank {
    fn transform_sample(&mut self, input: f64) -> f64 {
        match self {
            FilterBank::None => input,
            FilterBank::IirCascade(sections) => sections
                .iter_mut()
                .fold(input, |sample, section| section.transform_sample(sample)),
            FilterBank::Fir(fir) => fir.transform_sample(input),
        }
    }
}
impl FilterBank {
    /// The most biquad sections a cascade will have.
    pub const MAX_SECTIONS: usize = 4;
    /// Lowpass cutoffs are capped at this fraction of the filter's sample
    /// rate.
    pub const MAX_LOWPASS_FRACTION: f64 = 0.45;

    /// Designs the filter described by the configuration. The filter runs at
    /// the oversampled tick rate. Designing twice from the same configuration
    /// gives bit-identical results.
    pub fn design(configuration: &Configuration) -> Self {
        let sample_rate: f64 = configuration.tick_rate().into();
        let center = configuration.carrier_frequency() as f64;
        let bandwidth = configuration.filter_bandwidth();
        let order = configuration.filter_order() as usize;

        let bank = match configuration.filter_mode() {
            FilterMode::None => Self::None,
            FilterMode::BandpassIir | FilterMode::BandpassElliptic => {
                let coefficients =
                    BiquadCoefficients::bandpass(sample_rate, center, center / bandwidth);
                Self::IirCascade(vec![
                    Biquad::new(coefficients);
                    Self::section_count(order)
                ])
            }
            FilterMode::Lowpass => {
                let cutoff =
                    (center + bandwidth / 2.0).min(sample_rate * Self::MAX_LOWPASS_FRACTION);
                let coefficients = BiquadCoefficients::lowpass(sample_rate, cutoff, FRAC_1_SQRT_2);
                Self::IirCascade(vec![
                    Biquad::new(coefficients);
                    Self::section_count(order)
                ])
            }
            FilterMode::BandpassFir => Self::Fir(FirFilter::new(FirFilter::bandpass_kernel(
                Self::tap_count(order),
                sample_rate,
                center - bandwidth / 2.0,
                center + bandwidth / 2.0,
            ))),
            FilterMode::Multiband => {
                let taps = Self::tap_count(order);
                // One band per section, so never more than MAX_SECTIONS.
                let bands = Self::section_count(order);
                let mut kernel = vec![0.0; taps];
                for band in 0..bands {
                    let band_center =
                        center + (band as f64 - (bands as f64 - 1.0) / 2.0) * bandwidth;
                    let band_kernel = FirFilter::bandpass_kernel(
                        taps,
                        sample_rate,
                        band_center - bandwidth / 4.0,
                        band_center + bandwidth / 4.0,
                    );
                    kernel
                        .iter_mut()
                        .zip(band_kernel)
                        .for_each(|(sum, c)| *sum += c);
                }
                Self::Fir(FirFilter::new(kernel))
            }
        };
        debug!(
            "Designed {} filter at {sample_rate} Hz: {}",
            configuration.filter_mode().description(),
            bank.summary()
        );
        bank
    }

    /// `ceil(order / 2)`, at most [FilterBank::MAX_SECTIONS].
    pub fn section_count(order: usize) -> usize {
        order.div_ceil(2).min(Self::MAX_SECTIONS)
    }

    /// `order * 8`, at most [FirFilter::MAX_TAPS].
    pub fn tap_count(order: usize) -> usize {
        (order * 8).min(FirFilter::MAX_TAPS)
    }

    /// Whether samples pass through unchanged.
    pub fn is_active(&self) -> bool {
        !matches!(self, FilterBank::None)
    }

    fn summary(&self) -> String {
        match self {
            FilterBank::None => "passthrough".to_string(),
            FilterBank::IirCascade(sections) => format!(
                "{} section(s) of {:?}",
                sections.len(),
                sections.first().map(|s| *s.coefficients()).unwrap_or_default()
            ),
            FilterBank::Fir(fir) => format!("{} taps", fir.taps()),
        }
    }
}
