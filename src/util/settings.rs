// Copyright (c) 2024 Mike Tsao

//! The immutable description of a transmission. Built once with
//! [ConfigurationBuilder] (or loaded from JSON), validated once, and then
//! passed by reference to everything that needs it.

use crate::{error::ConfigError, types::prelude::*};
use core::fmt::Display;
use derivative::Derivative;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum_macros::{EnumCount, EnumIter, EnumString, IntoStaticStr};

/// How each audio sample is turned into a carrier amplitude.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    strum_macros::Display,
    EnumCount,
    EnumIter,
    EnumString,
    IntoStaticStr,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum SignalMode {
    /// Table-driven sine carrier, scaled by the envelope.
    #[default]
    #[serde(rename = "simple")]
    #[strum(to_string = "simple")]
    Simple,
    /// Full-scale square carrier gated by the top phase bit.
    #[serde(rename = "square")]
    #[strum(to_string = "square")]
    Square,
    /// One-bit error-feedback quantizer driven by the sine carrier.
    #[serde(rename = "sigma-delta", alias = "sigma")]
    #[strum(to_string = "sigma-delta", serialize = "sigma")]
    SigmaDelta,
    /// Same arithmetic as [SignalMode::Simple].
    #[serde(rename = "sine")]
    #[strum(to_string = "sine")]
    Sine,
    /// Odd-order polynomial predistortion of the envelope, then
    /// [SignalMode::Simple].
    #[serde(rename = "predistortion", alias = "predist")]
    #[strum(to_string = "predistortion", serialize = "predist")]
    Predistortion,
    /// Normalized floating-point path with the filter bank applied before
    /// rescaling.
    #[serde(rename = "oversampled", alias = "oversample")]
    #[strum(to_string = "oversampled", serialize = "oversample")]
    Oversampled,
}
impl SignalMode {
    /// A human-readable name.
    pub fn description(&self) -> &'static str {
        match self {
            SignalMode::Simple => "Simple High Quality",
            SignalMode::Square => "Basic Square Wave",
            SignalMode::SigmaDelta => "Sigma-Delta",
            SignalMode::Sine => "Pure Sine Wave",
            SignalMode::Predistortion => "Pre-distortion",
            SignalMode::Oversampled => "Oversampled",
        }
    }
}

/// Which filter the filter bank is designed as.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    strum_macros::Display,
    EnumCount,
    EnumIter,
    EnumString,
    IntoStaticStr,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum FilterMode {
    /// No filtering.
    #[default]
    #[serde(rename = "none")]
    #[strum(to_string = "none")]
    None,
    /// Anti-aliasing lowpass cascade.
    #[serde(rename = "lowpass")]
    #[strum(to_string = "lowpass")]
    Lowpass,
    /// Butterworth-class IIR bandpass cascade around the carrier.
    #[serde(rename = "bp-iir")]
    #[strum(to_string = "bp-iir")]
    BandpassIir,
    /// Hamming-windowed FIR bandpass around the carrier.
    #[serde(rename = "bp-fir")]
    #[strum(to_string = "bp-fir")]
    BandpassFir,
    /// Elliptic-class bandpass. Designed with the IIR bandpass arithmetic; the
    /// ripple and stopband targets are informational.
    #[serde(rename = "bp-ellip")]
    #[strum(to_string = "bp-ellip")]
    BandpassElliptic,
    /// Several FIR bandpass kernels summed into one parallel bank.
    #[serde(rename = "multiband")]
    #[strum(to_string = "multiband")]
    Multiband,
}
impl FilterMode {
    /// A human-readable name.
    pub fn description(&self) -> &'static str {
        match self {
            FilterMode::None => "None",
            FilterMode::Lowpass => "Low-pass",
            FilterMode::BandpassIir => "IIR Butterworth",
            FilterMode::BandpassFir => "FIR Windowed",
            FilterMode::BandpassElliptic => "Elliptic",
            FilterMode::Multiband => "Multi-band",
        }
    }
}

/// What the consumer does when the output queue stays full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StallPolicy {
    /// Keep polling until the queue accepts the word or the session stops.
    #[default]
    Wait,
    /// Give up with [TransmitError::QueueStall](crate::TransmitError) after
    /// this many unsuccessful polls of a single word.
    Abort {
        #[allow(missing_docs)]
        max_polls: u64,
    },
}

/// Everything a session needs to know, fixed for the session's lifetime.
#[derive(Clone, Debug, Builder, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case", default)]
#[builder(default, build_fn(private, name = "build_from_builder"))]
pub struct Configuration {
    /// Hertz.
    #[derivative(Default(value = "774_000"))]
    carrier_frequency: u32,
    /// Frames per second of the incoming audio.
    audio_sample_rate: SampleRate,
    /// Percent.
    #[derivative(Default(value = "80"))]
    modulation_depth: u8,
    /// How each sample becomes a carrier amplitude.
    signal_mode: SignalMode,
    /// Which filter the bank is designed as.
    filter_mode: FilterMode,
    /// Output ticks per audio sample.
    #[derivative(Default(value = "8"))]
    oversampling: u8,
    /// Predistort the envelope whatever the signal mode.
    predistortion: bool,

    /// Hertz.
    #[derivative(Default(value = "20_000.0"))]
    filter_bandwidth: f64,
    /// Sets the section count of IIR designs and the tap count of FIR ones.
    #[derivative(Default(value = "6"))]
    filter_order: u8,
    /// Passband ripple in dB.
    #[derivative(Default(value = "0.5"))]
    filter_ripple_db: f64,
    /// Stopband attenuation in dB.
    #[derivative(Default(value = "60.0"))]
    filter_stopband_db: f64,

    /// Samples per exchange slot.
    #[derivative(Default(value = "2048"))]
    buffer_len: usize,
    /// Ticks per output pulse.
    #[derivative(Default(value = "64"))]
    base_period: u32,

    /// Safety cutoff. `None` disables it.
    #[derivative(Default(value = "Some(300)"))]
    time_limit_secs: Option<u64>,
    /// Busy-spin iterations before a waiting context starts sleeping.
    #[derivative(Default(value = "64"))]
    spin_limit: u32,
    /// Microseconds between polls once spinning is exhausted.
    #[derivative(Default(value = "100"))]
    poll_interval_us: u64,
    /// What to do when the output queue stays full.
    stall_policy: StallPolicy,
    /// Seconds between status log lines. Zero disables them.
    #[derivative(Default(value = "30"))]
    status_interval_secs: u64,
}
impl ConfigurationBuilder {
    /// The overridden Builder build() method. Every field is validated here,
    /// so a [Configuration] that exists is a valid one.
    pub fn build(&self) -> Result<Configuration, ConfigError> {
        match self.build_from_builder() {
            Ok(configuration) => {
                configuration.validate()?;
                Ok(configuration)
            }
            Err(e) => Err(ConfigError::Incomplete(e.to_string())),
        }
    }
}
impl From<&Configuration> for ConfigurationBuilder {
    fn from(value: &Configuration) -> Self {
        let mut builder = ConfigurationBuilder::default();
        builder
            .carrier_frequency(value.carrier_frequency)
            .audio_sample_rate(value.audio_sample_rate)
            .modulation_depth(value.modulation_depth)
            .signal_mode(value.signal_mode)
            .filter_mode(value.filter_mode)
            .oversampling(value.oversampling)
            .predistortion(value.predistortion)
            .filter_bandwidth(value.filter_bandwidth)
            .filter_order(value.filter_order)
            .filter_ripple_db(value.filter_ripple_db)
            .filter_stopband_db(value.filter_stopband_db)
            .buffer_len(value.buffer_len)
            .base_period(value.base_period)
            .time_limit_secs(value.time_limit_secs)
            .spin_limit(value.spin_limit)
            .poll_interval_us(value.poll_interval_us)
            .stall_policy(value.stall_policy)
            .status_interval_secs(value.status_interval_secs);
        builder
    }
}
#[allow(missing_docs)]
impl Configuration {
    pub const MIN_CARRIER_FREQUENCY: u32 = 10_000;
    pub const MAX_CARRIER_FREQUENCY: u32 = 30_000_000;
    pub const MAX_SAMPLE_RATE: u32 = 384_000;
    pub const MAX_MODULATION_DEPTH: u8 = 100;
    pub const MAX_OVERSAMPLING: u8 = 32;
    pub const MAX_FILTER_ORDER: u8 = 16;
    pub const MAX_BUFFER_LEN: usize = 65_536;

    /// Checks every field against its documented range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(Self::MIN_CARRIER_FREQUENCY..=Self::MAX_CARRIER_FREQUENCY)
            .contains(&self.carrier_frequency)
        {
            return Err(ConfigError::CarrierFrequency(self.carrier_frequency));
        }
        if !(1..=Self::MAX_SAMPLE_RATE).contains(&self.audio_sample_rate.0) {
            return Err(ConfigError::SampleRate(self.audio_sample_rate.0));
        }
        if self.modulation_depth > Self::MAX_MODULATION_DEPTH {
            return Err(ConfigError::ModulationDepth(self.modulation_depth));
        }
        if !(1..=Self::MAX_OVERSAMPLING).contains(&self.oversampling) {
            return Err(ConfigError::Oversampling(self.oversampling));
        }
        if !(1..=Self::MAX_FILTER_ORDER).contains(&self.filter_order) {
            return Err(ConfigError::FilterOrder(self.filter_order));
        }
        if !self.filter_bandwidth.is_finite() || self.filter_bandwidth <= 0.0 {
            return Err(ConfigError::FilterBandwidth(self.filter_bandwidth));
        }
        if !self.filter_ripple_db.is_finite() {
            return Err(ConfigError::FilterTarget {
                name: "ripple",
                value: self.filter_ripple_db,
            });
        }
        if !self.filter_stopband_db.is_finite() {
            return Err(ConfigError::FilterTarget {
                name: "stopband",
                value: self.filter_stopband_db,
            });
        }
        if !(1..=Self::MAX_BUFFER_LEN).contains(&self.buffer_len) {
            return Err(ConfigError::BufferLength(self.buffer_len));
        }
        if !(2..=u16::MAX as u32).contains(&self.base_period) {
            return Err(ConfigError::BasePeriod(self.base_period));
        }
        if let StallPolicy::Abort { max_polls: 0 } = self.stall_policy {
            return Err(ConfigError::StallPolicy);
        }
        Ok(())
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let configuration: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        configuration.validate()?;
        Ok(configuration)
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Every quality feature at once: oversampled signal path, elliptic-class
    /// bandpass, predistortion, 16x oversampling, 85% depth.
    pub fn best_quality() -> Self {
        Self {
            signal_mode: SignalMode::Oversampled,
            filter_mode: FilterMode::BandpassElliptic,
            predistortion: true,
            oversampling: 16,
            filter_bandwidth: 15_000.0,
            filter_order: 8,
            modulation_depth: 85,
            ..Default::default()
        }
    }

    pub fn carrier_frequency(&self) -> u32 {
        self.carrier_frequency
    }

    pub fn audio_sample_rate(&self) -> SampleRate {
        self.audio_sample_rate
    }

    pub fn modulation_depth(&self) -> u8 {
        self.modulation_depth
    }

    pub fn signal_mode(&self) -> SignalMode {
        self.signal_mode
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    pub fn oversampling(&self) -> u8 {
        self.oversampling
    }

    pub fn predistortion(&self) -> bool {
        self.predistortion
    }

    pub fn filter_bandwidth(&self) -> f64 {
        self.filter_bandwidth
    }

    pub fn filter_order(&self) -> u8 {
        self.filter_order
    }

    pub fn filter_ripple_db(&self) -> f64 {
        self.filter_ripple_db
    }

    pub fn filter_stopband_db(&self) -> f64 {
        self.filter_stopband_db
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    pub fn base_period(&self) -> u32 {
        self.base_period
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }

    pub fn spin_limit(&self) -> u32 {
        self.spin_limit
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    pub fn stall_policy(&self) -> StallPolicy {
        self.stall_policy
    }

    pub fn status_interval(&self) -> Option<Duration> {
        (self.status_interval_secs > 0).then(|| Duration::from_secs(self.status_interval_secs))
    }

    /// The rate at which the filter bank and oscillator run.
    pub fn tick_rate(&self) -> TickRate {
        self.audio_sample_rate.oversampled(self.oversampling)
    }
}
impl Display for Configuration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "carrier {}, {} Hz x{}, depth {}%, mode {}",
            FrequencyHz::from(self.carrier_frequency),
            self.audio_sample_rate.0,
            self.oversampling,
            self.modulation_depth,
            self.signal_mode.description(),
        )?;
        if self.filter_mode != FilterMode::None {
            write!(
                f,
                ", filter {} (±{:.1} Hz, order {})",
                self.filter_mode.description(),
                self.filter_bandwidth / 2.0,
                self.filter_order
            )?;
        }
        if self.predistortion {
            write!(f, ", predistortion")?;
        }
        Ok(())
    }
}
