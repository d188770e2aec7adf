// Copyright (c) 2024 Mike Tsao

//! Error types. Configuration problems are reported before anything is
//! constructed; source problems before the producer starts or when a read
//! fails mid-session; queue stalls only when the stall policy asks for it.

use thiserror::Error;

/// A [Configuration](crate::util::Configuration) field was out of range.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Hertz.
    #[error("carrier frequency {0} Hz is out of range (10 kHz - 30 MHz supported)")]
    CarrierFrequency(u32),
    /// Hertz.
    #[error("audio sample rate {0} Hz is out of range (1 - 384000)")]
    SampleRate(u32),
    /// Percent.
    #[error("modulation depth {0}% is out of range (0 - 100)")]
    ModulationDepth(u8),
    #[allow(missing_docs)]
    #[error("oversampling factor {0} is out of range (1 - 32)")]
    Oversampling(u8),
    #[allow(missing_docs)]
    #[error("filter order {0} is out of range (1 - 16)")]
    FilterOrder(u8),
    /// Hertz.
    #[error("filter bandwidth {0} Hz must be finite and positive")]
    FilterBandwidth(f64),
    /// One of the informational ripple or stopband targets.
    #[allow(missing_docs)]
    #[error("filter {name} target {value} dB must be finite")]
    FilterTarget { name: &'static str, value: f64 },
    /// Samples per slot.
    #[error("buffer length {0} is out of range (1 - 65536)")]
    BufferLength(usize),
    /// Ticks per pulse.
    #[error("pulse base period {0} is out of range (2 - 65535 ticks)")]
    BasePeriod(u32),
    /// An abort policy that would never poll.
    #[error("stall policy must allow at least one poll")]
    StallPolicy,
    /// The JSON was malformed or had the wrong shape.
    #[error("configuration could not be parsed: {0}")]
    Parse(String),
    /// The builder could not produce a value.
    #[error("configuration is incomplete: {0}")]
    Incomplete(String),
}

/// The audio source could not be opened, parsed, or read.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Opening or reading the underlying stream failed.
    #[error("audio source I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "hound")]
    /// The container was malformed.
    #[error("audio source is not a readable WAV file: {0}")]
    Wav(#[from] hound::Error),
    /// Only 16-bit integer PCM with one or two channels is accepted.
    #[allow(missing_docs)]
    #[error("unsupported audio format: {channels} channel(s), {bits_per_sample}-bit {encoding}")]
    UnsupportedFormat {
        channels: u16,
        bits_per_sample: u16,
        encoding: &'static str,
    },
}

/// Everything that can stop a session from starting or end it abnormally.
/// Reaching the time limit is not an error; see
/// [TerminationReason](crate::orchestration::TerminationReason).
#[derive(Debug, Error)]
pub enum TransmitError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The source could not be opened or read.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// The output queue stayed full longer than the stall policy allows.
    #[allow(missing_docs)]
    #[error("output queue stayed full for {polls} polls")]
    QueueStall { polls: u64 },
    /// A session context panicked.
    #[error("the {0} context panicked")]
    Context(&'static str),
}
