// Copyright (c) 2024 Mike Tsao

#![deny(missing_docs, unused_imports, unused_variables)]
#![allow(rustdoc::private_intra_doc_links)]

//! Amwave turns audio into an amplitude-modulated carrier made of nothing but
//! duty-cycle pulses, for hardware that can replay a queue of pulse timings
//! on a single output line at a fixed tick rate.
//!
//! The signal path is a table-driven DDS [CarrierOscillator], an optional
//! [FilterBank], a [ModulationEncoder] with six encoding strategies, and a
//! [PulseTiming] converter that turns amplitudes into 32-bit hardware words.
//! A [Transmitter] runs that path in a session: a producer reads from an
//! [AudioSource](traits::AudioSource) into a two-slot
//! [BufferExchange](orchestration::BufferExchange), and a consumer encodes
//! each buffer and feeds an [OutputQueue](traits::OutputQueue).
//!
//! * *Easiest*: build a [Configuration] with [ConfigurationBuilder], open a
//! [WavSource](sources::WavSource), and call [Transmitter::run()] with a
//! [ReplayQueue](orchestration::ReplayQueue).
//! * *More control*: drive [ModulationEncoder::encode()] and
//! [PulseTiming::encode()] one sample at a time from your own loop.

/// A collection of imports that are useful to users of this crate. `use
/// amwave::prelude::*;` for easier onboarding.
pub mod prelude {
    pub use super::{
        cores::prelude::*, elements::prelude::*, error::*, orchestration::prelude::*,
        sources::prelude::*, traits::prelude::*, types::prelude::*, util::prelude::*,
    };
}

// Fundamental structures that are important enough to re-export at top level.
pub use {
    cores::{FilterBank, ModulationEncoder, PulseTiming},
    elements::CarrierOscillator,
    error::{ConfigError, SourceError, TransmitError},
    orchestration::{SessionReport, StopHandle, TerminationReason, Transmitter},
    util::{Configuration, ConfigurationBuilder},
    version::app_version,
};

pub mod cores;
pub mod elements;
pub mod error;
pub mod orchestration;
pub mod sources;
pub mod traits;
pub mod types;
pub mod util;

mod version;
