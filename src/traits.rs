// Copyright (c) 2024 Mike Tsao

//! The traits that define the seams between the signal pipeline and the
//! things around it: where audio comes from, where pulses go, and how a
//! filter stage processes a sample.

use crate::{error::SourceError, types::prelude::*};
use crossbeam::channel::{Receiver, Sender};

/// Quick import of all important traits.
pub mod prelude {
    pub use super::{AudioSource, OutputQueue, ProvidesService, SourceFormat, TransformsSample};
}

/// What an [AudioSource] says about its data before any of it is read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceFormat {
    /// Frames per second.
    pub sample_rate: SampleRate,
    /// Interleaved channels per frame. Only 1 and 2 are accepted by the
    /// session.
    pub channels: u16,
    /// Always 16 for sources the session accepts.
    pub bits_per_sample: u16,
    /// Total frames, if the source knows.
    pub frames: Option<u64>,
}
impl SourceFormat {
    /// How long the source plays at its own rate, if its length is known.
    pub fn duration(&self) -> Option<std::time::Duration> {
        self.frames.map(|frames| self.sample_rate.duration_of(frames))
    }
}

/// A stream of signed 16-bit PCM samples. The session's producer is the only
/// caller, so implementations may block.
pub trait AudioSource {
    /// The stream's header information.
    fn format(&self) -> SourceFormat;

    /// Fills `out` with interleaved samples and returns how many were
    /// written. `Ok(0)` means the end of the data.
    fn read_chunk(&mut self, out: &mut [AudioSample]) -> Result<usize, SourceError>;
}

/// The hardware FIFO of 32-bit pulse words. The consumer polls
/// [OutputQueue::try_put()] until it succeeds.
pub trait OutputQueue: Sync {
    /// Appends `word` if there is room. Returns false if the queue is full.
    fn try_put(&self, word: u32) -> bool;
}

/// A [TransformsSample] takes one normalized sample, does something to it,
/// and returns the result. It's what filters do.
pub trait TransformsSample: core::fmt::Debug {
    /// Transforms a single sample, updating internal history.
    fn transform_sample(&mut self, input: f64) -> f64;
}

/// Service methods.
///
/// A service is something that usually runs in its own thread as a daemon and
/// that communicates with clients by crossbeam channels. It accepts Inputs and
/// produces Events.
pub trait ProvidesService<I: core::fmt::Debug, E: core::fmt::Debug> {
    /// The sender side of the Input channel. Use this to send commands to the
    /// service.
    fn sender(&self) -> &Sender<I>;

    /// A convenience method to send Inputs to the service.
    fn send_input(&self, input: I) {
        if let Err(e) = self.sender().try_send(input) {
            log::warn!("While sending: {e:?}");
        }
    }

    /// The receiver side of the Event channel. Integrate this into a listener
    /// loop to respond to events.
    fn receiver(&self) -> &Receiver<E>;
}
