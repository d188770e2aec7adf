// Copyright (c) 2024 Mike Tsao

use super::{
    exchange::{BufferExchange, SlotCursor},
    wait::PollWaiter,
};
use crate::{
    cores::{ModulationEncoder, PulseTiming},
    error::{SourceError, TransmitError},
    traits::{AudioSource, OutputQueue, SourceFormat},
    types::prelude::*,
    util::{Configuration, StallPolicy},
};
use log::{debug, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use strum_macros::Display;

/// Why a session ended without an error.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum TerminationReason {
    /// Every sample the source produced was encoded and queued.
    #[strum(to_string = "input exhausted")]
    InputExhausted,
    /// The configured time limit elapsed.
    #[strum(to_string = "safety timeout")]
    SafetyTimeout,
    /// A [StopHandle] asked the session to stop.
    #[strum(to_string = "stopped")]
    Stopped,
}

/// What a finished session did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionReport {
    #[allow(missing_docs)]
    pub reason: TerminationReason,
    /// Mono samples encoded and accepted by the output queue.
    pub samples_processed: u64,
    /// Buffers fully drained.
    pub buffers: u64,
    #[allow(missing_docs)]
    pub elapsed: Duration,
}

/// Asks a running (or future) session to stop. Clones share the same flag.
/// Once a stop has been requested, it stays requested.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);
impl StopHandle {
    /// Requests the stop. Both contexts notice it at their next iteration
    /// boundary.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[allow(missing_docs)]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// State both contexts see during one session.
#[derive(Debug)]
struct SessionState {
    active: AtomicBool,
    input_exhausted: AtomicBool,
    samples_processed: AtomicU64,
    stop: StopHandle,
    start: Instant,
    time_limit: Option<Duration>,
}
impl SessionState {
    fn new(stop: StopHandle, time_limit: Option<Duration>) -> Self {
        Self {
            active: AtomicBool::new(true),
            input_exhausted: AtomicBool::new(false),
            samples_processed: AtomicU64::new(0),
            stop,
            start: Instant::now(),
            time_limit,
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// The reason the consumer should end the session now, if any.
    fn interruption(&self) -> Option<TerminationReason> {
        if self.stop.is_stopped() || !self.is_active() {
            Some(TerminationReason::Stopped)
        } else if self
            .time_limit
            .is_some_and(|limit| self.start.elapsed() >= limit)
        {
            Some(TerminationReason::SafetyTimeout)
        } else {
            None
        }
    }
}

// Drops `active` when the consumer returns or unwinds, so the producer never
// waits on a consumer that is gone.
struct DeactivateOnDrop<'a>(&'a SessionState);
impl Drop for DeactivateOnDrop<'_> {
    fn drop(&mut self) {
        self.0.deactivate();
    }
}

/// Runs transmission sessions: a producer that reads audio into the buffer
/// exchange, and a consumer that encodes each buffer and feeds the output
/// queue.
///
/// The producer runs on the calling thread, so sources that block or aren't
/// [Send] are fine. The consumer runs on a scoped thread that owns the
/// oscillator and filter bank for the whole session.
#[derive(Debug)]
pub struct Transmitter {
    configuration: Configuration,
    stop: StopHandle,
}
impl Transmitter {
    /// Validates the configuration before anything else is built.
    pub fn new(configuration: Configuration) -> Result<Self, TransmitError> {
        configuration.validate()?;
        Ok(Self {
            configuration,
            stop: StopHandle::default(),
        })
    }

    /// A handle that ends the session from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    #[allow(missing_docs)]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Transmits until the source runs dry, the time limit elapses, or a stop
    /// is requested. Reaching any of those is a normal end, reported in
    /// [SessionReport::reason].
    pub fn run<S: AudioSource, Q: OutputQueue>(
        &self,
        source: &mut S,
        queue: &Q,
    ) -> Result<SessionReport, TransmitError> {
        let format = source.format();
        self.check_format(&format)?;

        let configuration = &self.configuration;
        let exchange = BufferExchange::new(configuration.buffer_len());
        let encoder = ModulationEncoder::new(configuration);
        let timing = PulseTiming::new(configuration);
        let state = SessionState::new(self.stop.clone(), configuration.time_limit());
        info!("Starting transmission: {configuration}");

        let (producer_result, consumer_result) = std::thread::scope(|s| {
            let consumer = s.spawn(|| {
                let _guard = DeactivateOnDrop(&state);
                Consumer {
                    configuration,
                    exchange: &exchange,
                    state: &state,
                    queue,
                    encoder,
                    timing,
                }
                .run()
            });
            let producer_result = Producer {
                configuration,
                exchange: &exchange,
                state: &state,
                channels: format.channels as usize,
            }
            .run(source);
            if producer_result.is_err() {
                state.deactivate();
            }
            let consumer_result = consumer
                .join()
                .unwrap_or(Err(TransmitError::Context("consumer")));
            (producer_result, consumer_result)
        });
        producer_result?;
        let (reason, buffers) = consumer_result?;

        let report = SessionReport {
            reason,
            samples_processed: state.samples_processed.load(Ordering::Acquire),
            buffers,
            elapsed: state.start.elapsed(),
        };
        info!(
            "Transmission ended ({}): {} samples in {} buffers, {:.1}s",
            report.reason,
            report.samples_processed,
            report.buffers,
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }

    fn check_format(&self, format: &SourceFormat) -> Result<(), SourceError> {
        if !(1..=2).contains(&format.channels) || format.bits_per_sample != 16 {
            return Err(SourceError::UnsupportedFormat {
                channels: format.channels,
                bits_per_sample: format.bits_per_sample,
                encoding: "PCM",
            });
        }
        if format.sample_rate != self.configuration.audio_sample_rate() {
            warn!(
                "Audio source is {} Hz but the configuration says {} Hz; playback speed will be off",
                format.sample_rate.0,
                self.configuration.audio_sample_rate().0
            );
        }
        if let Some(duration) = format.duration() {
            debug!("Audio source runs {:.1}s", duration.as_secs_f64());
            if let Some(limit) = self.configuration.time_limit() {
                if duration > limit {
                    warn!(
                        "Audio source runs {:.1}s but the time limit is {:.1}s; it will be cut short",
                        duration.as_secs_f64(),
                        limit.as_secs_f64()
                    );
                }
            }
        }
        Ok(())
    }
}

struct Producer<'a> {
    configuration: &'a Configuration,
    exchange: &'a BufferExchange,
    state: &'a SessionState,
    channels: usize,
}
impl Producer<'_> {
    fn run<S: AudioSource>(&self, source: &mut S) -> Result<(), TransmitError> {
        let buffer_len = self.exchange.buffer_len();
        let mut interleaved = vec![0; buffer_len * self.channels];
        let mut cursor = SlotCursor::default();
        let mut waiter = PollWaiter::new(self.configuration);

        loop {
            if !self.state.is_active() {
                return Ok(());
            }
            let frames = self.read_frames(source, &mut interleaved)?;
            if frames == 0 {
                break;
            }
            let chunk = &interleaved[..frames * self.channels];
            loop {
                if !self.state.is_active() {
                    return Ok(());
                }
                if self
                    .exchange
                    .try_fill(&mut cursor, |audio| downmix(chunk, self.channels, audio))
                    .is_some()
                {
                    break;
                }
                waiter.wait();
            }
            waiter.reset();
            if frames < buffer_len {
                break;
            }
        }
        debug!("Producer reached the end of the audio source");
        self.state.input_exhausted.store(true, Ordering::Release);
        Ok(())
    }

    /// Reads whole frames until `interleaved` is full or the source ends.
    fn read_frames<S: AudioSource>(
        &self,
        source: &mut S,
        interleaved: &mut [AudioSample],
    ) -> Result<usize, SourceError> {
        let mut filled = 0;
        while filled < interleaved.len() {
            match source.read_chunk(&mut interleaved[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(filled / self.channels)
    }
}

/// Averages interleaved stereo pairs into `out`, and zero-fills whatever the
/// chunk doesn't cover.
fn downmix(chunk: &[AudioSample], channels: usize, out: &mut [AudioSample]) {
    let frames = chunk.chunks_exact(channels).map(|frame| match frame {
        [left, right] => ((*left as i32 + *right as i32) / 2) as AudioSample,
        [mono, ..] => *mono,
        [] => 0,
    });
    let mut written = 0;
    for (sample, value) in out.iter_mut().zip(frames) {
        *sample = value;
        written += 1;
    }
    out[written..].fill(0);
}

struct Consumer<'a, Q: OutputQueue> {
    configuration: &'a Configuration,
    exchange: &'a BufferExchange,
    state: &'a SessionState,
    queue: &'a Q,
    encoder: ModulationEncoder,
    timing: PulseTiming,
}
impl<Q: OutputQueue> Consumer<'_, Q> {
    fn run(mut self) -> Result<(TerminationReason, u64), TransmitError> {
        let mut cursor = SlotCursor::default();
        let mut waiter = PollWaiter::new(self.configuration);
        let status_interval = self.configuration.status_interval();
        let mut next_status = status_interval;
        let mut buffers = 0;

        let reason = loop {
            if let Some(reason) = self.state.interruption() {
                break reason;
            }
            let exchange = self.exchange;
            match exchange.try_drain(&mut cursor, |audio, encoded| {
                self.drain_buffer(audio, encoded)
            }) {
                Some(result) => {
                    if result? {
                        buffers += 1;
                    }
                    waiter.reset();
                }
                None => {
                    if self.state.input_exhausted.load(Ordering::Acquire)
                        && exchange.ready_count() == 0
                    {
                        break TerminationReason::InputExhausted;
                    }
                    waiter.wait();
                }
            }
            if let (Some(interval), Some(due)) = (status_interval, next_status) {
                let elapsed = self.state.start.elapsed();
                if elapsed >= due {
                    info!(
                        "Transmitting: {:.0}s elapsed, {} samples processed",
                        elapsed.as_secs_f64(),
                        self.state.samples_processed.load(Ordering::Acquire)
                    );
                    next_status = Some(due + interval);
                }
            }
        };
        Ok((reason, buffers))
    }

    /// Encodes a whole buffer, then feeds it to the queue word by word.
    /// Returns false if the session was interrupted before every word went
    /// out.
    fn drain_buffer(
        &mut self,
        audio: &[AudioSample],
        encoded: &mut [u32],
    ) -> Result<bool, TransmitError> {
        for (word, sample) in encoded.iter_mut().zip(audio) {
            *word = self.timing.encode(self.encoder.encode(*sample)).to_word();
        }

        let mut waiter = PollWaiter::new(self.configuration);
        for word in encoded.iter() {
            while !self.queue.try_put(*word) {
                if self.state.interruption().is_some() {
                    return Ok(false);
                }
                if let StallPolicy::Abort { max_polls } = self.configuration.stall_policy() {
                    if waiter.polls() >= max_polls {
                        return Err(TransmitError::QueueStall {
                            polls: waiter.polls(),
                        });
                    }
                }
                waiter.wait();
            }
            waiter.reset();
            self.state.samples_processed.fetch_add(1, Ordering::AcqRel);
        }
        Ok(true)
    }
}
