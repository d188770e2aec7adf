// Copyright (c) 2024 Mike Tsao

use amwave::prelude::*;
use more_asserts::{assert_ge, assert_le};
use std::{io::Cursor, sync::Mutex, time::Duration};
use strum::IntoEnumIterator;

/// An output queue with unlimited room that remembers everything it was
/// given.
#[derive(Debug, Default)]
struct RecordingQueue(Mutex<Vec<u32>>);
impl OutputQueue for RecordingQueue {
    fn try_put(&self, word: u32) -> bool {
        self.0.lock().unwrap().push(word);
        true
    }
}
impl RecordingQueue {
    fn words(&self) -> Vec<u32> {
        self.0.lock().unwrap().clone()
    }
}

/// Delivers `good` samples of silence, then fails.
#[derive(Debug)]
struct FailingSource {
    good: usize,
}
impl AudioSource for FailingSource {
    fn format(&self) -> SourceFormat {
        SourceFormat {
            sample_rate: SampleRate::DEFAULT,
            channels: 1,
            bits_per_sample: 16,
            frames: None,
        }
    }

    fn read_chunk(&mut self, out: &mut [i16]) -> Result<usize, SourceError> {
        if self.good == 0 {
            return Err(SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "device unplugged",
            )));
        }
        let count = out.len().min(self.good);
        out[..count].fill(0);
        self.good -= count;
        Ok(count)
    }
}

/// Deterministic pseudo-audio that covers the whole sample range.
fn noise(len: usize) -> Vec<i16> {
    let mut state = 0x2545_f491_u32;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 16) as u16 as i16
        })
        .collect()
}

/// What the session should produce: every sample encoded in order by a
/// single encoder, with the final partial buffer padded with silence.
fn expected_words(configuration: &Configuration, samples: &[i16]) -> Vec<u32> {
    let buffer_len = configuration.buffer_len();
    let padded_len = samples.len().div_ceil(buffer_len) * buffer_len;
    let mut encoder = ModulationEncoder::new(configuration);
    let timing = PulseTiming::new(configuration);
    samples
        .iter()
        .copied()
        .chain(std::iter::repeat(0))
        .take(padded_len)
        .map(|sample| timing.encode(encoder.encode(sample)).to_word())
        .collect()
}

fn quick_configuration() -> ConfigurationBuilder {
    let mut builder = ConfigurationBuilder::default();
    builder
        .carrier_frequency(40_000)
        .oversampling(4)
        .buffer_len(256)
        .time_limit_secs(None)
        .spin_limit(16)
        .poll_interval_us(10)
        .status_interval_secs(0);
    builder
}

#[test]
fn every_mode_delivers_every_sample_in_order() {
    let samples = noise(3000);
    for mode in SignalMode::iter() {
        for filter in [FilterMode::None, FilterMode::BandpassIir] {
            let configuration = quick_configuration()
                .signal_mode(mode)
                .filter_mode(filter)
                .filter_bandwidth(10_000.0)
                .build()
                .unwrap();
            let transmitter = Transmitter::new(configuration.clone()).unwrap();
            let queue = RecordingQueue::default();
            let mut source = MemorySource::mono(SampleRate::DEFAULT, samples.clone())
                .with_max_chunk(100);

            let report = transmitter.run(&mut source, &queue).unwrap();
            assert_eq!(report.reason, TerminationReason::InputExhausted);
            assert_eq!(report.buffers, 12, "{mode} {filter}");
            assert_eq!(report.samples_processed, 12 * 256);
            assert_eq!(
                queue.words(),
                expected_words(&configuration, &samples),
                "{mode} with {filter} filter"
            );
        }
    }
}

#[test]
fn stereo_is_downmixed() {
    let configuration = quick_configuration().build().unwrap();
    let stereo: Vec<i16> = noise(2048);
    let mono: Vec<i16> = stereo
        .chunks_exact(2)
        .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
        .collect();

    let transmitter = Transmitter::new(configuration.clone()).unwrap();
    let queue = RecordingQueue::default();
    let mut source = MemorySource::stereo(SampleRate::DEFAULT, stereo).with_max_chunk(77);
    let report = transmitter.run(&mut source, &queue).unwrap();
    assert_eq!(report.reason, TerminationReason::InputExhausted);
    assert_eq!(report.samples_processed, 1024);
    assert_eq!(queue.words(), expected_words(&configuration, &mono));
}

#[test]
fn empty_source_ends_without_output() {
    let transmitter = Transmitter::new(quick_configuration().build().unwrap()).unwrap();
    let queue = RecordingQueue::default();
    let mut source = MemorySource::mono(SampleRate::DEFAULT, Vec::default());
    let report = transmitter.run(&mut source, &queue).unwrap();
    assert_eq!(report.reason, TerminationReason::InputExhausted);
    assert_eq!(report.samples_processed, 0);
    assert_eq!(report.buffers, 0);
    assert!(queue.words().is_empty());
}

#[test]
fn wav_file_is_transmitted() {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let samples = noise(1000);
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for sample in &samples {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    let configuration = quick_configuration().build().unwrap();
    let transmitter = Transmitter::new(configuration.clone()).unwrap();
    let queue = RecordingQueue::default();
    let mut source = WavSource::new(Cursor::new(cursor.into_inner())).unwrap();
    let report = transmitter.run(&mut source, &queue).unwrap();
    assert_eq!(report.reason, TerminationReason::InputExhausted);
    assert_eq!(queue.words(), expected_words(&configuration, &samples));
}

#[test]
fn safety_timeout_ends_a_stuck_session() {
    let configuration = quick_configuration()
        .time_limit_secs(Some(1))
        .build()
        .unwrap();
    let transmitter = Transmitter::new(configuration).unwrap();

    // Nothing ever drains this queue.
    let queue = ReplayQueue::new(4);
    let mut source = MemorySource::mono(SampleRate::DEFAULT, noise(100_000));
    let report = transmitter.run(&mut source, &queue).unwrap();
    assert_eq!(report.reason, TerminationReason::SafetyTimeout);
    assert_eq!(report.samples_processed, 4);
    assert_eq!(report.buffers, 0);
    assert_ge!(report.elapsed, Duration::from_secs(1));
    assert_le!(report.elapsed, Duration::from_secs(10));
}

#[test]
fn stop_handle_ends_a_running_session() {
    let transmitter = Transmitter::new(quick_configuration().build().unwrap()).unwrap();
    let stop = transmitter.stop_handle();
    let queue = ReplayQueue::new(4);
    let mut source = MemorySource::mono(SampleRate::DEFAULT, noise(100_000));

    let report = std::thread::scope(|s| {
        s.spawn(|| {
            std::thread::sleep(Duration::from_millis(50));
            stop.stop();
        });
        transmitter.run(&mut source, &queue).unwrap()
    });
    assert_eq!(report.reason, TerminationReason::Stopped);
    assert_eq!(report.samples_processed, 4);
    assert!(transmitter.stop_handle().is_stopped());
}

#[test]
fn stall_policy_abort_reports_the_stall() {
    let configuration = quick_configuration()
        .stall_policy(StallPolicy::Abort { max_polls: 10 })
        .build()
        .unwrap();
    let transmitter = Transmitter::new(configuration).unwrap();
    let queue = ReplayQueue::new(4);
    let mut source = MemorySource::mono(SampleRate::DEFAULT, noise(10_000));
    match transmitter.run(&mut source, &queue) {
        Err(TransmitError::QueueStall { polls }) => assert_eq!(polls, 10),
        other => panic!("expected a queue stall, got {other:?}"),
    }
    assert_eq!(queue.len(), 4);
}

#[test]
fn source_error_mid_session_is_reported() {
    let transmitter = Transmitter::new(quick_configuration().build().unwrap()).unwrap();
    let queue = RecordingQueue::default();
    let mut source = FailingSource { good: 1000 };
    assert!(matches!(
        transmitter.run(&mut source, &queue),
        Err(TransmitError::Source(SourceError::Io(_)))
    ));
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    // Deserializing directly skips validation, so the session must catch it.
    let configuration: Configuration =
        serde_json::from_str(r#"{ "modulation-depth": 150 }"#).unwrap();
    assert!(matches!(
        Transmitter::new(configuration),
        Err(TransmitError::Config(ConfigError::ModulationDepth(150)))
    ));

    assert!(matches!(
        Configuration::from_json_str(r#"{ "carrier-frequency": 5 }"#),
        Err(ConfigError::CarrierFrequency(5))
    ));
}
