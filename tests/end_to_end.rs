// Copyright (c) 2024 Mike Tsao

use amwave::prelude::*;
use more_asserts::{assert_gt, assert_lt};
use std::{
    f64::consts::TAU,
    sync::atomic::{AtomicBool, Ordering},
};

/// Runs a whole session against a queue that a second thread drains as fast
/// as it can, and returns everything that came out.
fn transmit(configuration: Configuration, samples: Vec<i16>) -> (SessionReport, Vec<u32>) {
    let transmitter = Transmitter::new(configuration.clone()).unwrap();
    let mut source = MemorySource::mono(configuration.audio_sample_rate(), samples);
    let queue = ReplayQueue::new(256);
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        let drain = s.spawn(|| {
            let mut words = Vec::default();
            loop {
                match queue.pop() {
                    Some(word) => words.push(word),
                    None if done.load(Ordering::Acquire) => break,
                    None => std::thread::yield_now(),
                }
            }
            words
        });
        let report = transmitter.run(&mut source, &queue);
        done.store(true, Ordering::Release);
        (report.unwrap(), drain.join().unwrap())
    })
}

fn hann_magnitude(signal: &[f64], frequency: f64, sample_rate: f64) -> f64 {
    let n = signal.len() as f64;
    let (re, im) = signal
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(re, im), (t, x)| {
            let window = 0.5 - 0.5 * (TAU * t as f64 / (n - 1.0)).cos();
            let angle = TAU * frequency * t as f64 / sample_rate;
            (re + x * window * angle.cos(), im - x * window * angle.sin())
        });
    (re * re + im * im).sqrt()
}

fn folded(frequency: f64, sample_rate: f64) -> f64 {
    let f = frequency.rem_euclid(sample_rate);
    if f > sample_rate / 2.0 {
        sample_rate - f
    } else {
        f
    }
}

// A 1 kHz tone on a broadcast-band carrier, with one pulse per audio sample.
// The carrier aliases far below Nyquist, but the AM structure survives
// aliasing: a carrier line with symmetric sidebands 1 kHz either side.
#[test]
fn tone_produces_symmetric_sidebands() {
    let configuration = ConfigurationBuilder::default()
        .carrier_frequency(774_000)
        .audio_sample_rate(SampleRate::new(44_100))
        .oversampling(1)
        .modulation_depth(80)
        .signal_mode(SignalMode::Simple)
        .filter_mode(FilterMode::None)
        .buffer_len(4096)
        .time_limit_secs(None)
        .status_interval_secs(0)
        .build()
        .unwrap();
    let fs = 44_100.0;
    let tone: Vec<i16> = (0..44_100)
        .map(|n| (32767.0 * (TAU * 1000.0 * n as f64 / fs).sin()).round() as i16)
        .collect();

    let (report, words) = transmit(configuration.clone(), tone);
    assert_eq!(report.reason, TerminationReason::InputExhausted);
    assert_eq!(words.len() as u64, report.samples_processed);
    assert!(words.len() >= 44_100);

    let signal: Vec<f64> = words[..44_100]
        .iter()
        .map(|w| PulsePair::from_word(*w).high as f64)
        .collect();
    assert!(words
        .iter()
        .all(|w| PulsePair::from_word(*w).period() == 64));

    let increment = CarrierOscillator::new(&configuration).phase_increment();
    let alias = (increment as f64 * fs / 4_294_967_296.0).rem_euclid(fs);
    let carrier = hann_magnitude(&signal, folded(alias, fs), fs);
    let lower = hann_magnitude(&signal, folded(alias - 1000.0, fs), fs);
    let upper = hann_magnitude(&signal, folded(alias + 1000.0, fs), fs);

    let lower_db = 20.0 * (lower / carrier).log10();
    let upper_db = 20.0 * (upper / carrier).log10();
    assert_lt!((lower_db - upper_db).abs(), 0.5);

    // Ideal AM at 80% puts each sideband at -7.96 dB. Full-scale peaks clip
    // against the top of the unsigned sine table, which costs about 3 dB.
    assert_gt!(lower_db, -12.0);
    assert_lt!(lower_db, -10.0);

    for f in [300.0, 500.0, 700.0, 1100.0, 1300.0, 1500.0] {
        assert_lt!(hann_magnitude(&signal, f, fs) / carrier, 0.2);
    }
}

#[test]
fn silence_produces_steady_carrier() {
    let configuration = ConfigurationBuilder::default()
        .oversampling(1)
        .buffer_len(512)
        .time_limit_secs(None)
        .build()
        .unwrap();
    let (report, words) = transmit(configuration.clone(), vec![0; 2048]);
    assert_eq!(report.reason, TerminationReason::InputExhausted);
    assert_eq!(report.samples_processed, 2048);
    assert_eq!(report.buffers, 4);

    // With no audio, the output is exactly the unmodulated carrier.
    let mut oscillator = CarrierOscillator::new(&configuration);
    let timing = PulseTiming::new(&configuration);
    for word in words {
        let expected = timing.encode(oscillator.next_base_amplitude());
        assert_eq!(PulsePair::from_word(word), expected);
    }
}
