// Copyright (c) 2024 Mike Tsao

//! The `render` demo transmits a WAV file through a simulated pulse-replay
//! peripheral, optionally capturing the duty-cycle train as a WAV file at the
//! tick rate so that its spectrum can be inspected with ordinary audio tools.

use amwave::{
    orchestration::ReplayQueue,
    prelude::*,
    sources::WavSource,
    types::{PulsePair, TickRate},
};
use amwave_services::{ReplayHardwareService, ReplayServiceEvent};
use anyhow::Context;
use clap::Parser;
use std::{path::PathBuf, str::FromStr};

#[derive(Parser, Debug, Default)]
#[clap(author, about, long_about = None)]
struct Args {
    /// 16-bit PCM WAV file to transmit
    input: Option<PathBuf>,

    /// JSON configuration to start from
    #[clap(short = 'c', long, value_parser)]
    config: Option<PathBuf>,

    /// Start from the best-quality preset
    #[clap(short = 'b', long, value_parser)]
    best_quality: bool,

    /// Carrier frequency in Hz
    #[clap(short = 'f', long, value_parser)]
    frequency: Option<u32>,

    /// simple, square, sigma, sine, predist, or oversample
    #[clap(short = 'm', long, value_parser)]
    mode: Option<String>,

    /// none, lowpass, bp-iir, bp-fir, bp-ellip, or multiband
    #[clap(long, value_parser)]
    filter: Option<String>,

    /// Modulation depth in percent
    #[clap(long, value_parser)]
    depth: Option<u8>,

    /// Oversampling factor
    #[clap(short = 'o', long, value_parser)]
    oversampling: Option<u8>,

    /// Safety time limit in seconds; 0 disables it
    #[clap(short = 't', long, value_parser)]
    time_limit: Option<u64>,

    /// Write the replayed pulse train to this WAV file
    #[clap(short = 'w', long, value_parser)]
    capture: Option<PathBuf>,

    /// Replay as fast as possible instead of at the tick rate
    #[clap(short = 'u', long, value_parser)]
    unpaced: bool,

    /// Print the effective configuration as JSON and exit
    #[clap(long, value_parser)]
    dump_config: bool,

    /// Print version and exit
    #[clap(short = 'v', long, value_parser)]
    version: bool,
}

fn configuration_from(args: &Args) -> anyhow::Result<Configuration> {
    let base = if let Some(path) = &args.config {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("while reading {}", path.display()))?;
        Configuration::from_json_str(&json)?
    } else if args.best_quality {
        Configuration::best_quality()
    } else {
        Configuration::default()
    };

    let mut builder = ConfigurationBuilder::from(&base);
    if let Some(frequency) = args.frequency {
        builder.carrier_frequency(frequency);
    }
    if let Some(mode) = &args.mode {
        builder.signal_mode(
            SignalMode::from_str(mode).with_context(|| format!("unknown signal mode {mode}"))?,
        );
    }
    if let Some(filter) = &args.filter {
        builder.filter_mode(
            FilterMode::from_str(filter)
                .with_context(|| format!("unknown filter mode {filter}"))?,
        );
    }
    if let Some(depth) = args.depth {
        builder.modulation_depth(depth);
    }
    if let Some(oversampling) = args.oversampling {
        builder.oversampling(oversampling);
    }
    if let Some(time_limit) = args.time_limit {
        builder.time_limit_secs((time_limit > 0).then_some(time_limit));
    }
    Ok(builder.build()?)
}

/// Maps a pulse's duty cycle onto the full range of a 16-bit sample.
fn duty_to_sample(pair: PulsePair) -> i16 {
    let duty = pair.high as f64 / pair.period().max(1) as f64;
    ((duty * 2.0 - 1.0) * i16::MAX as f64) as i16
}

fn spawn_capture(
    path: PathBuf,
    tick_rate: TickRate,
    events: crossbeam::channel::Receiver<ReplayServiceEvent>,
) -> std::thread::JoinHandle<anyhow::Result<u64>> {
    std::thread::spawn(move || {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: tick_rate.0 as u32,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec)?;
        let mut underruns = 0;
        while let Ok(event) = events.recv() {
            match event {
                ReplayServiceEvent::Replayed(pairs) => {
                    for pair in pairs {
                        writer.write_sample(duty_to_sample(pair))?;
                    }
                }
                ReplayServiceEvent::Underrun => underruns += 1,
                ReplayServiceEvent::Stopped { .. } => break,
                ReplayServiceEvent::Reset(..) => {}
            }
        }
        writer.finalize()?;
        Ok(underruns)
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.version {
        println!("amwave {}", amwave::app_version());
        return Ok(());
    }

    let configuration = configuration_from(&args)?;
    if args.dump_config {
        println!("{}", configuration.to_json_string()?);
        return Ok(());
    }
    let Some(input) = &args.input else {
        anyhow::bail!("no input file; see --help");
    };

    let mut source = WavSource::open(input)
        .with_context(|| format!("while opening {}", input.display()))?;
    let tick_rate = configuration.tick_rate();

    // About 4ms of pulses, so the replay thread's wakeups never starve it.
    let queue = ReplayQueue::new((tick_rate.0 as usize / 250).max(ReplayQueue::DEFAULT_CAPACITY));
    let mut service = ReplayHardwareService::new_with(
        queue.clone(),
        (!args.unpaced).then_some(tick_rate),
        args.capture.is_some(),
    );
    let capture = args
        .capture
        .clone()
        .map(|path| spawn_capture(path, tick_rate, service.receiver().clone()));

    let transmitter = Transmitter::new(configuration)?;
    let report = transmitter.run(&mut source, &queue);
    service.quit();

    let report = report?;
    eprintln!(
        "{}: {} samples in {} buffers, {:.1}s ({})",
        input.display(),
        report.samples_processed,
        report.buffers,
        report.elapsed.as_secs_f64(),
        report.reason
    );
    if let Some(capture) = capture {
        match capture.join() {
            Ok(result) => {
                let underruns = result?;
                if underruns > 0 {
                    eprintln!("{underruns} underrun(s) during replay");
                }
            }
            Err(_) => anyhow::bail!("capture thread panicked"),
        }
    }
    Ok(())
}
