// Copyright (c) 2024 Mike Tsao

use crate::{
    error::SourceError,
    traits::{AudioSource, SourceFormat},
    types::prelude::*,
};
use hound::{SampleFormat, WavReader};
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

/// An [AudioSource] that streams 16-bit integer PCM from a WAV container.
pub struct WavSource<R: Read> {
    reader: WavReader<R>,
    format: SourceFormat,
}
impl<R: Read> core::fmt::Debug for WavSource<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WavSource")
            .field("reader", &"(skipped)")
            .field("format", &self.format)
            .finish()
    }
}
impl WavSource<BufReader<File>> {
    /// Opens a WAV file on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}
impl<R: Read> WavSource<R> {
    /// Parses the header. Anything but 16-bit integer PCM with one or two
    /// channels is rejected here, before any samples are read.
    pub fn new(reader: R) -> Result<Self, SourceError> {
        let reader = WavReader::new(reader)?;
        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int
            || spec.bits_per_sample != 16
            || !(1..=2).contains(&spec.channels)
        {
            return Err(SourceError::UnsupportedFormat {
                channels: spec.channels,
                bits_per_sample: spec.bits_per_sample,
                encoding: match spec.sample_format {
                    SampleFormat::Int => "integer PCM",
                    SampleFormat::Float => "floating-point PCM",
                },
            });
        }
        let format = SourceFormat {
            sample_rate: SampleRate::new(spec.sample_rate),
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            frames: Some(reader.duration() as u64),
        };
        log::debug!(
            "WAV source: {} Hz, {} channel(s), {} frames",
            spec.sample_rate,
            spec.channels,
            reader.duration()
        );
        Ok(Self { reader, format })
    }
}
impl<R: Read> AudioSource for WavSource<R> {
    fn format(&self) -> SourceFormat {
        self.format
    }

    fn read_chunk(&mut self, out: &mut [AudioSample]) -> Result<usize, SourceError> {
        let mut count = 0;
        for (slot, sample) in out.iter_mut().zip(self.reader.samples::<i16>()) {
            *slot = sample?;
            count += 1;
        }
        Ok(count)
    }
}
