// Copyright (c) 2024 Mike Tsao

use crate::{
    error::SourceError,
    traits::{AudioSource, SourceFormat},
    types::prelude::*,
};

/// An [AudioSource] backed by samples already in memory. Useful for synthetic
/// test signals.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    format: SourceFormat,
    samples: Vec<AudioSample>,
    position: usize,
    max_chunk: Option<usize>,
}
impl MemorySource {
    /// `samples` are interleaved according to `format.channels`. The frame
    /// count in `format` is filled in from the data.
    pub fn new(format: SourceFormat, samples: Vec<AudioSample>) -> Self {
        let frames = if format.channels == 0 {
            None
        } else {
            Some((samples.len() / format.channels as usize) as u64)
        };
        Self {
            format: SourceFormat { frames, ..format },
            samples,
            position: 0,
            max_chunk: None,
        }
    }

    /// A 16-bit mono source.
    pub fn mono(sample_rate: SampleRate, samples: Vec<AudioSample>) -> Self {
        Self::new(Self::format_with_channels(sample_rate, 1), samples)
    }

    /// A 16-bit stereo source of interleaved left/right pairs.
    pub fn stereo(sample_rate: SampleRate, samples: Vec<AudioSample>) -> Self {
        Self::new(Self::format_with_channels(sample_rate, 2), samples)
    }

    /// Limits every read to at most `max_chunk` samples, the way a slow
    /// device might.
    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = Some(max_chunk.max(1));
        self
    }

    fn format_with_channels(sample_rate: SampleRate, channels: u16) -> SourceFormat {
        SourceFormat {
            sample_rate,
            channels,
            bits_per_sample: 16,
            frames: None,
        }
    }

    /// Samples not yet read.
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}
impl AudioSource for MemorySource {
    fn format(&self) -> SourceFormat {
        self.format
    }

    fn read_chunk(&mut self, out: &mut [AudioSample]) -> Result<usize, SourceError> {
        let mut count = out.len().min(self.remaining());
        if let Some(max_chunk) = self.max_chunk {
            count = count.min(max_chunk);
        }
        out[..count].copy_from_slice(&self.samples[self.position..self.position + count]);
        self.position += count;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_in_chunks_then_ends() {
        let mut source = MemorySource::stereo(SampleRate::DEFAULT, (0..10).collect());
        assert_eq!(source.format().frames, Some(5));
        assert_eq!(source.format().channels, 2);

        let mut out = [0; 4];
        assert_eq!(source.read_chunk(&mut out).unwrap(), 4);
        assert_eq!(out, [0, 1, 2, 3]);
        assert_eq!(source.read_chunk(&mut out).unwrap(), 4);
        assert_eq!(source.read_chunk(&mut out).unwrap(), 2);
        assert_eq!(&out[..2], &[8, 9]);
        assert_eq!(source.read_chunk(&mut out).unwrap(), 0);
    }

    #[test]
    fn chunk_limit() {
        let mut source = MemorySource::mono(SampleRate::DEFAULT, vec![1; 10]).with_max_chunk(3);
        let mut out = [0; 8];
        assert_eq!(source.read_chunk(&mut out).unwrap(), 3);
        assert_eq!(source.remaining(), 7);
    }
}
