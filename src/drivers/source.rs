use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::drivers::ExplorerError;

/// An opened multi-channel recording. Channels are numbered from 1.
pub trait WaveformFile {
    fn channel_count(&self) -> usize;
    fn sample_count(&self) -> usize;
    /// Seconds between consecutive samples.
    fn time_step(&self) -> f64;
    fn time(&self) -> Vec<f64>;
    fn samples(&self, channel: u32) -> Result<Vec<f64>, ExplorerError>;
    /// May fail or return an empty string; callers fall back to defaults.
    fn unit(&self, channel: u32) -> Result<String, ExplorerError>;
    /// May fail or return an empty string; callers fall back to defaults.
    fn annotation(&self, channel: u32) -> Result<String, ExplorerError>;
}

/// Something that can open a recording from disk.
pub trait WaveformReader {
    type File: WaveformFile;

    fn open(&self, path: &Path) -> Result<Self::File, ExplorerError>;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryChannel {
    pub samples: Vec<f64>,
    pub unit: Option<String>,
    pub annotation: Option<String>,
}

/// Fully materialized recording, useful for tests and deterministic playback.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryWaveform {
    time_step: f64,
    time: Vec<f64>,
    channels: Vec<MemoryChannel>,
}

impl MemoryWaveform {
    /// Evenly spaced recording starting at t = 0.
    pub fn uniform(time_step: f64, channels: Vec<MemoryChannel>) -> Self {
        let len = channels.first().map(|c| c.samples.len()).unwrap_or(0);
        let time = (0..len).map(|i| i as f64 * time_step).collect();
        Self {
            time_step,
            time,
            channels,
        }
    }

    pub fn with_time(time: Vec<f64>, time_step: f64, channels: Vec<MemoryChannel>) -> Self {
        Self {
            time_step,
            time,
            channels,
        }
    }

    pub fn channel(
        samples: Vec<f64>,
        unit: Option<&str>,
        annotation: Option<&str>,
    ) -> MemoryChannel {
        MemoryChannel {
            samples,
            unit: unit.map(str::to_owned),
            annotation: annotation.map(str::to_owned),
        }
    }

    fn get(&self, channel: u32) -> Result<&MemoryChannel, ExplorerError> {
        (channel as usize)
            .checked_sub(1)
            .and_then(|idx| self.channels.get(idx))
            .ok_or_else(|| {
                ExplorerError::InvalidSelection(format!("channel {channel} does not exist"))
            })
    }
}

impl WaveformFile for MemoryWaveform {
    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn sample_count(&self) -> usize {
        self.time.len()
    }

    fn time_step(&self) -> f64 {
        self.time_step
    }

    fn time(&self) -> Vec<f64> {
        self.time.clone()
    }

    fn samples(&self, channel: u32) -> Result<Vec<f64>, ExplorerError> {
        Ok(self.get(channel)?.samples.clone())
    }

    fn unit(&self, channel: u32) -> Result<String, ExplorerError> {
        self.get(channel)?
            .unit
            .clone()
            .ok_or_else(|| ExplorerError::Format(format!("channel {channel} has no unit")))
    }

    fn annotation(&self, channel: u32) -> Result<String, ExplorerError> {
        self.get(channel)?
            .annotation
            .clone()
            .ok_or_else(|| ExplorerError::Format(format!("channel {channel} has no annotation")))
    }
}

/// Serves [`MemoryWaveform`]s registered under fake paths.
#[derive(Clone, Debug, Default)]
pub struct MemoryReader {
    files: HashMap<PathBuf, MemoryWaveform>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, file: MemoryWaveform) -> Self {
        self.insert(path, file);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, file: MemoryWaveform) {
        self.files.insert(path.into(), file);
    }
}

impl WaveformReader for MemoryReader {
    type File = MemoryWaveform;

    fn open(&self, path: &Path) -> Result<MemoryWaveform, ExplorerError> {
        self.files.get(path).cloned().ok_or_else(|| {
            ExplorerError::io(path, io::Error::new(io::ErrorKind::NotFound, "no such file"))
        })
    }
}
