//! Owns the loaded recording and every piece of mutable state derived from it.
//!
//! Each channel keeps its recorded samples untouched; the working samples are
//! always rebuilt from them, so applying a transform never stacks on top of a
//! previous one. All state changes are announced as [`ControllerEvent`]s.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::mpsc::Sender;

use log::{debug, info, warn};

use crate::drivers::{render_plot_png, ExplorerError, PlotStyle, WaveformFile, WaveformReader};
use crate::recorder::CsvRecorder;
use crate::types::{ControllerEvent, FileInfo};
use crate::waveform::{
    group_channels, Axis, ChannelColor, ChannelConfig, ChannelStatistics, PlotFrame,
    ProcessingLedger, RenderPlan, Rgb, Trace, Transform, DEFAULT_PALETTE,
};

pub const NO_PROCESSING: &str = "No processing applied";
pub const RESET_MESSAGE: &str = "Reset to original data";

struct ChannelSeries {
    original: Vec<f64>,
    working: Vec<f64>,
    /// Original sample indices between consecutive working samples.
    stride: usize,
}

impl ChannelSeries {
    fn new(samples: Vec<f64>) -> Self {
        Self {
            working: samples.clone(),
            original: samples,
            stride: 1,
        }
    }

    fn sample_at(&self, index: usize) -> Option<f64> {
        if index % self.stride != 0 {
            return None;
        }
        self.working.get(index / self.stride).copied()
    }
}

struct LoadedFile {
    filename: String,
    time_step: f64,
    time: Vec<f64>,
    series: BTreeMap<u32, ChannelSeries>,
    configs: BTreeMap<u32, ChannelConfig>,
    ledger: ProcessingLedger,
}

impl LoadedFile {
    fn read<F: WaveformFile>(path: &Path, file: &F) -> Result<Self, ExplorerError> {
        let channel_count = u32::try_from(file.channel_count())
            .map_err(|_| ExplorerError::Format("channel count out of range".into()))?;
        if channel_count == 0 {
            return Err(ExplorerError::Format("file contains no channels".into()));
        }
        let time_step = file.time_step();
        if !time_step.is_finite() || time_step <= 0.0 {
            return Err(ExplorerError::Format(format!(
                "time step must be positive, got {time_step}"
            )));
        }
        let sample_count = file.sample_count();
        let time = file.time();
        if time.len() != sample_count {
            return Err(ExplorerError::Format(format!(
                "time axis has {} values for {sample_count} samples",
                time.len()
            )));
        }
        if time.windows(2).any(|w| w[1] < w[0]) {
            return Err(ExplorerError::Format("time axis goes backwards".into()));
        }

        let mut series = BTreeMap::new();
        let mut configs = BTreeMap::new();
        for channel in 1..=channel_count {
            let samples = file.samples(channel)?;
            if samples.len() != sample_count {
                return Err(ExplorerError::Format(format!(
                    "channel {channel} has {} samples, expected {sample_count}",
                    samples.len()
                )));
            }
            let name = file
                .annotation(channel)
                .map_err(|err| debug!("channel {channel}: no annotation ({err})"))
                .ok();
            let units = file
                .unit(channel)
                .map_err(|err| debug!("channel {channel}: no unit ({err})"))
                .ok();
            let config = ChannelConfig::new(channel, name.as_deref(), units.as_deref(), None)?;
            configs.insert(channel, config);
            series.insert(channel, ChannelSeries::new(samples));
        }

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            filename,
            time_step,
            time,
            ledger: ProcessingLedger::new(series.keys().copied()),
            series,
            configs,
        })
    }

    fn info(&self) -> FileInfo {
        let sample_count = self.time.len();
        FileInfo {
            filename: self.filename.clone(),
            channel_count: self.configs.len(),
            sample_count,
            sample_rate: 1.0 / self.time_step,
            duration: sample_count as f64 * self.time_step,
        }
    }

    fn require_channel(&self, channel: u32) -> Result<(), ExplorerError> {
        if self.series.contains_key(&channel) {
            Ok(())
        } else {
            Err(unknown_channel(channel))
        }
    }

    fn restore(&mut self) {
        for series in self.series.values_mut() {
            series.working.clone_from(&series.original);
            series.stride = 1;
        }
        self.ledger.clear();
    }

    fn write_csv(&self, path: &Path) -> Result<usize, ExplorerError> {
        let labels: Vec<String> = self.configs.values().map(ChannelConfig::label).collect();
        let mut recorder = CsvRecorder::create(path, &labels)?;
        let mut cells = Vec::with_capacity(self.series.len());
        for (index, &t) in self.time.iter().enumerate() {
            cells.clear();
            cells.extend(self.series.values().map(|s| s.sample_at(index)));
            if cells.iter().any(Option::is_some) {
                recorder.write_row(t, &cells)?;
            }
        }
        recorder.finish()
    }
}

fn unknown_channel(channel: u32) -> ExplorerError {
    ExplorerError::InvalidSelection(format!("channel {channel} does not exist"))
}

fn describe_channels(channels: &BTreeSet<u32>) -> String {
    let list = channels
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if channels.len() == 1 {
        format!("channel {list}")
    } else {
        format!("channels {list}")
    }
}

/// Single-threaded owner of all state for one loaded recording.
pub struct Controller<R: WaveformReader> {
    reader: R,
    events: Sender<ControllerEvent>,
    palette: Vec<Rgb>,
    loaded: Option<LoadedFile>,
    history: Vec<String>,
}

impl<R: WaveformReader> Controller<R> {
    pub fn new(reader: R, events: Sender<ControllerEvent>) -> Self {
        Self {
            reader,
            events,
            palette: DEFAULT_PALETTE.to_vec(),
            loaded: None,
            history: Vec::new(),
        }
    }

    pub fn with_palette(mut self, palette: Vec<Rgb>) -> Self {
        if !palette.is_empty() {
            self.palette = palette;
        }
        self
    }

    /// Replace all state with the contents of `path`. On failure nothing changes.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<FileInfo, ExplorerError> {
        let path = path.as_ref();
        let result = self
            .reader
            .open(path)
            .and_then(|file| LoadedFile::read(path, &file));
        let loaded = self.report("Failed to load file", result)?;
        let info = loaded.info();
        info!(
            "loaded {} ({} channels, {} samples at {} Hz)",
            info.filename, info.channel_count, info.sample_count, info.sample_rate
        );
        self.loaded = Some(loaded);
        self.history.clear();
        self.emit(ControllerEvent::FileLoaded(info.clone()));
        self.emit(ControllerEvent::PlotUpdate);
        Ok(info)
    }

    /// Restore `channels` to their recorded samples and apply `transform`.
    /// Either every selected channel is updated or none is.
    pub fn apply_transform(
        &mut self,
        transform: Transform,
        channels: &[u32],
    ) -> Result<(), ExplorerError> {
        let result = self.try_apply(transform, channels);
        let message = self.report(&format!("Failed to apply {transform}"), result)?;
        self.emit(ControllerEvent::ProcessingApplied {
            message,
            success: true,
        });
        self.emit(ControllerEvent::PlotUpdate);
        Ok(())
    }

    fn try_apply(&mut self, transform: Transform, channels: &[u32]) -> Result<String, ExplorerError> {
        let loaded = self.loaded.as_mut().ok_or(ExplorerError::NotLoaded)?;
        if channels.is_empty() {
            return Err(ExplorerError::InvalidSelection("no channels selected".into()));
        }
        let selected: BTreeSet<u32> = channels.iter().copied().collect();
        for &channel in &selected {
            loaded.require_channel(channel)?;
        }
        transform.validate()?;

        // Compute every output before committing any of them.
        let outputs = selected
            .iter()
            .map(|channel| {
                let original = &loaded.series[channel].original;
                transform.apply(original).map(|out| (*channel, out))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let stride = transform.stride();
        for (channel, out) in outputs {
            debug!("channel {channel}: {transform} -> {} samples", out.len());
            if let Some(series) = loaded.series.get_mut(&channel) {
                series.working = out;
                series.stride = stride;
            }
            loaded.ledger.record(channel, transform);
        }

        let message = format!("Applied {transform} to {}", describe_channels(&selected));
        info!("{message}");
        self.history.push(message.clone());
        Ok(message)
    }

    pub fn reset(&mut self) -> Result<(), ExplorerError> {
        let result = match self.loaded.as_mut() {
            Some(loaded) => {
                loaded.restore();
                Ok(())
            }
            None => Err(ExplorerError::NotLoaded),
        };
        self.report("Failed to reset data", result)?;
        info!("{RESET_MESSAGE}");
        self.history.clear();
        self.history.push(RESET_MESSAGE.to_owned());
        self.emit(ControllerEvent::DataReset(RESET_MESSAGE.to_owned()));
        self.emit(ControllerEvent::PlotUpdate);
        Ok(())
    }

    pub fn update_axis(&mut self, channel: u32, axis: Axis) -> Result<(), ExplorerError> {
        self.update_config(channel, |config| {
            config.axis = axis;
            Ok(())
        })
    }

    /// Move every channel in `channels` to `axis`. Unknown channels reject
    /// the whole batch.
    pub fn update_axes(&mut self, channels: &[u32], axis: Axis) -> Result<(), ExplorerError> {
        let result = self
            .loaded
            .as_mut()
            .ok_or(ExplorerError::NotLoaded)
            .and_then(|loaded| {
                if channels.is_empty() {
                    return Err(ExplorerError::InvalidSelection("no channels selected".into()));
                }
                for &channel in channels {
                    loaded.require_channel(channel)?;
                }
                for channel in channels {
                    if let Some(config) = loaded.configs.get_mut(channel) {
                        config.axis = axis;
                    }
                }
                Ok(())
            });
        self.report(&format!("Failed to move channels to {axis}"), result)?;
        debug!("channels {channels:?} moved to {axis}");
        self.emit(ControllerEvent::PlotUpdate);
        Ok(())
    }

    pub fn update_subplot(&mut self, channel: u32, subplot: u32) -> Result<(), ExplorerError> {
        self.update_config(channel, |config| {
            if subplot == 0 {
                return Err(ExplorerError::InvalidParameter(
                    "subplot must be at least 1".into(),
                ));
            }
            config.subplot = subplot;
            Ok(())
        })
    }

    pub fn update_color(&mut self, channel: u32, color: ChannelColor) -> Result<(), ExplorerError> {
        self.update_config(channel, |config| {
            config.color = color;
            Ok(())
        })
    }

    fn update_config(
        &mut self,
        channel: u32,
        change: impl FnOnce(&mut ChannelConfig) -> Result<(), ExplorerError>,
    ) -> Result<(), ExplorerError> {
        let result = self
            .loaded
            .as_mut()
            .ok_or(ExplorerError::NotLoaded)
            .and_then(|loaded| {
                loaded
                    .configs
                    .get_mut(&channel)
                    .ok_or_else(|| unknown_channel(channel))
            })
            .and_then(change);
        self.report(&format!("Failed to update channel {channel}"), result)?;
        self.emit(ControllerEvent::PlotUpdate);
        Ok(())
    }

    /// Write `Time` plus every channel's working samples, hidden ones included.
    /// Returns the number of data rows.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<usize, ExplorerError> {
        let path = path.as_ref();
        let result = self
            .loaded
            .as_ref()
            .ok_or(ExplorerError::NotLoaded)
            .and_then(|loaded| loaded.write_csv(path));
        let rows = self.report("Failed to export data", result)?;
        info!("exported {rows} rows to {}", path.display());
        Ok(rows)
    }

    pub fn export_plot(&self, path: impl AsRef<Path>, style: &PlotStyle) -> Result<(), ExplorerError> {
        let path = path.as_ref();
        let result = self
            .plot_frame()
            .and_then(|frame| render_plot_png(&frame, style))
            .and_then(|png| fs::write(path, png).map_err(|err| ExplorerError::io(path, err)));
        self.report("Failed to export plot", result)?;
        info!("saved plot to {}", path.display());
        Ok(())
    }

    /// Recomputed from the working samples on every call.
    pub fn statistics(&self) -> Result<BTreeMap<u32, ChannelStatistics>, ExplorerError> {
        let result = self
            .loaded
            .as_ref()
            .ok_or(ExplorerError::NotLoaded)
            .map(|loaded| {
                loaded
                    .configs
                    .iter()
                    .filter_map(|(channel, config)| {
                        let series = loaded.series.get(channel)?;
                        Some((*channel, ChannelStatistics::compute(config, &series.working)))
                    })
                    .collect()
            });
        self.report("Failed to compute statistics", result)
    }

    /// Current panels and colors. Queried on every redraw, so failures are
    /// returned without being broadcast.
    pub fn render_plan(&self) -> Result<RenderPlan, ExplorerError> {
        let loaded = self.loaded.as_ref().ok_or(ExplorerError::NotLoaded)?;
        group_channels(&loaded.configs, &self.palette)
    }

    pub fn plot_frame(&self) -> Result<PlotFrame<'_>, ExplorerError> {
        let loaded = self.loaded.as_ref().ok_or(ExplorerError::NotLoaded)?;
        let plan = group_channels(&loaded.configs, &self.palette)?;
        let traces = loaded
            .configs
            .iter()
            .filter_map(|(channel, config)| {
                let series = loaded.series.get(channel)?;
                Some((
                    *channel,
                    Trace {
                        channel: *channel,
                        label: config.label(),
                        stride: series.stride,
                        time: &loaded.time,
                        values: &series.working,
                    },
                ))
            })
            .collect();
        Ok(PlotFrame {
            filename: &loaded.filename,
            plan,
            traces,
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn file_info(&self) -> Option<FileInfo> {
        self.loaded.as_ref().map(LoadedFile::info)
    }

    pub fn channel_configs(&self) -> impl Iterator<Item = &ChannelConfig> {
        self.loaded.iter().flat_map(|loaded| loaded.configs.values())
    }

    pub fn channel_config(&self, channel: u32) -> Option<&ChannelConfig> {
        self.loaded.as_ref()?.configs.get(&channel)
    }

    /// File-level time axis. Decimated channels use [`Self::channel_time`].
    pub fn time(&self) -> Option<&[f64]> {
        self.loaded.as_ref().map(|loaded| loaded.time.as_slice())
    }

    pub fn channel_time(&self, channel: u32) -> Option<Vec<f64>> {
        let loaded = self.loaded.as_ref()?;
        let series = loaded.series.get(&channel)?;
        Some(
            loaded
                .time
                .iter()
                .step_by(series.stride)
                .take(series.working.len())
                .copied()
                .collect(),
        )
    }

    pub fn original(&self, channel: u32) -> Option<&[f64]> {
        let series = self.loaded.as_ref()?.series.get(&channel)?;
        Some(&series.original)
    }

    pub fn working(&self, channel: u32) -> Option<&[f64]> {
        let series = self.loaded.as_ref()?.series.get(&channel)?;
        Some(&series.working)
    }

    pub fn ledger(&self) -> Option<&ProcessingLedger> {
        self.loaded.as_ref().map(|loaded| &loaded.ledger)
    }

    pub fn processing_summary(&self, channel: u32) -> String {
        self.ledger()
            .map(|ledger| ledger.summary(channel))
            .unwrap_or_else(|| "None".to_owned())
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn current_status(&self) -> &str {
        self.history.last().map(String::as_str).unwrap_or(NO_PROCESSING)
    }

    pub fn palette(&self) -> &[Rgb] {
        &self.palette
    }

    pub fn default_export_name(&self, suffix: &str) -> String {
        format!("{}{suffix}.csv", self.file_stem().unwrap_or("export"))
    }

    pub fn default_plot_name(&self, suffix: &str) -> String {
        format!("{}{suffix}.png", self.file_stem().unwrap_or("plot"))
    }

    fn file_stem(&self) -> Option<&str> {
        let name = self.loaded.as_ref()?.filename.as_str();
        Some(name.rsplit_once('.').map_or(name, |(stem, _)| stem))
    }

    fn report<T>(&self, context: &str, result: Result<T, ExplorerError>) -> Result<T, ExplorerError> {
        if let Err(err) = &result {
            let message = format!("{context}: {err}");
            warn!("{message}");
            self.emit(ControllerEvent::Error(message));
        }
        result
    }

    fn emit(&self, event: ControllerEvent) {
        if self.events.send(event).is_err() {
            debug!("controller event dropped: receiver is gone");
        }
    }
}
