// src/lib.rs
//! Multi-channel waveform explorer core: load a recording, transform channels
//! independently, group them into subplot panels and export the result.
pub mod controller;
pub mod drivers;
pub mod recorder;
pub mod types;
pub mod waveform;

pub use controller::Controller;
pub use drivers::{CsvReader, ExplorerError, PlotStyle, WaveformFile, WaveformReader};
pub use types::{ControllerEvent, FileInfo};
