// src/drivers/mod.rs
// Edges of the crate: file readers, error taxonomy, image rendering.
pub mod csv;
pub mod error;
pub mod plot;
pub mod source;

pub use csv::CsvReader;
pub use error::ExplorerError;
pub use plot::{render_plot_png, PlotStyle};
pub use source::{MemoryChannel, MemoryReader, MemoryWaveform, WaveformFile, WaveformReader};
