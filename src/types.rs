// src/types.rs
use serde::Serialize;

/// Summary of the loaded recording.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileInfo {
    pub filename: String,
    pub channel_count: usize,
    pub sample_count: usize,
    pub sample_rate: f64,
    /// Seconds.
    pub duration: f64,
}

// Controller -> presentation layer. One-way; the receiver only reads
// controller state in response.
#[derive(Clone, Debug, PartialEq)]
pub enum ControllerEvent {
    FileLoaded(FileInfo),
    ProcessingApplied { message: String, success: bool },
    DataReset(String),
    // Pull fresh plot data and redraw.
    PlotUpdate,
    Error(String),
}
