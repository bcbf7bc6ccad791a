use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("no waveform file is loaded")]
    NotLoaded,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("invalid channel selection: {0}")]
    InvalidSelection(String),
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a valid waveform file: {0}")]
    Format(String),
    #[error("no channels to render; assign at least one channel to the primary or secondary axis")]
    NothingToRender,
    #[error("failed to render plot: {0}")]
    Plot(String),
}

impl ExplorerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExplorerError::Io {
            path: path.into(),
            source,
        }
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for ExplorerError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ExplorerError::Plot(format!("{value:?}"))
    }
}

impl From<image::ImageError> for ExplorerError {
    fn from(value: image::ImageError) -> Self {
        ExplorerError::Plot(value.to_string())
    }
}
