use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use super::channel::Rgb;
use super::transform::NormalizeMethod;
use crate::drivers::ExplorerError;

/// tab10, the palette matplotlib cycles through by default.
pub const DEFAULT_PALETTE: [Rgb; 10] = [
    Rgb(0x1f, 0x77, 0xb4),
    Rgb(0xff, 0x7f, 0x0e),
    Rgb(0x2c, 0xa0, 0x2c),
    Rgb(0xd6, 0x27, 0x28),
    Rgb(0x94, 0x67, 0xbd),
    Rgb(0x8c, 0x56, 0x4b),
    Rgb(0xe3, 0x77, 0xc2),
    Rgb(0x7f, 0x7f, 0x7f),
    Rgb(0xbc, 0xbd, 0x22),
    Rgb(0x17, 0xbe, 0xcf),
];

/// Parameters the UI pre-fills in the processing panel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformDefaults {
    pub moving_average_window: usize,
    pub decimation_factor: usize,
    pub low_pass_cutoff_hz: f64,
    pub normalize_method: NormalizeMethod,
}

impl Default for TransformDefaults {
    fn default() -> Self {
        Self {
            moving_average_window: 10,
            decimation_factor: 2,
            low_pass_cutoff_hz: 10.0,
            normalize_method: NormalizeMethod::MinMax,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerSettings {
    pub palette: Vec<Rgb>,
    pub transforms: TransformDefaults,
    pub plot_width: u32,
    pub plot_panel_height: u32,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.to_vec(),
            transforms: TransformDefaults::default(),
            plot_width: 1200,
            plot_panel_height: 320,
        }
    }
}

impl ExplorerSettings {
    pub fn load(path: &Path) -> Result<Self, ExplorerError> {
        let text = fs::read_to_string(path).map_err(|err| ExplorerError::io(path, err))?;
        let mut settings: ExplorerSettings = serde_json::from_str(&text)
            .map_err(|err| ExplorerError::Format(format!("{}: {err}", path.display())))?;
        if settings.palette.is_empty() {
            settings.palette = DEFAULT_PALETTE.to_vec();
        }
        if settings.plot_width == 0 || settings.plot_panel_height == 0 {
            return Err(ExplorerError::Format(format!(
                "{}: plot_width and plot_panel_height must be positive",
                path.display()
            )));
        }
        Ok(settings)
    }

    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(ExplorerError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Self::default()
            }
            Err(err) => {
                warn!("ignoring settings file: {err}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{"palette": ["#000000", "#ffffff"], "transforms": {{"decimation_factor": 5}}}}"##
        )
        .unwrap();
        let settings = ExplorerSettings::load(file.path()).unwrap();
        assert_eq!(settings.palette, vec![Rgb(0, 0, 0), Rgb(255, 255, 255)]);
        assert_eq!(settings.transforms.decimation_factor, 5);
        assert_eq!(settings.transforms.moving_average_window, 10);
        assert_eq!(settings.plot_width, 1200);
    }

    #[test]
    fn empty_palette_falls_back_to_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"palette": []}}"#).unwrap();
        let settings = ExplorerSettings::load(file.path()).unwrap();
        assert_eq!(settings.palette, DEFAULT_PALETTE.to_vec());
    }

    #[test]
    fn zero_plot_size_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"plot_panel_height": 0}}"#).unwrap();
        assert!(matches!(
            ExplorerSettings::load(file.path()),
            Err(ExplorerError::Format(_))
        ));
        assert_eq!(
            ExplorerSettings::load_or_default(file.path()),
            ExplorerSettings::default()
        );
    }

    #[test]
    fn malformed_or_missing_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"palette": ["teal"]}}"#).unwrap();
        assert!(matches!(
            ExplorerSettings::load(file.path()),
            Err(ExplorerError::Format(_))
        ));
        assert_eq!(
            ExplorerSettings::load_or_default(file.path()),
            ExplorerSettings::default()
        );

        let missing = Path::new("definitely/not/here.json");
        assert!(matches!(
            ExplorerSettings::load(missing),
            Err(ExplorerError::Io { .. })
        ));
        assert_eq!(
            ExplorerSettings::load_or_default(missing),
            ExplorerSettings::default()
        );
    }
}
