use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::drivers::ExplorerError;

/// Streams a `Time,<label>...` table to disk, one row per sample index.
pub struct CsvRecorder {
    writer: BufWriter<File>,
    path: PathBuf,
    columns: usize,
    rows: usize,
}

impl CsvRecorder {
    pub fn create(path: &Path, labels: &[String]) -> Result<Self, ExplorerError> {
        let file = File::create(path).map_err(|err| ExplorerError::io(path, err))?;
        let mut recorder = Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            columns: labels.len(),
            rows: 0,
        };
        let mut header = String::from("Time");
        for label in labels {
            header.push(',');
            header.push_str(&escape_field(label));
        }
        recorder.write_line(&header)?;
        Ok(recorder)
    }

    /// Blank cells mark channels without a sample at this index.
    pub fn write_row(&mut self, time: f64, cells: &[Option<f64>]) -> Result<(), ExplorerError> {
        debug_assert_eq!(cells.len(), self.columns);
        let mut line = time.to_string();
        for cell in cells {
            line.push(',');
            if let Some(value) = cell {
                line.push_str(&value.to_string());
            }
        }
        self.write_line(&line)?;
        self.rows += 1;
        Ok(())
    }

    /// Flushes and returns the number of data rows written.
    pub fn finish(mut self) -> Result<usize, ExplorerError> {
        self.writer
            .flush()
            .map_err(|err| ExplorerError::io(&self.path, err))?;
        debug!("wrote {} rows to {}", self.rows, self.path.display());
        Ok(self.rows)
    }

    fn write_line(&mut self, line: &str) -> Result<(), ExplorerError> {
        writeln!(self.writer, "{line}").map_err(|err| ExplorerError::io(&self.path, err))
    }
}

/// Quote a header cell when it contains a delimiter, quote or line break.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(escape_field("Pressure (psi)"), "Pressure (psi)");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut recorder =
            CsvRecorder::create(&path, &["Temp (°C)".to_owned(), "x,y".to_owned()]).unwrap();
        recorder.write_row(0.0, &[Some(1.5), Some(-2.0)]).unwrap();
        recorder.write_row(0.1, &[None, Some(3.0)]).unwrap();
        assert_eq!(recorder.finish().unwrap(), 2);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Time,Temp (°C),\"x,y\"\n0,1.5,-2\n0.1,,3\n");
    }

    #[test]
    fn create_reports_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        assert!(matches!(
            CsvRecorder::create(&path, &[]),
            Err(ExplorerError::Io { .. })
        ));
    }
}
