use std::fs;
use std::path::Path;

use log::debug;

use crate::drivers::source::{MemoryChannel, MemoryWaveform, WaveformReader};
use crate::drivers::ExplorerError;

/// Opens delimited waveform tables: a `Time` column followed by one column
/// per channel, headed `name (units)` or just `name`. This is the layout
/// the explorer exports, so exported files can be opened again.
#[derive(Clone, Copy, Debug, Default)]
pub struct CsvReader;

impl WaveformReader for CsvReader {
    type File = MemoryWaveform;

    fn open(&self, path: &Path) -> Result<MemoryWaveform, ExplorerError> {
        let text = fs::read_to_string(path).map_err(|err| ExplorerError::io(path, err))?;
        let waveform = parse_table(&text)?;
        debug!("parsed {} as a delimited waveform table", path.display());
        Ok(waveform)
    }
}

pub fn parse_table(text: &str) -> Result<MemoryWaveform, ExplorerError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| ExplorerError::Format("file is empty".into()))?;
    let header = split_record(header.trim_start_matches('\u{feff}'));
    if !header
        .first()
        .is_some_and(|first| first.trim().eq_ignore_ascii_case("time"))
    {
        return Err(ExplorerError::Format(
            "first column must be 'Time'".into(),
        ));
    }
    if header.len() < 2 {
        return Err(ExplorerError::Format("file contains no channels".into()));
    }

    let mut time = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); header.len() - 1];
    for (line_idx, line) in lines {
        let row = line_idx + 1;
        let cells = split_record(line);
        if cells.len() != header.len() {
            return Err(ExplorerError::Format(format!(
                "line {row}: expected {} cells, found {}",
                header.len(),
                cells.len()
            )));
        }
        let mut values = cells.iter().enumerate().map(|(col, cell)| {
            let cell = cell.trim();
            if cell.is_empty() {
                return Err(ExplorerError::Format(format!(
                    "line {row}: column {} is blank",
                    col + 1
                )));
            }
            cell.parse::<f64>().map_err(|_| {
                ExplorerError::Format(format!("line {row}: '{cell}' is not a number"))
            })
        });
        let t = values.next().unwrap_or(Ok(f64::NAN))?;
        if let Some(&previous) = time.last() {
            if t <= previous {
                return Err(ExplorerError::Format(format!(
                    "line {row}: time must increase ({t} after {previous})"
                )));
            }
        }
        time.push(t);
        for (column, value) in columns.iter_mut().zip(values) {
            column.push(value?);
        }
    }

    if time.len() < 2 {
        return Err(ExplorerError::Format(
            "at least two samples are needed to derive the time step".into(),
        ));
    }
    let time_step = time[1] - time[0];

    let channels = header[1..]
        .iter()
        .zip(columns)
        .map(|(heading, samples)| {
            let (name, unit) = split_heading(heading);
            MemoryChannel {
                samples,
                unit,
                annotation: Some(name),
            }
        })
        .collect();
    Ok(MemoryWaveform::with_time(time, time_step, channels))
}

/// `"Pressure (psi)"` -> `("Pressure", Some("psi"))`.
fn split_heading(heading: &str) -> (String, Option<String>) {
    let heading = heading.trim();
    if let Some(stripped) = heading.strip_suffix(')') {
        if let Some(open) = stripped.rfind(" (") {
            let unit = &stripped[open + 2..];
            if !unit.is_empty() && !unit.contains('(') {
                return (stripped[..open].to_owned(), Some(unit.to_owned()));
            }
        }
    }
    (heading.to_owned(), None)
}

/// Split one comma-separated record, honouring double-quoted cells.
pub fn split_record(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.is_empty() => in_quotes = true,
            ',' if !in_quotes => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::WaveformFile;
    use std::io::Write;

    #[test]
    fn parses_headers_units_and_samples() {
        let text = "Time,Temp (°C),\"Flow, main (L/min)\",Marker\n0,20.5,1,0\n0.5,21,2,1\n1.0,21.5,3,0\n";
        let wave = parse_table(text).unwrap();
        assert_eq!(wave.channel_count(), 3);
        assert_eq!(wave.sample_count(), 3);
        assert_eq!(wave.time_step(), 0.5);
        assert_eq!(wave.time(), vec![0.0, 0.5, 1.0]);
        assert_eq!(wave.annotation(1).unwrap(), "Temp");
        assert_eq!(wave.unit(1).unwrap(), "°C");
        assert_eq!(wave.annotation(2).unwrap(), "Flow, main");
        assert_eq!(wave.unit(2).unwrap(), "L/min");
        assert_eq!(wave.annotation(3).unwrap(), "Marker");
        assert!(wave.unit(3).is_err());
        assert_eq!(wave.samples(2).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn rejects_malformed_tables() {
        let cases = [
            "",
            "Seconds,A\n0,1\n1,2\n",
            "Time\n0\n1\n",
            "Time,A\n0,1\n",
            "Time,A\n0,1\n1\n",
            "Time,A\n0,1\n1,abc\n",
            "Time,A\n0,1\n1,\n",
            "Time,A\n0,1\n0,2\n",
        ];
        for text in cases {
            assert!(
                matches!(parse_table(text), Err(ExplorerError::Format(_))),
                "accepted {text:?}"
            );
        }
    }

    #[test]
    fn heading_and_record_splitting() {
        assert_eq!(split_heading("Speed (rpm)"), ("Speed".into(), Some("rpm".into())));
        assert_eq!(split_heading("Channel 4"), ("Channel 4".into(), None));
        assert_eq!(split_heading("f(x)"), ("f(x)".into(), None));
        assert_eq!(split_record("a,\"b,c\",\"d\"\"e\""), vec!["a", "b,c", "d\"e"]);
        assert_eq!(split_record("1,,3"), vec!["1", "", "3"]);
    }

    #[test]
    fn opens_files_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Time,A (V)\n0,1\n0.25,2\n").unwrap();
        let wave = CsvReader.open(file.path()).unwrap();
        assert_eq!(wave.time_step(), 0.25);
        assert!(matches!(
            CsvReader.open(Path::new("no/such/file.csv")),
            Err(ExplorerError::Io { .. })
        ));
    }
}
