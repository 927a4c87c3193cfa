//! Session log export.
//!
//! The session controller hands its finished [`SessionLog`] to a
//! [`SessionExporter`] when the session stops. [`CsvExporter`] writes the
//! fixed-schema CSV consumed by the offline report tooling.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ExportError;
use crate::simulation::{SessionLog, TelemetrySample};

/// Column header of the exported CSV. Offline tooling depends on this order.
pub const CSV_HEADER: [&str; 11] = [
    "Time_s",
    "Voltage_V",
    "Current_A",
    "Temperature_C",
    "Speed_kmh",
    "SOC_Actual_pct",
    "SOC_Model_pct",
    "SOC_Error_pct",
    "SOH_Actual_pct",
    "SOH_Model_pct",
    "SOH_Error_pct",
];

/// Receives a completed session log.
pub trait SessionExporter: Send {
    /// Persist the log and return where it went.
    fn export(&mut self, log: &SessionLog) -> Result<PathBuf, ExportError>;
}

/// File name for an export taken at `ts`: the ISO-8601 timestamp with `:` and
/// `.` replaced by `-`.
pub fn export_file_name(ts: DateTime<Utc>) -> String {
    let stamp = ts
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("battery_session_{stamp}.csv")
}

fn format_row(s: &TelemetrySample) -> [String; 11] {
    [
        format!("{:.3}", s.time_s),
        format!("{:.4}", s.voltage_v),
        format!("{:.3}", s.current_a),
        format!("{:.2}", s.temperature_c),
        format!("{:.2}", s.speed_kmh),
        format!("{:.4}", s.soc_actual),
        format!("{:.4}", s.soc_model),
        format!("{:.4}", s.soc_error),
        format!("{:.4}", s.soh_actual),
        format!("{:.4}", s.soh_model),
        format!("{:.4}", s.soh_error),
    ]
}

/// Write header plus one row per sample. An empty slice is rejected rather
/// than producing a header-only file.
pub fn write_csv<W: Write>(writer: W, samples: &[TelemetrySample]) -> Result<(), ExportError> {
    if samples.is_empty() {
        return Err(ExportError::EmptyLog);
    }

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for sample in samples {
        csv.write_record(format_row(sample))?;
    }
    csv.flush()?;
    Ok(())
}

/// In-memory CSV, e.g. for an HTTP download.
pub fn render_csv(samples: &[TelemetrySample]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(&mut buf, samples)?;
    Ok(String::from_utf8(buf)?)
}

/// Writes each session to a timestamped CSV file in `dir`.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SessionExporter for CsvExporter {
    fn export(&mut self, log: &SessionLog) -> Result<PathBuf, ExportError> {
        if log.is_empty() {
            return Err(ExportError::EmptyLog);
        }
        if self.dir.exists() && !self.dir.is_dir() {
            return Err(ExportError::Directory(self.dir.clone()));
        }
        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(export_file_name(Utc::now()));
        let file = fs::File::create(&path)?;
        write_csv(std::io::BufWriter::new(file), log.samples())?;

        info!(path = %path.display(), samples = log.len(), "session log exported");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(time_s: f64) -> TelemetrySample {
        TelemetrySample {
            time_s,
            voltage_v: 376.51234,
            current_a: -15.1,
            temperature_c: 25.004,
            speed_kmh: 6.4,
            soc_actual: 79.98447,
            soc_model: 80.5,
            soc_error: 0.51553,
            soh_actual: 99.99999,
            soh_model: 99.8,
            soh_error: 0.19999,
        }
    }

    #[test]
    fn test_file_name_has_no_colons_or_dots_in_stamp() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(
            export_file_name(ts),
            "battery_session_2026-03-14T09-26-53-000Z.csv"
        );
    }

    #[test]
    fn test_render_uses_fixed_precision() {
        let csv = render_csv(&[sample(0.1), sample(0.2)]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADER.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "0.100,376.5123,-15.100,25.00,6.40,79.9845,80.5000,0.5155,100.0000,99.8000,0.2000"
        );
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn test_empty_log_is_not_exported() {
        assert!(matches!(render_csv(&[]), Err(ExportError::EmptyLog)));

        let dir = tempfile::tempdir().unwrap();
        let mut exporter = CsvExporter::new(dir.path());
        assert!(matches!(
            exporter.export(&SessionLog::new()),
            Err(ExportError::EmptyLog)
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_exporter_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = CsvExporter::new(dir.path().join("exports"));
        let mut log = SessionLog::new();
        log.push(sample(0.1));
        log.push(sample(0.2));

        let path = exporter.export(&log).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("battery_session_"));
    }
}
