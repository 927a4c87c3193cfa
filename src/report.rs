//! Offline reading of exported session logs.
//!
//! Parses the CSV written by [`crate::export`] back into samples and computes
//! the summary figures the companion plotting report needs, including the
//! tightened SOH axis.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

use crate::error::ExportError;
use crate::simulation::TelemetrySample;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Time_s")]
    time_s: f64,
    #[serde(rename = "Voltage_V")]
    voltage_v: f64,
    #[serde(rename = "Current_A")]
    current_a: f64,
    #[serde(rename = "Temperature_C")]
    temperature_c: f64,
    #[serde(rename = "Speed_kmh")]
    speed_kmh: f64,
    #[serde(rename = "SOC_Actual_pct")]
    soc_actual: f64,
    #[serde(rename = "SOC_Model_pct")]
    soc_model: f64,
    #[serde(rename = "SOC_Error_pct")]
    soc_error: f64,
    #[serde(rename = "SOH_Actual_pct")]
    soh_actual: f64,
    #[serde(rename = "SOH_Model_pct")]
    soh_model: f64,
    #[serde(rename = "SOH_Error_pct")]
    soh_error: f64,
}

impl From<CsvRow> for TelemetrySample {
    fn from(row: CsvRow) -> Self {
        Self {
            time_s: row.time_s,
            voltage_v: row.voltage_v,
            current_a: row.current_a,
            temperature_c: row.temperature_c,
            speed_kmh: row.speed_kmh,
            soc_actual: row.soc_actual,
            soc_model: row.soc_model,
            soc_error: row.soc_error,
            soh_actual: row.soh_actual,
            soh_model: row.soh_model,
            soh_error: row.soh_error,
        }
    }
}

pub fn read_session_csv<R: Read>(reader: R) -> Result<Vec<TelemetrySample>, ExportError> {
    let mut csv = csv::Reader::from_reader(reader);
    let mut samples = Vec::new();
    for row in csv.deserialize::<CsvRow>() {
        samples.push(row?.into());
    }
    Ok(samples)
}

pub fn load_session_csv(path: &Path) -> Result<Vec<TelemetrySample>, ExportError> {
    let file = std::fs::File::open(path)?;
    read_session_csv(std::io::BufReader::new(file))
}

/// Y-axis range for the SOH plot: `max(99.0, floor(min_soh * 10) / 10)` to `100.1`.
pub fn soh_axis_bounds(min_soh: f64) -> (f64, f64) {
    let lower = ((min_soh * 10.0).floor() / 10.0).max(99.0);
    (lower, 100.1)
}

/// (min, max) of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        values.fold(None, |acc, v| match acc {
            None => Some(Range { min: v, max: v }),
            Some(r) => Some(Range {
                min: r.min.min(v),
                max: r.max.max(v),
            }),
        })
    }
}

/// Summary of one exported session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub samples: usize,
    pub duration_s: f64,
    pub current_a: Range,
    pub voltage_v: Range,
    pub temperature_c: Range,
    pub final_soc: f64,
    pub final_soh: f64,
    pub mean_soc_error: f64,
    pub mean_soh_error: f64,
    pub soh_axis: (f64, f64),
}

impl ReportSummary {
    /// `None` for an empty log.
    pub fn from_samples(samples: &[TelemetrySample]) -> Option<Self> {
        let first = samples.first()?;
        let last = samples.last()?;
        let n = samples.len() as f64;

        let min_soh = samples
            .iter()
            .map(|s| s.soh_actual)
            .fold(f64::INFINITY, f64::min);

        Some(Self {
            samples: samples.len(),
            duration_s: last.time_s - first.time_s,
            current_a: Range::of(samples.iter().map(|s| s.current_a))?,
            voltage_v: Range::of(samples.iter().map(|s| s.voltage_v))?,
            temperature_c: Range::of(samples.iter().map(|s| s.temperature_c))?,
            final_soc: last.soc_actual,
            final_soh: last.soh_actual,
            mean_soc_error: samples.iter().map(|s| s.soc_error).sum::<f64>() / n,
            mean_soh_error: samples.iter().map(|s| s.soh_error).sum::<f64>() / n,
            soh_axis: soh_axis_bounds(min_soh),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::render_csv;
    use rstest::rstest;

    #[rstest]
    #[case(100.0, 99.0)]
    #[case(99.57, 99.5)]
    #[case(98.2, 99.0)]
    fn test_soh_axis_lower_bound(#[case] min_soh: f64, #[case] expected: f64) {
        let (lo, hi) = soh_axis_bounds(min_soh);
        assert!((lo - expected).abs() < 1e-9);
        assert_eq!(hi, 100.1);
    }

    fn sample(time_s: f64, current_a: f64, soh: f64) -> TelemetrySample {
        TelemetrySample {
            time_s,
            voltage_v: 370.0 - current_a * 0.1,
            current_a,
            temperature_c: 25.0 + time_s,
            speed_kmh: 10.0,
            soc_actual: 80.0 - time_s,
            soc_model: 80.5 - time_s,
            soc_error: 0.5,
            soh_actual: soh,
            soh_model: soh - 0.1,
            soh_error: 0.1,
        }
    }

    #[test]
    fn test_csv_read_back() {
        let samples = vec![sample(0.1, -10.0, 100.0), sample(0.2, -20.0, 99.9999)];
        let csv = render_csv(&samples).unwrap();
        let parsed = read_session_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!((parsed[1].current_a - -20.0).abs() < 1e-9);
        assert!((parsed[1].soh_actual - 99.9999).abs() < 1e-9);
    }

    #[test]
    fn test_summary() {
        let samples = vec![
            sample(0.1, -10.0, 100.0),
            sample(0.2, -40.0, 99.8),
            sample(0.3, 5.0, 99.7),
        ];
        let summary = ReportSummary::from_samples(&samples).unwrap();
        assert_eq!(summary.samples, 3);
        assert!((summary.duration_s - 0.2).abs() < 1e-9);
        assert_eq!(summary.current_a, Range { min: -40.0, max: 5.0 });
        assert_eq!(summary.final_soh, 99.7);
        assert!((summary.mean_soc_error - 0.5).abs() < 1e-12);
        assert!((summary.soh_axis.0 - 99.7).abs() < 1e-9);
        assert!(ReportSummary::from_samples(&[]).is_none());
    }
}
