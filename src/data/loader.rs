use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::model::{Reading, ReadingTable};
use crate::config::DataConfig;

/// Typed failures while turning the source file into a [`ReadingTable`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("missing required column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: cannot parse timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },
    #[error("row {row}: empty vehicle id")]
    EmptyVehicleId { row: usize },
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the reading table from a delimiter-separated file.
pub fn load_file(path: &Path, config: &DataConfig) -> Result<ReadingTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening data file {}", path.display()))?;
    load_reader(file, config).with_context(|| format!("loading {}", path.display()))
}

/// Parse readings from any reader. The header row names the columns.
///
/// Column roles:
/// * `vehicle_column`, `timestamp_column` – required
/// * `province_column` – optional
/// * every other cell is numeric when it parses as `f64`, missing when
///   empty, and a text attribute otherwise (this is where `anomaly_*` flags land)
pub fn load_reader<R: Read>(reader: R, config: &DataConfig) -> Result<ReadingTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter_byte())
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let position = |name: &str| headers.iter().position(|h| h == name);
    let vehicle_idx = position(&config.vehicle_column)
        .ok_or_else(|| LoadError::MissingColumn(config.vehicle_column.clone()))?;
    let time_idx = position(&config.timestamp_column)
        .ok_or_else(|| LoadError::MissingColumn(config.timestamp_column.clone()))?;
    let province_idx = position(&config.province_column);

    let mut readings = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let vehicle_id = record.get(vehicle_idx).unwrap_or("");
        if vehicle_id.is_empty() {
            return Err(LoadError::EmptyVehicleId { row: row_no }.into());
        }

        let raw_time = record.get(time_idx).unwrap_or("");
        let timestamp = parse_timestamp(raw_time).ok_or_else(|| LoadError::BadTimestamp {
            row: row_no,
            value: raw_time.to_string(),
        })?;

        let province = province_idx
            .and_then(|i| record.get(i))
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let mut values = BTreeMap::new();
        let mut attributes = BTreeMap::new();
        for (col_idx, cell) in record.iter().enumerate() {
            if col_idx == vehicle_idx || col_idx == time_idx || Some(col_idx) == province_idx {
                continue;
            }
            let Some(col_name) = headers.get(col_idx) else {
                continue;
            };
            if cell.is_empty() {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(v) => {
                    values.insert(col_name.clone(), v);
                }
                Err(_) => {
                    attributes.insert(col_name.clone(), cell.to_string());
                }
            }
        }

        readings.push(Reading {
            vehicle_id: vehicle_id.to_string(),
            timestamp,
            province,
            values,
            attributes,
        });
    }

    let table = ReadingTable::from_readings(readings);
    if let Some((first, last)) = table.time_span() {
        log::info!(
            "Loaded {} readings for {} vehicles between {first} and {last}",
            table.len(),
            table.vehicles.len()
        );
    } else {
        log::warn!("Data file contains no readings");
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a timestamp cell. Values without an offset are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = "\
mapped_veh_id;timestamps_UTC;lat;lon;speed;anomaly_RS_E_OilPress_PC1
190;2021-01-01 00:30:00;50.1;4.1;5;No
180;2021-01-01 01:00:00;50.3;4.3;20;Yes
180;2021-01-01 00:00:00;50.2;4.2;;No
";

    #[test]
    fn loads_and_sorts_by_timestamp() {
        let table = load_reader(SAMPLE.as_bytes(), &DataConfig::default()).unwrap();
        assert_eq!(table.len(), 3);
        let order: Vec<_> = table.readings.iter().map(|r| r.x() as i64).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
        assert_eq!(table.vehicles, ["180", "190"]);
    }

    #[test]
    fn splits_numeric_and_text_cells() {
        let table = load_reader(SAMPLE.as_bytes(), &DataConfig::default()).unwrap();
        let first = &table.readings[0];
        assert_eq!(first.vehicle_id, "180");
        assert_eq!(first.value("speed"), None);
        assert_eq!(first.position(), Some((50.2, 4.2)));
        assert_eq!(first.attribute("anomaly_RS_E_OilPress_PC1"), Some("No"));
        assert!(table.numeric_columns.contains("speed"));
        assert!(!table.numeric_columns.contains("anomaly_RS_E_OilPress_PC1"));
    }

    #[test]
    fn bad_timestamp_is_fatal() {
        let text = "mapped_veh_id;timestamps_UTC\n180;yesterday\n";
        let err = load_reader(text.as_bytes(), &DataConfig::default()).unwrap_err();
        match err.downcast_ref::<LoadError>() {
            Some(LoadError::BadTimestamp { row, value }) => {
                assert_eq!(*row, 0);
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_timestamp_column_is_fatal() {
        let text = "mapped_veh_id;when\n180;2021-01-01\n";
        let err = load_reader(text.as_bytes(), &DataConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::MissingColumn(c)) if c == "timestamps_UTC"
        ));
    }

    #[test]
    fn missing_file_is_fatal() {
        let result = load_file(Path::new("/nonexistent/veh.csv"), &DataConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn reads_province_column() {
        let text = "\
mapped_veh_id;timestamps_UTC;province
180;2021-01-01;Liège
181;2021-01-01;
";
        let table = load_reader(text.as_bytes(), &DataConfig::default()).unwrap();
        assert_eq!(table.readings[0].province.as_deref(), Some("Liège"));
        assert_eq!(table.readings[1].province, None);
        assert_eq!(table.provinces.len(), 1);
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 1, 23, 7, 25, 8).unwrap();
        for s in [
            "2023-01-23 07:25:08",
            "2023-01-23T07:25:08",
            "2023-01-23T07:25:08Z",
            "2023-01-23 07:25:08+00:00",
            "2023-01-23 08:25:08+01:00",
        ] {
            assert_eq!(parse_timestamp(s), Some(expected), "{s}");
        }
        assert_eq!(
            parse_timestamp("2023-01-23"),
            Some(Utc.with_ymd_and_hms(2023, 1, 23, 0, 0, 0).unwrap())
        );
        assert!(parse_timestamp("23/01/2023").is_none());
    }
}
