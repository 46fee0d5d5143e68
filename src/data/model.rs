use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

/// Channel holding the latitude of a reading.
pub const LAT: &str = "lat";
/// Channel holding the longitude of a reading.
pub const LON: &str = "lon";
/// Channel holding the outside air temperature.
pub const OUTSIDE_TEMP: &str = "outside_temp";
/// Channel holding the vehicle speed. Never carries an anomaly flag.
pub const SPEED: &str = "speed";

// ---------------------------------------------------------------------------
// Reading – one row of the source file
// ---------------------------------------------------------------------------

/// One timestamped sensor/location sample for one vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub vehicle_id: String,
    pub timestamp: DateTime<Utc>,
    /// Province name, only present in the fleet dataset.
    pub province: Option<String>,
    /// Numeric cells: column_name → value. Empty cells are absent.
    pub values: BTreeMap<String, f64>,
    /// Non-numeric cells, including the `anomaly_*` flags.
    pub attributes: BTreeMap<String, String>,
}

impl Reading {
    pub fn value(&self, channel: &str) -> Option<f64> {
        self.values.get(channel).copied()
    }

    pub fn attribute(&self, column: &str) -> Option<&str> {
        self.attributes.get(column).map(String::as_str)
    }

    /// `(lat, lon)` when both coordinates are present and finite.
    pub fn position(&self) -> Option<(f64, f64)> {
        let lat = self.value(LAT)?;
        let lon = self.value(LON)?;
        (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
    }

    pub fn outside_temp(&self) -> Option<f64> {
        self.value(OUTSIDE_TEMP)
    }

    /// Seconds since the Unix epoch, used as the x coordinate of charts.
    pub fn x(&self) -> f64 {
        self.timestamp.timestamp_millis() as f64 / 1000.0
    }
}

// ---------------------------------------------------------------------------
// ReadingTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset, sorted by timestamp, with pre-computed indices.
///
/// Built once at startup and never mutated; every filter produces a view
/// (a list of row indices) into it.
#[derive(Debug, Clone, Default)]
pub struct ReadingTable {
    pub readings: Vec<Reading>,
    /// Vehicle ids in order of first appearance.
    pub vehicles: Vec<String>,
    pub provinces: BTreeSet<String>,
    /// Every column that carried at least one numeric value.
    pub numeric_columns: BTreeSet<String>,
}

impl ReadingTable {
    /// Sort the readings and build the column indices.
    ///
    /// The sort is stable, so rows sharing a timestamp keep their file order.
    pub fn from_readings(mut readings: Vec<Reading>) -> Self {
        readings.sort_by_key(|r| r.timestamp);

        let mut vehicles = Vec::new();
        let mut seen = BTreeSet::new();
        let mut provinces = BTreeSet::new();
        let mut numeric_columns = BTreeSet::new();

        for r in &readings {
            if seen.insert(r.vehicle_id.as_str()) {
                vehicles.push(r.vehicle_id.clone());
            }
            if let Some(p) = &r.province {
                provinces.insert(p.clone());
            }
            numeric_columns.extend(r.values.keys().cloned());
        }

        ReadingTable {
            readings,
            vehicles,
            provinces,
            numeric_columns,
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Reading> {
        self.readings.get(idx)
    }

    /// Earliest and latest timestamp, `None` for an empty table.
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.readings.first()?;
        let last = self.readings.last()?;
        Some((first.timestamp, last.timestamp))
    }

    /// Numeric columns whose name contains `needle`, e.g. every `PC1` sensor.
    pub fn channels_matching(&self, needle: &str) -> Vec<String> {
        self.numeric_columns
            .iter()
            .filter(|c| c.contains(needle))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(veh: &str, hour: u32) -> Reading {
        Reading {
            vehicle_id: veh.to_string(),
            timestamp: Utc.with_ymd_and_hms(2021, 1, 1, hour, 0, 0).unwrap(),
            province: None,
            values: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn sorts_and_keeps_first_appearance_order() {
        let table = ReadingTable::from_readings(vec![
            reading("190", 3),
            reading("180", 1),
            reading("190", 2),
        ]);
        let hours: Vec<_> = table
            .readings
            .iter()
            .map(|r| r.timestamp.format("%H").to_string())
            .collect();
        assert_eq!(hours, ["01", "02", "03"]);
        assert_eq!(table.vehicles, ["180", "190"]);
    }

    #[test]
    fn position_requires_both_coordinates() {
        let mut r = reading("180", 0);
        r.values.insert(LAT.into(), 50.0);
        assert_eq!(r.position(), None);
        r.values.insert(LON.into(), 4.0);
        assert_eq!(r.position(), Some((50.0, 4.0)));
    }

    #[test]
    fn empty_table_has_no_span() {
        assert!(ReadingTable::default().time_span().is_none());
    }
}
