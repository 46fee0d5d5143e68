use serde::Serialize;

use crate::color::{Rgb, ANOMALY, NORMAL};
use crate::data::anomaly::partition;
use crate::data::model::{Reading, ReadingTable};

/// Map centre used when no reading has a position (Brussels).
pub const DEFAULT_CENTER: GeoPoint = GeoPoint { lat: 50.85, lon: 4.35 };

/// Initial zoom level, in web-map tile levels.
pub const DEFAULT_ZOOM: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Markers of one colour, each with its own hover text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerGroup {
    pub name: String,
    pub color: Rgb,
    pub points: Vec<GeoPoint>,
    pub hover: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFigure {
    pub title: String,
    pub center: GeoPoint,
    pub zoom: f64,
    pub groups: Vec<MarkerGroup>,
}

impl MapFigure {
    pub fn point_count(&self) -> usize {
        self.groups.iter().map(|g| g.points.len()).sum()
    }
}

/// Arithmetic mean of the positions, or [`DEFAULT_CENTER`] when empty.
pub fn center_of(points: impl IntoIterator<Item = GeoPoint>) -> GeoPoint {
    let (n, lat, lon) = points
        .into_iter()
        .fold((0usize, 0.0, 0.0), |(n, lat, lon), p| (n + 1, lat + p.lat, lon + p.lon));
    if n == 0 {
        DEFAULT_CENTER
    } else {
        GeoPoint {
            lat: lat / n as f64,
            lon: lon / n as f64,
        }
    }
}

fn position(r: &Reading) -> Option<GeoPoint> {
    r.position().map(|(lat, lon)| GeoPoint { lat, lon })
}

/// Hover text: vehicle, time, each flag column and outside temperature.
fn detailed_hover(r: &Reading, columns: &[String]) -> String {
    let mut text = format!(
        "Vehicle: {}\nTime: {}",
        r.vehicle_id,
        r.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    for column in columns {
        text.push_str(&format!("\n{column}: {}", r.attribute(column).unwrap_or("-")));
    }
    match r.outside_temp() {
        Some(t) => text.push_str(&format!("\nOutside temp: {t:.1} °C")),
        None => text.push_str("\nOutside temp: -"),
    }
    text
}

fn group(
    table: &ReadingTable,
    rows: &[usize],
    name: &str,
    color: Rgb,
    hover_text: impl Fn(&Reading) -> String,
) -> Option<MarkerGroup> {
    let (points, hover): (Vec<GeoPoint>, Vec<String>) = rows
        .iter()
        .filter_map(|&i| table.get(i))
        .filter_map(|r| Some((position(r)?, hover_text(r))))
        .unzip();
    (!points.is_empty()).then(|| MarkerGroup {
        name: name.to_string(),
        color,
        points,
        hover,
    })
}

/// Position map of `rows`.
///
/// Without `anomaly_columns` every row is a blue marker hovered by its
/// vehicle id. With them the rows are partitioned into red (anomalous) and
/// blue (normal) groups with detailed hover text; an empty side is omitted.
/// Rows without a position are not plotted and do not move the centre.
pub fn position_map(
    table: &ReadingTable,
    rows: &[usize],
    title: String,
    anomaly_columns: Option<&[String]>,
) -> MapFigure {
    let groups: Vec<MarkerGroup> = match anomaly_columns {
        None => group(table, rows, "Positions", NORMAL, |r| r.vehicle_id.clone())
            .into_iter()
            .collect(),
        Some(columns) => {
            let split = partition(table, rows, columns);
            let hover = |r: &Reading| detailed_hover(r, columns);
            [
                group(table, &split.anomalous, "Anomaly", ANOMALY, hover),
                group(table, &split.normal, "Normal", NORMAL, hover),
            ]
            .into_iter()
            .flatten()
            .collect()
        }
    };

    let center = center_of(groups.iter().flat_map(|g| g.points.iter().copied()));
    MapFigure {
        title,
        center,
        zoom: DEFAULT_ZOOM,
        groups,
    }
}
