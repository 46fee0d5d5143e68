//! Chart builder: filtered rows → framework-neutral figures.
//!
//! Figures are plain data (`Serialize`) so the same view can be drawn by
//! `ui::plot` or exported as JSON.

pub mod map;

use serde::Serialize;

use crate::color::{generate_palette, ColorScale, Rgb, ANOMALY};
use crate::data::anomaly::channel_anomalies;
use crate::data::model::ReadingTable;

/// Derives the flag column of a channel, `None` when it has none.
pub type AnomalyColumnFn = fn(&str) -> Option<String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trace {
    /// Connected line, one per channel.
    Line {
        name: String,
        color: Rgb,
        points: Vec<[f64; 2]>,
    },
    /// Unconnected markers of a single colour.
    Markers {
        name: String,
        color: Rgb,
        points: Vec<[f64; 2]>,
    },
    /// Markers coloured by their own value through a continuous scale.
    ColorScatter {
        name: String,
        scale: ColorScale,
        points: Vec<[f64; 2]>,
    },
}

/// A time-series chart. x values are Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub traces: Vec<Trace>,
}

impl Figure {
    fn new(title: String, y_label: &str) -> Self {
        Figure {
            title,
            x_label: "Timestamps".into(),
            y_label: y_label.into(),
            traces: Vec::new(),
        }
    }

    /// The continuous scale of the first colour-scatter trace, for the legend bar.
    pub fn color_scale(&self) -> Option<ColorScale> {
        self.traces.iter().find_map(|t| match t {
            Trace::ColorScatter { scale, .. } => Some(*scale),
            _ => None,
        })
    }
}

/// `(x, y)` points of `channel` over `rows`; rows without a value are skipped.
fn series(table: &ReadingTable, rows: &[usize], channel: &str) -> Vec<[f64; 2]> {
    rows.iter()
        .filter_map(|&i| {
            let r = table.get(i)?;
            Some([r.x(), r.value(channel)?])
        })
        .collect()
}

/// One line chart for a group of channels.
///
/// Every channel becomes a line. When `anomaly_column` is given, each channel
/// it maps to a flag column also gets a red marker overlay restricted to the
/// flagged rows; an empty overlay adds no trace.
pub fn channel_chart(
    table: &ReadingTable,
    rows: &[usize],
    title: String,
    channels: &[String],
    anomaly_column: Option<AnomalyColumnFn>,
) -> Figure {
    let mut figure = Figure::new(title, "Value");
    let colors = generate_palette(channels.len());

    for (channel, color) in channels.iter().zip(colors) {
        figure.traces.push(Trace::Line {
            name: channel.clone(),
            color,
            points: series(table, rows, channel),
        });

        let Some(column) = anomaly_column.and_then(|derive| derive(channel)) else {
            continue;
        };
        let flagged = channel_anomalies(table, rows, &column);
        let points = series(table, &flagged, channel);
        if !points.is_empty() {
            figure.traces.push(Trace::Markers {
                name: format!("{channel} anomaly"),
                color: ANOMALY,
                points,
            });
        }
    }
    figure
}

/// Outside temperature over time, coloured by its own magnitude.
pub fn outside_temp_chart(table: &ReadingTable, rows: &[usize], subject: &str) -> Figure {
    let mut figure = Figure::new(format!("Outside temperature for {subject}"), "Temperature (°C)");
    let points: Vec<[f64; 2]> = rows
        .iter()
        .filter_map(|&i| {
            let r = table.get(i)?;
            Some([r.x(), r.outside_temp()?])
        })
        .collect();

    if let Some(scale) = ColorScale::spanning(points.iter().map(|p| p[1])) {
        figure.traces.push(Trace::ColorScatter {
            name: "Outside temperature".into(),
            scale,
            points,
        });
    }
    figure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use crate::data::anomaly::anomaly_column;
    use crate::data::loader::load_reader;

    const DATA: &str = "\
mapped_veh_id;timestamps_UTC;outside_temp;speed;RS_E_WatTemp_PC1;anomaly_RS_E_WatTemp_PC1
180;2021-01-01 00:00:00;3.5;10;80;No
180;2021-01-01 01:00:00;4.0;20;120;Yes
180;2021-01-01 02:00:00;;0;;No
";

    fn table() -> ReadingTable {
        load_reader(DATA.as_bytes(), &DataConfig::default()).unwrap()
    }

    fn channels() -> Vec<String> {
        vec!["RS_E_WatTemp_PC1".into(), "speed".into()]
    }

    fn flags() -> Option<AnomalyColumnFn> {
        Some(anomaly_column as AnomalyColumnFn)
    }

    fn name(trace: &Trace) -> &str {
        match trace {
            Trace::Line { name, .. } | Trace::Markers { name, .. } => name,
            Trace::ColorScatter { name, .. } => name,
        }
    }

    fn points(trace: &Trace) -> &[[f64; 2]] {
        match trace {
            Trace::Line { points, .. } | Trace::Markers { points, .. } => points,
            Trace::ColorScatter { points, .. } => points,
        }
    }

    #[test]
    fn one_line_per_channel_plus_anomaly_overlay() {
        let t = table();
        let rows: Vec<usize> = (0..t.len()).collect();
        let fig = channel_chart(&t, &rows, "PC1".into(), &channels(), flags());

        let names: Vec<_> = fig.traces.iter().map(name).collect();
        assert_eq!(names, ["RS_E_WatTemp_PC1", "RS_E_WatTemp_PC1 anomaly", "speed"]);
        assert_eq!(points(&fig.traces[0]).len(), 2);
        match &fig.traces[1] {
            Trace::Markers { points, color, .. } => {
                assert_eq!(*color, ANOMALY);
                assert_eq!(points, &vec![[t.readings[1].x(), 120.0]]);
            }
            other => panic!("expected markers, got {other:?}"),
        }
        assert_eq!(points(&fig.traces[2]).len(), 3);
    }

    #[test]
    fn no_overlay_without_deriver_or_flags() {
        let t = table();
        let fig = channel_chart(&t, &[0, 2], "PC1".into(), &channels(), flags());
        assert_eq!(fig.traces.len(), 2);

        let rows: Vec<usize> = (0..t.len()).collect();
        let fig = channel_chart(&t, &rows, "PC1".into(), &channels(), None);
        assert!(fig.traces.iter().all(|tr| matches!(tr, Trace::Line { .. })));
    }

    #[test]
    fn empty_rows_give_empty_lines() {
        let t = table();
        let fig = channel_chart(&t, &[], "PC1".into(), &channels(), flags());
        assert_eq!(fig.traces.len(), 2);
        assert!(fig.traces.iter().all(|tr| points(tr).is_empty()));
    }

    #[test]
    fn outside_temperature_scale() {
        let t = table();
        let rows: Vec<usize> = (0..t.len()).collect();
        let fig = outside_temp_chart(&t, &rows, "180");
        assert_eq!(fig.traces.len(), 1);
        let scale = fig.color_scale().unwrap();
        assert_eq!((scale.min, scale.max), (3.5, 4.0));

        assert!(outside_temp_chart(&t, &[], "180").traces.is_empty());
    }
}
