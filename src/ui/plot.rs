use std::collections::BTreeMap;

use chrono::DateTime;
use eframe::egui::{self, Color32, Ui};
use egui_plot::{Legend, Line, Plot, PlotBounds, PlotPoint, PlotPoints, Points};

use crate::chart::map::{GeoPoint, MapFigure};
use crate::chart::{Figure, Trace};
use crate::color::{viridis, ColorScale};
use crate::state::AppState;

/// Number of discrete colours a colour-scale trace is drawn with.
const SCALE_BINS: usize = 32;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the current view: every chart, then the map.
pub fn view(ui: &mut Ui, state: &mut AppState) {
    if state.table.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("The data file contains no readings");
        });
        return;
    }

    let reset = std::mem::take(&mut state.reset_plots);
    if state.view.rows == 0 {
        ui.label(egui::RichText::new("No readings match the selection.").italics());
    }

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (idx, figure) in state.view.charts.iter().enumerate() {
                chart(ui, idx, figure, reset);
                ui.add_space(12.0);
            }
            if let Some(map) = &state.view.map {
                map_plot(ui, map, reset);
            }
        });
}

fn format_time(secs: f64) -> String {
    DateTime::from_timestamp(secs.floor() as i64, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Time-series charts
// ---------------------------------------------------------------------------

fn chart(ui: &mut Ui, idx: usize, figure: &Figure, reset: bool) {
    ui.heading(&figure.title);

    let mut plot = Plot::new(("chart", idx))
        .height(260.0)
        .legend(Legend::default())
        .x_axis_label(figure.x_label.as_str())
        .y_axis_label(figure.y_label.as_str())
        .x_axis_formatter(|mark, _range| format_time(mark.value))
        .label_formatter(|name, value: &PlotPoint| {
            if name.is_empty() {
                format!("{}\n{:.2}", format_time(value.x), value.y)
            } else {
                format!("{name}\n{}\n{:.2}", format_time(value.x), value.y)
            }
        });
    if reset {
        plot = plot.reset();
    }

    plot.show(ui, |plot_ui| {
        for trace in &figure.traces {
            match trace {
                Trace::Line {
                    name,
                    color,
                    points,
                } => {
                    let line = Line::new(PlotPoints::from(points.clone()))
                        .name(name)
                        .color(Color32::from(*color))
                        .width(1.5);
                    plot_ui.line(line);
                }
                Trace::Markers {
                    name,
                    color,
                    points,
                } => {
                    let markers = Points::new(PlotPoints::from(points.clone()))
                        .name(name)
                        .color(Color32::from(*color))
                        .radius(3.5);
                    plot_ui.points(markers);
                }
                Trace::ColorScatter {
                    name,
                    scale,
                    points,
                } => {
                    // egui_plot draws one colour per item, so bucket the scale.
                    for (bin, pts) in bin_by_color(scale, points) {
                        let t = bin as f64 / (SCALE_BINS - 1) as f64;
                        let markers = Points::new(PlotPoints::from(pts))
                            .name(name)
                            .color(Color32::from(viridis(t)))
                            .radius(4.0);
                        plot_ui.points(markers);
                    }
                }
            }
        }
    });

    if let Some(scale) = figure.color_scale() {
        color_bar(ui, scale);
    }
}

fn bin_by_color(scale: &ColorScale, points: &[[f64; 2]]) -> BTreeMap<usize, Vec<[f64; 2]>> {
    let mut bins: BTreeMap<usize, Vec<[f64; 2]>> = BTreeMap::new();
    for p in points {
        let bin = (scale.normalize(p[1]) * (SCALE_BINS - 1) as f64).round() as usize;
        bins.entry(bin.min(SCALE_BINS - 1)).or_default().push(*p);
    }
    bins
}

/// Horizontal legend strip for a continuous colour scale.
fn color_bar(ui: &mut Ui, scale: ColorScale) {
    const STEPS: usize = 64;
    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("{:.1}", scale.min));
        let (rect, _) = ui.allocate_exact_size(egui::vec2(240.0, 12.0), egui::Sense::hover());
        let painter = ui.painter_at(rect);
        let step = rect.width() / STEPS as f32;
        for i in 0..STEPS {
            let t = i as f64 / (STEPS - 1) as f64;
            let min = egui::pos2(rect.left() + i as f32 * step, rect.top());
            painter.rect_filled(
                egui::Rect::from_min_size(min, egui::vec2(step + 0.5, rect.height())),
                0.0,
                Color32::from(viridis(t)),
            );
        }
        ui.label(format!("{:.1}", scale.max));
    });
}

// ---------------------------------------------------------------------------
// Position map
// ---------------------------------------------------------------------------

/// Hover text of the marker nearest to `value` in the group called `name`.
///
/// Longitude differences are shrunk by `cos(lat)` like the plot aspect, so
/// the pick matches the marker nearest on screen.
fn nearest_hover(map: &MapFigure, name: &str, value: &PlotPoint) -> String {
    let Some(group) = map.groups.iter().find(|g| g.name == name) else {
        return format!("{:.4}, {:.4}", value.y, value.x);
    };
    let lon_scale = map.center.lat.to_radians().cos().max(0.1);
    let dist = |p: &GeoPoint| ((p.lon - value.x) * lon_scale).powi(2) + (p.lat - value.y).powi(2);
    group
        .points
        .iter()
        .zip(&group.hover)
        .min_by(|(a, _), (b, _)| dist(a).total_cmp(&dist(b)))
        .map(|(_, text)| text.clone())
        .unwrap_or_default()
}

fn map_plot(ui: &mut Ui, map: &MapFigure, reset: bool) {
    ui.heading(&map.title);

    // Keep a degree of longitude and latitude the same length on screen.
    let aspect = 1.0 / map.center.lat.to_radians().cos().max(0.1);
    let span = 360.0 / 2f64.powf(map.zoom);

    let mut plot = Plot::new("position_map")
        .height(420.0)
        .data_aspect(aspect as f32)
        .legend(Legend::default())
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .label_formatter(|name, value: &PlotPoint| nearest_hover(map, name, value));
    if reset {
        plot = plot.reset();
    }

    plot.show(ui, |plot_ui| {
        for group in &map.groups {
            let points: Vec<[f64; 2]> = group.points.iter().map(|p| [p.lon, p.lat]).collect();
            let markers = Points::new(PlotPoints::from(points))
                .name(&group.name)
                .color(Color32::from(group.color))
                .radius(4.0);
            plot_ui.points(markers);
        }
        if reset {
            let c = map.center;
            plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                [c.lon - span * aspect / 2.0, c.lat - span / 2.0],
                [c.lon + span * aspect / 2.0, c.lat + span / 2.0],
            ));
        }
    });

    ui.hyperlink_to("© OpenStreetMap contributors", "https://www.openstreetmap.org/copyright");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::map::{MarkerGroup, DEFAULT_ZOOM};
    use crate::color::NORMAL;

    #[test]
    fn bins_cover_scale_ends() {
        let scale = ColorScale { min: 0.0, max: 10.0 };
        let bins = bin_by_color(&scale, &[[0.0, 0.0], [1.0, 10.0], [2.0, 10.0], [3.0, 5.0]]);
        assert_eq!(bins[&0].len(), 1);
        assert_eq!(bins[&(SCALE_BINS - 1)].len(), 2);
        assert_eq!(bins.values().map(Vec::len).sum::<usize>(), 4);
    }

    #[test]
    fn hover_picks_nearest_marker() {
        let map = MapFigure {
            title: "Fleet".into(),
            center: GeoPoint { lat: 50.0, lon: 4.0 },
            zoom: DEFAULT_ZOOM,
            groups: vec![MarkerGroup {
                name: "Normal".into(),
                color: NORMAL,
                points: vec![GeoPoint { lat: 50.0, lon: 4.0 }, GeoPoint { lat: 51.0, lon: 5.0 }],
                hover: vec!["first".into(), "second".into()],
            }],
        };
        assert_eq!(nearest_hover(&map, "Normal", &PlotPoint::new(4.9, 50.9)), "second");
        assert_eq!(nearest_hover(&map, "", &PlotPoint::new(4.0, 50.0)), "50.0000, 4.0000");
    }

    #[test]
    fn hover_distance_follows_screen_aspect() {
        // At 60° a degree of longitude is half a degree of latitude on screen.
        let map = MapFigure {
            title: "North".into(),
            center: GeoPoint { lat: 60.0, lon: 10.0 },
            zoom: DEFAULT_ZOOM,
            groups: vec![MarkerGroup {
                name: "Normal".into(),
                color: NORMAL,
                points: vec![GeoPoint { lat: 60.0, lon: 10.8 }, GeoPoint { lat: 60.6, lon: 10.0 }],
                hover: vec!["east".into(), "north".into()],
            }],
        };
        assert_eq!(nearest_hover(&map, "Normal", &PlotPoint::new(10.0, 60.0)), "east");
    }

    #[test]
    fn time_axis_labels() {
        assert_eq!(format_time(1_609_459_200.0), "2021-01-01 00:00");
    }
}
