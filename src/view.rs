use std::collections::BTreeSet;

use serde::Serialize;

use crate::chart::map::{position_map, MapFigure};
use crate::chart::{channel_chart, outside_temp_chart, AnomalyColumnFn, Figure};
use crate::config::{ChannelGroup, Variant};
use crate::data::anomaly::{anomaly_column, fleet_columns, partition};
use crate::data::filter::{filtered_indices, DateRange, Filter, Selector};
use crate::data::model::ReadingTable;
use crate::router::Page;

/// What the dashboard shows, fixed at startup.
#[derive(Debug, Clone)]
pub struct Layout {
    pub variant: Variant,
    pub groups: Vec<ChannelGroup>,
}

impl Layout {
    /// Flag columns behind the detail map: every highlighted channel's column.
    pub fn engine_anomaly_columns(&self, table: &ReadingTable) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.groups
            .iter()
            .filter(|g| g.highlight_anomalies)
            .flat_map(|g| g.resolve(table))
            .filter_map(|c| anomaly_column(&c))
            .filter(|c| seen.insert(c.clone()))
            .collect()
    }
}

/// Current widget values.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Vehicle dropdown of the detail page.
    pub vehicle: Option<String>,
    /// Vehicle multi-select of the map page.
    pub vehicles: Selector<String>,
    /// Province dropdown of the map page.
    pub province: Selector<String>,
    pub range: DateRange,
}

impl Selection {
    /// Widget defaults: first vehicle, every vehicle and province, whole span.
    pub fn defaults(table: &ReadingTable) -> Self {
        Selection {
            vehicle: table.vehicles.first().cloned(),
            vehicles: Selector::All,
            province: Selector::All,
            range: DateRange::covering(table),
        }
    }
}

/// Render-ready output of one interaction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct View {
    pub charts: Vec<Figure>,
    pub map: Option<MapFigure>,
    /// Rows that passed the filter.
    pub rows: usize,
}

/// Recompute the view for a page from the widget values.
pub fn compose(table: &ReadingTable, layout: &Layout, page: Page, selection: &Selection) -> View {
    match page {
        Page::Map if layout.variant.has_router() => fleet_map(table, selection),
        _ => detail(table, layout, selection),
    }
}

fn detail(table: &ReadingTable, layout: &Layout, selection: &Selection) -> View {
    let vehicles = match &selection.vehicle {
        Some(v) => Selector::One(v.clone()),
        None => Selector::All,
    };
    let subject = selection.vehicle.as_deref().unwrap_or("all vehicles");
    let rows = filtered_indices(table, &Filter::new(vehicles, selection.range));

    let mut charts: Vec<Figure> = layout
        .groups
        .iter()
        .map(|group| {
            let deriver = group
                .highlight_anomalies
                .then_some(anomaly_column as AnomalyColumnFn);
            channel_chart(
                table,
                &rows,
                format!("Chart for {subject} - {}", group.title),
                &group.resolve(table),
                deriver,
            )
        })
        .collect();
    charts.push(outside_temp_chart(table, &rows, subject));

    let title = format!("Positions of {subject}");
    let map = match layout.variant {
        Variant::Basic => Some(position_map(table, &rows, title, None)),
        Variant::Anomaly => {
            let columns = layout.engine_anomaly_columns(table);
            log::debug!("Anomaly split {:?}", partition(table, &rows, &columns).counts());
            Some(position_map(table, &rows, title, Some(columns.as_slice())))
        }
        Variant::Fleet => None,
    };

    log::debug!("Detail view for {subject}: {} rows", rows.len());
    View {
        charts,
        map,
        rows: rows.len(),
    }
}

fn fleet_map(table: &ReadingTable, selection: &Selection) -> View {
    let filter = Filter::new(selection.vehicles.clone(), selection.range)
        .with_province(selection.province.clone());
    let rows = filtered_indices(table, &filter);
    let columns = fleet_columns();
    log::debug!(
        "Fleet map: {} rows, anomaly split {:?}",
        rows.len(),
        partition(table, &rows, &columns).counts()
    );

    View {
        charts: Vec::new(),
        map: Some(position_map(table, &rows, "Fleet positions".into(), Some(columns.as_slice()))),
        rows: rows.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Trace;
    use crate::config::DataConfig;
    use crate::data::loader::load_reader;

    const DATA: &str = "\
mapped_veh_id;timestamps_UTC;lat;lon;province;outside_temp;speed;RS_E_InAirTemp_PC1;RS_E_WatTemp_PC1;RS_T_OilTemp_PC1;RS_E_InAirTemp_PC2;RS_E_WatTemp_PC2;RS_T_OilTemp_PC2;anomaly_RS_E_InAirTemp_PC1;anomaly_RS_E_WatTemp_PC1;anomaly_RS_T_OilTemp_PC1;anomaly_RS_E_InAirTemp_PC2;anomaly_RS_E_WatTemp_PC2;anomaly_RS_T_OilTemp_PC2
180;2021-01-01 00:00:00;50.5;4.5;Namur;2;10;30;80;70;31;81;71;No;No;No;No;No;No
180;2021-01-01 01:00:00;50.6;4.6;Namur;3;20;35;120;72;32;82;72;No;Yes;No;No;No;No
190;2021-01-01 00:30:00;50.7;4.7;Liège;4;5;30;80;70;31;81;71;No;No;No;No;No;Yes
";

    fn table() -> ReadingTable {
        load_reader(DATA.as_bytes(), &DataConfig::default()).unwrap()
    }

    fn layout(variant: Variant) -> Layout {
        Layout {
            variant,
            groups: variant.default_groups(),
        }
    }

    #[test]
    fn basic_detail_uses_powercar_columns() {
        let t = table();
        let sel = Selection::defaults(&t);
        assert_eq!(sel.vehicle.as_deref(), Some("180"));
        let view = compose(&t, &layout(Variant::Basic), Page::Detail, &sel);
        assert_eq!(view.rows, 2);
        assert_eq!(view.charts.len(), 3);
        assert_eq!(view.charts[0].title, "Chart for 180 - PC1");
        assert_eq!(view.charts[0].traces.len(), 3);
        assert!(view.charts[0]
            .traces
            .iter()
            .all(|tr| matches!(tr, Trace::Line { .. })));
        let map = view.map.unwrap();
        assert_eq!(map.groups.len(), 1);
        assert_eq!(map.point_count(), 2);
    }

    #[test]
    fn anomaly_detail_highlights_flagged_rows() {
        let t = table();
        let view = compose(&t, &layout(Variant::Anomaly), Page::Detail, &Selection::defaults(&t));
        let pc1 = &view.charts[0];
        let overlays: Vec<_> = pc1
            .traces
            .iter()
            .filter_map(|tr| match tr {
                Trace::Markers { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(overlays, ["RS_E_WatTemp_PC1 anomaly"]);
        let map = view.map.unwrap();
        assert_eq!(map.groups.iter().map(|g| g.points.len()).collect::<Vec<_>>(), [1, 1]);
    }

    #[test]
    fn fleet_map_filters_by_province_with_wildcard_vehicles() {
        let t = table();
        let mut sel = Selection::defaults(&t);
        sel.province = Selector::One("Liège".into());
        let view = compose(&t, &layout(Variant::Fleet), Page::Map, &sel);
        assert!(view.charts.is_empty());
        assert_eq!(view.rows, 1);
        let map = view.map.unwrap();
        assert_eq!(map.groups.len(), 1);
        assert_eq!(map.groups[0].name, "Anomaly");
        assert!((map.center.lat - 50.7).abs() < 1e-9);
    }

    #[test]
    fn fleet_detail_has_no_map() {
        let t = table();
        let view = compose(&t, &layout(Variant::Fleet), Page::Detail, &Selection::defaults(&t));
        assert!(view.map.is_none());
        assert_eq!(view.charts.len(), 3);
    }

    #[test]
    fn map_page_ignored_without_router() {
        let t = table();
        let sel = Selection::defaults(&t);
        let detail = compose(&t, &layout(Variant::Anomaly), Page::Detail, &sel);
        let map = compose(&t, &layout(Variant::Anomaly), Page::Map, &sel);
        assert_eq!(detail.charts, map.charts);
    }

    #[test]
    fn engine_columns_follow_groups() {
        let t = table();
        let cols = layout(Variant::Anomaly).engine_anomaly_columns(&t);
        assert_eq!(cols.len(), 6);
        assert!(!cols.iter().any(|c| c.contains("speed")));
        assert!(layout(Variant::Basic).engine_anomaly_columns(&t).is_empty());
    }

    #[test]
    fn empty_selection_renders_empty_not_error() {
        let t = table();
        let mut sel = Selection::defaults(&t);
        sel.vehicles = Selector::Set(BTreeSet::new());
        let view = compose(&t, &layout(Variant::Fleet), Page::Map, &sel);
        assert_eq!(view.rows, 0);
        let map = view.map.unwrap();
        assert!(map.groups.is_empty());
        assert!(map.center.lat.is_finite());
    }
}
