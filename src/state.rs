use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::data::filter::{DateRange, Selector};
use crate::data::model::ReadingTable;
use crate::router::Page;
use crate::view::{compose, Layout, Selection, View};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
///
/// Every setter is one UI event: it updates a widget value and recomputes
/// the view from the shared, never-mutated table.
pub struct AppState {
    pub table: Arc<ReadingTable>,
    pub layout: Layout,
    pub page: Page,
    pub selection: Selection,

    /// Output of the last recomputation.
    pub view: View,

    /// Set after each recomputation so plots refit to the new data once.
    pub reset_plots: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(table: Arc<ReadingTable>, layout: Layout) -> Self {
        let selection = Selection::defaults(&table);
        let mut state = Self {
            table,
            layout,
            page: Page::Detail,
            selection,
            view: View::default(),
            reset_plots: true,
            status_message: None,
        };
        state.refresh();
        state
    }

    /// Recompute the view after a widget change.
    pub fn refresh(&mut self) {
        self.view = compose(&self.table, &self.layout, self.page, &self.selection);
        self.reset_plots = true;
    }

    /// Follow a navigation link. A page change resets every widget.
    pub fn navigate(&mut self, path: &str) {
        let page = if self.layout.variant.has_router() {
            Page::from_path(path)
        } else {
            Page::Detail
        };
        if page == self.page {
            return;
        }
        log::debug!("Navigating to {}", page.path());
        self.page = page;
        self.selection = Selection::defaults(&self.table);
        self.refresh();
    }

    pub fn set_vehicle(&mut self, vehicle: String) {
        self.selection.vehicle = Some(vehicle);
        self.refresh();
    }

    pub fn set_range(&mut self, start: NaiveDate, end: NaiveDate) {
        self.selection.range = DateRange { start, end };
        self.refresh();
    }

    pub fn set_province(&mut self, province: Selector<String>) {
        self.selection.province = province;
        self.refresh();
    }

    /// Tick or untick one vehicle of the multi-select.
    ///
    /// Unticking under "all" keeps every other vehicle ticked; ticking the
    /// last missing vehicle goes back to "all".
    pub fn toggle_vehicle(&mut self, vehicle: &str) {
        let mut set: BTreeSet<String> = match std::mem::take(&mut self.selection.vehicles) {
            Selector::All => self.table.vehicles.iter().cloned().collect(),
            Selector::One(v) => BTreeSet::from([v]),
            Selector::Set(set) => set,
        };
        if !set.remove(vehicle) {
            set.insert(vehicle.to_string());
        }
        let everyone = self.table.vehicles.iter().all(|v| set.contains(v));
        self.selection.vehicles = if everyone { Selector::All } else { Selector::Set(set) };
        self.refresh();
    }

    pub fn select_all_vehicles(&mut self) {
        self.selection.vehicles = Selector::All;
        self.refresh();
    }

    pub fn select_no_vehicles(&mut self) {
        self.selection.vehicles = Selector::Set(BTreeSet::new());
        self.refresh();
    }

    /// Whether `vehicle` is ticked in the multi-select.
    pub fn vehicle_selected(&self, vehicle: &str) -> bool {
        self.selection.vehicles.test(Some(vehicle)).unwrap_or(true)
    }

    /// Write the current view as pretty JSON.
    pub fn export_view(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.view).context("serialising view")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("Exported view to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataConfig, Variant};
    use crate::data::loader::load_reader;

    const DATA: &str = "\
mapped_veh_id;timestamps_UTC;lat;lon;province;speed;anomaly_RS_E_WatTemp_PC1
180;2021-01-01 00:00:00;50.5;4.5;Namur;10;No
180;2021-01-02 01:00:00;50.6;4.6;Namur;20;Yes
190;2021-01-01 00:30:00;50.7;4.7;Liège;5;No
";

    fn state(variant: Variant) -> AppState {
        let table = load_reader(DATA.as_bytes(), &DataConfig::default()).unwrap();
        let layout = Layout {
            variant,
            groups: variant.default_groups(),
        };
        AppState::new(Arc::new(table), layout)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    #[test]
    fn initial_view_uses_defaults() {
        let s = state(Variant::Anomaly);
        assert_eq!(s.page, Page::Detail);
        assert_eq!(s.selection.vehicle.as_deref(), Some("180"));
        assert_eq!(s.view.rows, 2);
    }

    #[test]
    fn widget_changes_recompute() {
        let mut s = state(Variant::Anomaly);
        s.set_range(day(2), day(2));
        assert_eq!(s.view.rows, 1);
        s.set_vehicle("190".into());
        assert_eq!(s.view.rows, 0);
        s.set_range(day(1), day(2));
        assert_eq!(s.view.rows, 1);
    }

    #[test]
    fn navigation_resets_widgets() {
        let mut s = state(Variant::Fleet);
        s.set_vehicle("190".into());
        s.navigate("/map");
        assert_eq!(s.page, Page::Map);
        assert_eq!(s.view.rows, 3);

        s.set_province(Selector::One("Namur".into()));
        assert_eq!(s.view.rows, 2);
        s.navigate("/map");
        assert_eq!(s.view.rows, 2);

        s.navigate("/");
        assert_eq!(s.page, Page::Detail);
        assert_eq!(s.selection.vehicle.as_deref(), Some("180"));
        assert_eq!(s.selection.province, Selector::All);
    }

    #[test]
    fn navigation_needs_a_router() {
        let mut s = state(Variant::Basic);
        s.navigate("/map");
        assert_eq!(s.page, Page::Detail);
    }

    #[test]
    fn multi_select_toggling() {
        let mut s = state(Variant::Fleet);
        s.navigate("/map");
        assert!(s.vehicle_selected("190"));

        s.toggle_vehicle("180");
        assert_eq!(s.view.rows, 1);
        s.toggle_vehicle("190");
        assert_eq!(s.view.rows, 0);
        s.toggle_vehicle("180");
        assert_eq!(s.view.rows, 2);
        s.toggle_vehicle("190");
        assert_eq!(s.selection.vehicles, Selector::All);
        assert_eq!(s.view.rows, 3);

        s.select_no_vehicles();
        assert_eq!(s.view.rows, 0);
        s.select_all_vehicles();
        assert_eq!(s.view.rows, 3);
    }

    #[test]
    fn unticking_under_all_keeps_the_others() {
        let mut s = state(Variant::Fleet);
        s.navigate("/map");
        assert!(s.selection.vehicles.is_all());

        s.toggle_vehicle("190");
        assert!(!s.vehicle_selected("190"));
        assert!(s.vehicle_selected("180"));
        assert_eq!(s.view.rows, 2);
        assert_eq!(s.view.map.as_ref().map(|m| m.point_count()), Some(2));
    }

    #[test]
    fn export_writes_json() {
        let s = state(Variant::Fleet);
        let file = format!("rail-dash-export-{}.json", std::process::id());
        let path = std::env::temp_dir().join(file);
        s.export_view(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["rows"], 2);
        assert!(value["charts"].is_array());
    }
}
