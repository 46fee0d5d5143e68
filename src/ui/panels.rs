use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::filter::{DateRange, Selector};
use crate::router::Page;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel for the current page.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.table.is_empty() {
        ui.label("No readings loaded.");
        return;
    }

    match state.page {
        Page::Detail => {
            vehicle_dropdown(ui, state);
            ui.separator();
            date_range(ui, state);
        }
        Page::Map => {
            vehicle_multi_select(ui, state);
            ui.separator();
            province_dropdown(ui, state);
            ui.separator();
            date_range(ui, state);
        }
    }
}

fn vehicle_dropdown(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Choose a vehicle");
    let current = state.selection.vehicle.clone().unwrap_or_default();
    let mut chosen = None;
    egui::ComboBox::from_id_salt("vehicle")
        .selected_text(&current)
        .show_ui(ui, |ui: &mut Ui| {
            for vehicle in &state.table.vehicles {
                if ui.selectable_label(current == *vehicle, vehicle).clicked() {
                    chosen = Some(vehicle.clone());
                }
            }
        });
    if let Some(vehicle) = chosen {
        state.set_vehicle(vehicle);
    }
}

fn vehicle_multi_select(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Choose vehicles");

    let mut all = state.selection.vehicles.is_all();
    if ui.checkbox(&mut all, "All vehicles").changed() {
        if all {
            state.select_all_vehicles();
        } else {
            state.select_no_vehicles();
        }
    }

    let mut toggled = None;
    ScrollArea::vertical()
        .id_salt("vehicle_list")
        .max_height(240.0)
        .show(ui, |ui: &mut Ui| {
            for vehicle in &state.table.vehicles {
                let mut checked = state.vehicle_selected(vehicle);
                if ui.checkbox(&mut checked, vehicle.as_str()).changed() {
                    toggled = Some(vehicle.clone());
                }
            }
        });
    if let Some(vehicle) = toggled {
        state.toggle_vehicle(&vehicle);
    }
}

fn province_dropdown(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Choose a province");
    let current = match &state.selection.province {
        Selector::One(p) => p.clone(),
        _ => "All".to_string(),
    };
    let mut chosen = None;
    egui::ComboBox::from_id_salt("province")
        .selected_text(&current)
        .show_ui(ui, |ui: &mut Ui| {
            if ui
                .selectable_label(state.selection.province.is_all(), "All")
                .clicked()
            {
                chosen = Some(Selector::All);
            }
            for province in &state.table.provinces {
                if ui.selectable_label(current == *province, province).clicked() {
                    chosen = Some(Selector::One(province.clone()));
                }
            }
        });
    if let Some(province) = chosen {
        state.set_province(province);
    }
}

fn date_range(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Choose a period");
    let DateRange { mut start, mut end } = state.selection.range;
    let start_id = format!("{}_start_date", state.page.path());
    let end_id = format!("{}_end_date", state.page.path());

    let mut changed = false;
    egui::Grid::new("date_range").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("From");
        changed |= ui
            .add(DatePickerButton::new(&mut start).id_salt(&start_id).format("%Y-%m-%d"))
            .changed();
        ui.end_row();
        ui.label("To");
        changed |= ui
            .add(DatePickerButton::new(&mut end).id_salt(&end_id).format("%Y-%m-%d"))
            .changed();
        ui.end_row();
    });

    if start > end {
        ui.label(RichText::new("Start is after end").color(Color32::YELLOW));
    }
    if changed {
        state.set_range(start, end);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu, page navigation and status line.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Export view as JSON…").clicked() {
                export_dialog(state);
                ui.close_menu();
            }
        });

        if state.layout.variant.has_router() {
            ui.separator();
            let mut target = None;
            for page in Page::ALL {
                if ui.selectable_label(state.page == page, page.label()).clicked() {
                    target = Some(page.path());
                }
            }
            if let Some(path) = target {
                state.navigate(path);
            }
        }

        ui.separator();
        let mut status = format!(
            "{} readings loaded, {} selected",
            state.table.len(),
            state.view.rows
        );
        if let Some(map) = &state.view.map {
            status.push_str(&format!(", {} on the map", map.point_count()));
        }
        ui.label(status);

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn export_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export view")
        .set_file_name("view.json")
        .add_filter("JSON", &["json"])
        .save_file();

    if let Some(path) = file {
        match state.export_view(&path) {
            Ok(()) => state.status_message = None,
            Err(e) => {
                log::warn!("Failed to export view: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
