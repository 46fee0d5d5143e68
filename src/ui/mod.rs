//! egui rendering of the dashboard: filter widgets and plots.

pub mod panels;
pub mod plot;
