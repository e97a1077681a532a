use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::config::{ColorMode, MAX_POINT_SIZE, MIN_POINT_SIZE};
use crate::data::directory::{format_size, SUPPORTED_EXTENSIONS};
use crate::render::camera::ViewPreset;
use crate::state::AppState;

const ROW_HEIGHT: f32 = 18.0;

// ---------------------------------------------------------------------------
// Left side panel – files, visual controls, camera views, scan info
// ---------------------------------------------------------------------------

/// Render the sidebar. `scroll_to` brings a row into view after keyboard navigation.
pub fn side_panel(ui: &mut Ui, state: &mut AppState, scroll_to: Option<usize>) {
    ui.horizontal(|ui: &mut Ui| {
        if ui.button("Open Directory").clicked() {
            open_directory_dialog(state);
        }
        if ui
            .add_enabled(state.directory.is_some(), egui::Button::new("Refresh"))
            .clicked()
        {
            state.refresh_file_list();
        }
    });

    if let Some(dir) = &state.directory {
        ui.label(RichText::new(dir.path.display().to_string()).small().weak())
            .on_hover_text(dir.path.display().to_string());
    }
    ui.separator();

    // Controls are laid out bottom-up so the file list gets the remaining height.
    egui::TopBottomPanel::bottom("sidebar_controls")
        .resizable(false)
        .show_separator_line(true)
        .show_inside(ui, |ui: &mut Ui| {
            visual_controls(ui, state);
            ui.add_space(4.0);
            camera_views(ui, state);
            ui.add_space(4.0);
            scan_info(ui, state);
        });

    file_list(ui, state, scroll_to);
}

// ---------------------------------------------------------------------------
// File list
// ---------------------------------------------------------------------------

fn file_list(ui: &mut Ui, state: &mut AppState, scroll_to: Option<usize>) {
    let Some(dir) = &state.directory else {
        ui.label("No directory opened.");
        return;
    };
    if dir.is_empty() {
        ui.label(format!(
            "No scan files ({}) in this directory.",
            SUPPORTED_EXTENSIONS.map(|e| format!(".{e}")).join(", ")
        ));
        return;
    }

    let mut clicked = None;
    let mut table = TableBuilder::new(ui)
        .striped(true)
        .sense(egui::Sense::click())
        .column(Column::remainder().clip(true))
        .column(Column::auto())
        .auto_shrink([false, false]);
    if let Some(row) = scroll_to {
        table = table.scroll_to_row(row, None);
    }

    table
        .header(ROW_HEIGHT + 2.0, |mut header| {
            header.col(|ui: &mut Ui| {
                ui.strong("File");
            });
            header.col(|ui: &mut Ui| {
                ui.strong("Size");
            });
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, dir.len(), |mut row| {
                let index = row.index();
                let entry = &dir.entries[index];
                row.set_selected(state.selected == Some(index));
                row.col(|ui: &mut Ui| {
                    ui.label(&entry.name);
                });
                row.col(|ui: &mut Ui| {
                    ui.label(format_size(entry.size_bytes));
                });
                if row.response().clicked() {
                    clicked = Some(index);
                }
            });
        });

    // Re-selecting the current row does not reload.
    if let Some(index) = clicked {
        if state.selected != Some(index) {
            state.select(index);
        }
    }
}

// ---------------------------------------------------------------------------
// Visual controls
// ---------------------------------------------------------------------------

fn visual_controls(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Coloring");
    let intensity_available = state.intensity_available();
    for mode in [ColorMode::Solid, ColorMode::Height, ColorMode::Intensity] {
        let enabled = mode != ColorMode::Intensity || intensity_available;
        let checked = state.settings.color_mode == mode;
        let response = ui
            .add_enabled(enabled, egui::RadioButton::new(checked, mode.label()))
            .on_disabled_hover_text("The current scan has no intensity values");
        if response.clicked() && !checked {
            state.set_color_mode(mode);
        }
    }

    ui.add_space(4.0);
    ui.label(state.point_size_label());
    let mut size = state.settings.point_size;
    if ui
        .add(egui::Slider::new(&mut size, MIN_POINT_SIZE..=MAX_POINT_SIZE).show_value(false))
        .changed()
    {
        state.set_point_size(size);
    }
}

// ---------------------------------------------------------------------------
// Camera views
// ---------------------------------------------------------------------------

fn camera_views(ui: &mut Ui, state: &mut AppState) {
    ui.group(|ui: &mut Ui| {
        ui.set_width(ui.available_width());
        ui.strong("Camera Views");
        for preset in ViewPreset::ALL {
            if ui.button(preset.label()).clicked() {
                state.apply_view_preset(preset);
            }
        }
        if ui
            .button("Reset Camera")
            .on_hover_text("Frame the whole scan (R)")
            .clicked()
        {
            state.reset_camera();
        }
    });
}

// ---------------------------------------------------------------------------
// Scan info
// ---------------------------------------------------------------------------

fn scan_info(ui: &mut Ui, state: &AppState) {
    ui.group(|ui: &mut Ui| {
        ui.set_width(ui.available_width());
        ui.strong("Scan Info");
        match &state.scan_info {
            Some(info) => {
                ui.label(format!("File: {}", info.file_name));
                ui.label(format!("Points: {}", info.point_count));
            }
            None => {
                ui.label("File: None");
                ui.label("Points: 0");
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Directory dialog
// ---------------------------------------------------------------------------

pub fn open_directory_dialog(state: &mut AppState) {
    let mut dialog = rfd::FileDialog::new().set_title("Select Data Directory");
    if let Some(dir) = &state.settings.last_directory {
        dialog = dialog.set_directory(dir);
    }

    if let Some(path) = dialog.pick_folder() {
        state.open_directory(path);
    }
}
