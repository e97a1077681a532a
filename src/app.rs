use eframe::egui;

use crate::config::{Cli, ViewerSettings};
use crate::state::AppState;
use crate::ui::{panels, viewport};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct LidarViewerApp {
    pub state: AppState,
}

impl LidarViewerApp {
    /// Build the app from persisted settings layered under the command line.
    pub fn new(cc: &eframe::CreationContext<'_>, cli: &Cli) -> Self {
        let persisted = cc
            .storage
            .and_then(|s| eframe::get_value::<ViewerSettings>(s, eframe::APP_KEY));
        Self {
            state: AppState::new(cli.resolve(persisted)),
        }
    }

    /// Arrow keys walk the file list, `R` reframes the scan.
    /// Returns the row to scroll into view, if the selection moved.
    fn handle_keys(&mut self, ctx: &egui::Context) -> Option<usize> {
        if ctx.wants_keyboard_input() || self.state.error_dialog.is_some() {
            return None;
        }

        let (right, left, reset) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::ArrowRight),
                i.key_pressed(egui::Key::ArrowLeft),
                i.key_pressed(egui::Key::R),
            )
        });

        let before = self.state.selected;
        if right {
            self.state.navigate(1);
        }
        if left {
            self.state.navigate(-1);
        }
        if reset {
            self.state.reset_camera();
        }
        (self.state.selected != before)
            .then_some(self.state.selected)
            .flatten()
    }

    fn error_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = &self.state.error_dialog else {
            return;
        };

        let mut close = false;
        let modal = egui::Modal::new(egui::Id::new("error_dialog")).show(ctx, |ui| {
            ui.set_max_width(420.0);
            ui.heading(&dialog.title);
            ui.add_space(6.0);
            ui.label(&dialog.message);
            ui.add_space(10.0);
            if ui.button("OK").clicked() {
                close = true;
            }
        });

        if close || modal.should_close() {
            self.state.dismiss_error();
        }
    }
}

impl eframe::App for LidarViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let scroll_to = self.handle_keys(ctx);

        // ---- Left side panel: files and controls ----
        egui::SidePanel::left("sidebar")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state, scroll_to);
            });

        // ---- Central panel: 3D viewport ----
        egui::CentralPanel::default()
            .frame(egui::Frame::default())
            .show(ctx, |ui| {
                viewport::point_cloud_view(ui, &mut self.state);
            });

        self.error_dialog(ctx);
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.state.settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scans() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.xyz"), "0 0 0\n1 1 1\n").unwrap();
        std::fs::write(dir.path().join("b.xyz"), "2 2 2\n").unwrap();
        dir
    }

    fn app_in(dir: &tempfile::TempDir) -> LidarViewerApp {
        LidarViewerApp {
            state: AppState::new(ViewerSettings {
                last_directory: Some(dir.path().to_path_buf()),
                ..Default::default()
            }),
        }
    }

    fn arrow_right() -> egui::RawInput {
        egui::RawInput {
            events: vec![egui::Event::Key {
                key: egui::Key::ArrowRight,
                physical_key: None,
                pressed: true,
                repeat: false,
                modifiers: egui::Modifiers::NONE,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn arrow_key_selects_next_scan() {
        let dir = scans();
        let mut app = app_in(&dir);
        let ctx = egui::Context::default();

        let mut scroll_to = None;
        let _ = ctx.run(arrow_right(), |ctx| scroll_to = app.handle_keys(ctx));

        assert_eq!(scroll_to, Some(0));
        assert_eq!(app.state.selected, Some(0));
    }

    #[test]
    fn focused_widget_keeps_the_arrow_keys() {
        let dir = scans();
        let mut app = app_in(&dir);
        let ctx = egui::Context::default();

        let mut scroll_to = None;
        let _ = ctx.run(arrow_right(), |ctx| {
            ctx.memory_mut(|m| m.request_focus(egui::Id::new("point_size_slider")));
            scroll_to = app.handle_keys(ctx);
        });

        assert_eq!(scroll_to, None);
        assert_eq!(app.state.selected, None);
    }

    #[test]
    fn open_dialog_blocks_navigation() {
        let dir = scans();
        let mut app = app_in(&dir);
        app.state.show_error("Load Error", "boom".to_string());
        let ctx = egui::Context::default();

        let _ = ctx.run(arrow_right(), |ctx| {
            app.handle_keys(ctx);
        });
        assert_eq!(app.state.selected, None);
    }
}
