use std::path::{Path, PathBuf};
use std::time::Instant;

use eframe::egui::Color32;

use crate::color::{point_colors, ColorMap};
use crate::config::{ColorMode, ViewerSettings, MAX_POINT_SIZE, MIN_POINT_SIZE};
use crate::data::directory::ScanDirectory;
use crate::data::loader::load_file;
use crate::data::model::PointCloud;
use crate::render::camera::{OrbitCamera, ViewPreset};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// File name and point count of the displayed scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanInfo {
    pub file_name: String,
    pub point_count: usize,
}

/// A modal error message waiting to be acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDialog {
    pub title: String,
    pub message: String,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: ViewerSettings,

    /// Open directory and its scan listing (None until the user picks one).
    pub directory: Option<ScanDirectory>,

    /// Index into `directory.entries` of the selected file.
    pub selected: Option<usize>,

    /// The last successfully loaded scan.
    pub cloud: Option<PointCloud>,

    /// Info about `cloud`, shown in the sidebar.
    pub scan_info: Option<ScanInfo>,

    /// Per-point colours for `cloud` under the current colour mode (cached).
    pub colors: Vec<Color32>,

    pub camera: OrbitCamera,

    pub error_dialog: Option<ErrorDialog>,

    color_map: ColorMap,

    /// The camera is framed on the first successful load only.
    first_load_done: bool,
}

impl AppState {
    pub fn new(settings: ViewerSettings) -> Self {
        let startup_dir = settings.last_directory.clone();
        let mut state = Self {
            settings,
            directory: None,
            selected: None,
            cloud: None,
            scan_info: None,
            colors: Vec::new(),
            camera: OrbitCamera::default(),
            error_dialog: None,
            color_map: ColorMap::viridis(),
            first_load_done: false,
        };

        if let Some(dir) = startup_dir {
            if dir.is_dir() {
                state.open_directory(dir);
            } else {
                log::warn!("Startup directory {} does not exist", dir.display());
            }
        }
        state
    }

    // ---- Directory & selection ----

    /// Make `path` the current directory and list its scans. Clears the selection.
    pub fn open_directory(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        match ScanDirectory::open(&path) {
            Ok(dir) => {
                log::info!("Opened {} ({} scan files)", path.display(), dir.len());
                self.settings.last_directory = Some(path);
                self.directory = Some(dir);
                self.selected = None;
            }
            Err(e) => {
                log::error!("Failed to open directory: {e:#}");
                self.show_error("Directory Error", format!("{e:#}"));
            }
        }
    }

    /// Re-list the current directory, keeping the selection if the file is still there.
    pub fn refresh_file_list(&mut self) {
        let Some(dir) = &mut self.directory else {
            return;
        };
        let selected_name = self
            .selected
            .and_then(|i| dir.entries.get(i))
            .map(|e| e.name.clone());

        if let Err(e) = dir.refresh() {
            log::error!("Failed to refresh file list: {e:#}");
            let message = format!("{e:#}");
            self.show_error("Directory Error", message);
            return;
        }

        self.selected =
            selected_name.and_then(|name| dir.entries.iter().position(|e| e.name == name));
    }

    /// Move the selection by `direction` rows. With nothing selected, +1 selects the first row.
    pub fn navigate(&mut self, direction: isize) {
        let Some(dir) = &self.directory else {
            return;
        };
        if dir.is_empty() {
            return;
        }
        let current = self.selected.map(|i| i as isize).unwrap_or(-1);
        let next = current + direction;
        if (0..dir.len() as isize).contains(&next) {
            self.select(next as usize);
        }
    }

    /// Select the file at `index` and load it.
    pub fn select(&mut self, index: usize) {
        let Some(dir) = &self.directory else {
            return;
        };
        let Some(path) = dir.file_path(index) else {
            return;
        };
        self.selected = Some(index);
        self.load(&path);
    }

    // ---- Loading ----

    fn load(&mut self, path: &Path) {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let started = Instant::now();
        match load_file(path) {
            Ok(cloud) => {
                log::info!(
                    "Loaded {file_name}: {} points in {} ms",
                    cloud.len(),
                    started.elapsed().as_millis()
                );
                self.set_cloud(cloud, file_name);
            }
            Err(e) => {
                log::error!("Error loading {file_name}: {e:#}");
                self.show_error("Load Error", format!("{e:#}"));
            }
        }
    }

    /// Replace the displayed scan.
    pub fn set_cloud(&mut self, cloud: PointCloud, file_name: String) {
        self.scan_info = Some(ScanInfo {
            file_name,
            point_count: cloud.len(),
        });
        self.colors = point_colors(&cloud, self.settings.color_mode, &self.color_map);

        if !self.first_load_done {
            if let Some(bounds) = &cloud.bounds {
                self.camera.fit(bounds);
            }
            self.first_load_done = true;
        }
        self.cloud = Some(cloud);
    }

    // ---- Visual settings ----

    pub fn set_point_size(&mut self, size: u8) {
        self.settings.point_size = size.clamp(MIN_POINT_SIZE, MAX_POINT_SIZE);
    }

    pub fn point_size_label(&self) -> String {
        format!("Point Size: {}", self.settings.point_size)
    }

    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.settings.color_mode = mode;
        self.recolor();
    }

    fn recolor(&mut self) {
        self.colors = match &self.cloud {
            Some(cloud) => point_colors(cloud, self.settings.color_mode, &self.color_map),
            None => Vec::new(),
        };
    }

    /// Whether the displayed scan carries intensity values.
    pub fn intensity_available(&self) -> bool {
        self.cloud.as_ref().is_some_and(PointCloud::has_intensity)
    }

    // ---- Camera ----

    pub fn apply_view_preset(&mut self, preset: ViewPreset) {
        let bounds = self.cloud.as_ref().and_then(|c| c.bounds.as_ref());
        self.camera.apply_preset(preset, bounds);
    }

    /// Frame the displayed scan, keeping the current orientation.
    pub fn reset_camera(&mut self) {
        if let Some(bounds) = self.cloud.as_ref().and_then(|c| c.bounds.as_ref()) {
            self.camera.fit(bounds);
        }
    }

    // ---- Errors ----

    pub fn show_error(&mut self, title: &str, message: String) {
        self.error_dialog = Some(ErrorDialog {
            title: title.to_string(),
            message,
        });
    }

    pub fn dismiss_error(&mut self) {
        self.error_dialog = None;
    }
}
