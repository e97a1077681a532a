use eframe::egui::{self, Align2, Color32, FontId, PointerButton, Pos2, Sense, Shape, Stroke, Ui, Vec2};
use glam::Vec3;

use crate::render::camera::OrbitCamera;
use crate::render::points::build_point_mesh;
use crate::state::AppState;

const BACKGROUND: Color32 = Color32::BLACK;
const AXIS_LENGTH: f32 = 32.0;
const AXIS_MARGIN: f32 = 48.0;

// ---------------------------------------------------------------------------
// 3D viewport (central panel)
// ---------------------------------------------------------------------------

/// Render the point cloud and handle camera interaction.
///
/// Left drag orbits, right/middle drag pans, scroll zooms, double click frames the scan.
pub fn point_cloud_view(ui: &mut Ui, state: &mut AppState) {
    let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

    let delta = response.drag_delta();
    if response.dragged_by(PointerButton::Primary) {
        state.camera.orbit(glam::Vec2::new(delta.x, delta.y));
    } else if response.dragged_by(PointerButton::Secondary)
        || response.dragged_by(PointerButton::Middle)
    {
        state.camera.pan(glam::Vec2::new(delta.x, delta.y), rect.height());
    }
    if response.hovered() {
        let scroll = ui.input(|i| i.smooth_scroll_delta.y);
        if scroll != 0.0 {
            state.camera.zoom(scroll);
        }
    }
    if response.double_clicked() {
        state.reset_camera();
    }

    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, BACKGROUND);

    match &state.cloud {
        Some(cloud) => {
            let projection = state
                .camera
                .projection(glam::Vec2::new(rect.width(), rect.height()));
            let (mesh, _visible) = build_point_mesh(
                &cloud.points,
                &state.colors,
                &projection,
                rect,
                state.settings.point_size as f32,
            );
            painter.add(Shape::mesh(mesh));
        }
        None => {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Open a directory and select a scan",
                FontId::proportional(18.0),
                Color32::GRAY,
            );
        }
    }

    draw_axes(&painter, rect.left_bottom() + Vec2::new(AXIS_MARGIN, -AXIS_MARGIN), &state.camera);
}

/// Orientation gizmo: world X/Y/Z as seen by the camera, far axes drawn first.
fn draw_axes(painter: &egui::Painter, origin: Pos2, camera: &OrbitCamera) {
    let to_camera = camera.orientation.inverse();
    let mut axes = [
        (to_camera * Vec3::X, Color32::RED, "X"),
        (to_camera * Vec3::Y, Color32::GREEN, "Y"),
        (to_camera * Vec3::Z, Color32::from_rgb(80, 120, 255), "Z"),
    ];
    axes.sort_by(|a, b| a.0.z.total_cmp(&b.0.z));

    for (dir, color, label) in axes {
        let end = origin + Vec2::new(dir.x, -dir.y) * AXIS_LENGTH;
        painter.line_segment([origin, end], Stroke::new(2.0, color));
        painter.text(
            end + Vec2::new(dir.x, -dir.y) * 8.0,
            Align2::CENTER_CENTER,
            label,
            FontId::proportional(12.0),
            color,
        );
    }
}
