use eframe::egui::{Color32, Mesh, Pos2, Rect, Vec2};
use glam::Vec3;

use super::camera::Projection;

/// A projected point ready to be drawn.
#[derive(Debug, Clone, Copy)]
struct Splat {
    pos: Pos2,
    depth: f32,
    color: Color32,
}

/// Project `points` into `rect` and build one mesh of screen-aligned squares.
///
/// Squares are emitted far-to-near so closer points cover further ones.
/// Returns the mesh and the number of points that landed on screen.
pub fn build_point_mesh(
    points: &[[f32; 3]],
    colors: &[Color32],
    projection: &Projection,
    rect: Rect,
    point_size: f32,
) -> (Mesh, usize) {
    let visible_area = rect.expand(point_size);

    let mut splats: Vec<Splat> = points
        .iter()
        .zip(colors)
        .filter_map(|(&p, &color)| {
            let sp = projection.project(Vec3::from(p))?;
            let pos = rect.min + Vec2::new(sp.pos.x, sp.pos.y);
            visible_area.contains(pos).then_some(Splat {
                pos,
                depth: sp.depth,
                color,
            })
        })
        .collect();

    splats.sort_unstable_by(|a, b| b.depth.total_cmp(&a.depth));

    let mut mesh = Mesh::default();
    mesh.reserve_triangles(splats.len() * 2);
    mesh.reserve_vertices(splats.len() * 4);
    let size = Vec2::splat(point_size);
    for splat in &splats {
        mesh.add_colored_rect(Rect::from_center_size(splat.pos, size), splat.color);
    }

    (mesh, splats.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Bounds;
    use crate::render::camera::{OrbitCamera, ViewPreset};
    use glam::Vec2 as GVec2;

    fn top_down_projection(size: GVec2) -> Projection {
        let mut camera = OrbitCamera::default();
        let bounds = Bounds {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        };
        camera.apply_preset(ViewPreset::BirdsEye, Some(&bounds));
        camera.projection(size)
    }

    #[test]
    fn nearer_points_are_drawn_last() {
        let rect = Rect::from_min_size(Pos2::new(10.0, 20.0), Vec2::new(400.0, 300.0));
        let projection = top_down_projection(GVec2::new(400.0, 300.0));
        let points = [[0.0, 0.0, 1.0], [0.0, 0.0, -1.0]];
        let colors = [Color32::RED, Color32::BLUE];

        let (mesh, visible) = build_point_mesh(&points, &colors, &projection, rect, 3.0);
        assert_eq!(visible, 2);
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.indices.len(), 12);
        // The low point (further from a top-down eye) comes first.
        assert_eq!(mesh.vertices[0].color, Color32::BLUE);
        assert_eq!(mesh.vertices[4].color, Color32::RED);
        // Offset by the viewport origin and centred on it.
        let center = rect.center();
        assert!((mesh.vertices[4].pos.x - (center.x - 1.5)).abs() < 1e-3);
    }

    #[test]
    fn off_screen_points_are_skipped() {
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(400.0, 300.0));
        let projection = top_down_projection(GVec2::new(400.0, 300.0));
        let points = [[0.0, 0.0, 0.0], [1e6, 0.0, 0.0], [f32::NAN, 0.0, 0.0]];
        let colors = [Color32::WHITE; 3];

        let (_, visible) = build_point_mesh(&points, &colors, &projection, rect, 2.0);
        assert_eq!(visible, 1);
    }
}
