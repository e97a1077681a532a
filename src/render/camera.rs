use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4Swizzles};

use crate::data::model::Bounds;

/// Radians of rotation per dragged pixel.
const ORBIT_SPEED: f32 = 0.008;
/// Exponential zoom factor per scrolled point.
const ZOOM_SPEED: f32 = 0.002;
const MIN_DISTANCE: f32 = 1e-4;
/// Extra room around the bounding sphere when framing.
const FIT_MARGIN: f32 = 1.1;

// ---------------------------------------------------------------------------
// View presets
// ---------------------------------------------------------------------------

/// Fixed camera orientations, named after the plane they look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPreset {
    /// XY plane from above, +Y up on screen.
    BirdsEye,
    /// XZ plane from −Y, +Z up.
    Front,
    /// YZ plane from +X, +Z up.
    Side,
    /// From the (1, 1, 1) octant, +Z up.
    Isometric,
}

impl ViewPreset {
    pub const ALL: [ViewPreset; 4] = [
        ViewPreset::BirdsEye,
        ViewPreset::Front,
        ViewPreset::Side,
        ViewPreset::Isometric,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ViewPreset::BirdsEye => "Bird's Eye View (Top)",
            ViewPreset::Front => "Front View",
            ViewPreset::Side => "Side View",
            ViewPreset::Isometric => "Isometric (3D)",
        }
    }

    /// Direction from the focus towards the eye, and the screen-up vector.
    fn direction_and_up(self) -> (Vec3, Vec3) {
        match self {
            ViewPreset::BirdsEye => (Vec3::Z, Vec3::Y),
            ViewPreset::Front => (Vec3::NEG_Y, Vec3::Z),
            ViewPreset::Side => (Vec3::X, Vec3::Z),
            ViewPreset::Isometric => (Vec3::ONE, Vec3::Z),
        }
    }
}

// ---------------------------------------------------------------------------
// Orbit camera
// ---------------------------------------------------------------------------

/// A camera orbiting a focus point.
///
/// Camera space follows the OpenGL convention: the camera looks down −Z with +Y up.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    /// World point the camera orbits around.
    pub focus: Vec3,
    /// Distance from the eye to [`Self::focus`].
    pub distance: f32,
    /// Rotation from camera space to world space.
    pub orientation: Quat,
    /// Vertical field of view in radians.
    pub fov_y: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        let mut camera = Self {
            focus: Vec3::ZERO,
            distance: 10.0,
            orientation: Quat::IDENTITY,
            fov_y: 30f32.to_radians(),
        };
        let (dir, up) = ViewPreset::Isometric.direction_and_up();
        camera.look_from(dir, up);
        camera
    }
}

impl OrbitCamera {
    pub fn eye(&self) -> Vec3 {
        self.focus + self.orientation * Vec3::Z * self.distance
    }

    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    /// Orient the camera so the eye sits along `direction` from the focus.
    pub fn look_from(&mut self, direction: Vec3, up: Vec3) {
        let back = direction.normalize();
        let right = up.cross(back).normalize();
        let true_up = back.cross(right);
        self.orientation = Quat::from_mat3(&Mat3::from_cols(right, true_up, back)).normalize();
    }

    /// Jump to a preset orientation and frame `bounds` if given.
    pub fn apply_preset(&mut self, preset: ViewPreset, bounds: Option<&Bounds>) {
        let (dir, up) = preset.direction_and_up();
        self.look_from(dir, up);
        if let Some(bounds) = bounds {
            self.fit(bounds);
        }
        log::debug!("Camera preset {preset:?}");
    }

    /// Centre on `bounds` and back off until the bounding sphere fits vertically.
    /// The orientation is kept.
    pub fn fit(&mut self, bounds: &Bounds) {
        let radius = bounds.radius().max(MIN_DISTANCE);
        self.focus = bounds.center();
        self.distance = radius * FIT_MARGIN / (self.fov_y * 0.5).sin();
    }

    /// Turntable rotation: horizontal drag spins about world Z, vertical drag tilts.
    pub fn orbit(&mut self, drag: Vec2) {
        let yaw = Quat::from_rotation_z(-drag.x * ORBIT_SPEED);
        let pitch = Quat::from_rotation_x(-drag.y * ORBIT_SPEED);
        self.orientation = (yaw * self.orientation * pitch).normalize();
    }

    /// Move the focus so that the scene follows the cursor.
    pub fn pan(&mut self, drag: Vec2, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        let world_per_px = 2.0 * self.distance * (self.fov_y * 0.5).tan() / viewport_height;
        self.focus += (-self.right() * drag.x + self.up() * drag.y) * world_per_px;
    }

    /// Positive `scroll` zooms in.
    pub fn zoom(&mut self, scroll: f32) {
        self.distance = (self.distance * (-scroll * ZOOM_SPEED).exp()).max(MIN_DISTANCE);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.focus, self.up())
    }

    /// Projection for a viewport of `size` pixels.
    pub fn projection(&self, size: Vec2) -> Projection {
        let aspect = if size.y > 0.0 { size.x / size.y } else { 1.0 };
        let near = self.distance * 1e-3;
        let far = self.distance * 1e3;
        let proj = Mat4::perspective_rh(self.fov_y, aspect, near, far);
        Projection {
            view_proj: proj * self.view_matrix(),
            size,
        }
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// A point mapped to the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    /// Pixels from the viewport's top-left corner.
    pub pos: Vec2,
    /// Distance along the view direction; larger is further away.
    pub depth: f32,
}

/// World-to-viewport mapping frozen for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    view_proj: Mat4,
    size: Vec2,
}

impl Projection {
    /// `None` for points outside the near/far range or non-finite points.
    pub fn project(&self, point: Vec3) -> Option<ScreenPoint> {
        let clip = self.view_proj * point.extend(1.0);
        if !clip.is_finite() || clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        // glam's perspective_rh maps depth to [0, 1].
        if !(0.0..=1.0).contains(&ndc.z) {
            return None;
        }
        let pos = Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.size.x,
            (1.0 - ndc.y) * 0.5 * self.size.y,
        );
        Some(ScreenPoint {
            pos,
            depth: clip.w,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);

    fn unit_bounds() -> Bounds {
        Bounds {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        }
    }

    fn camera_for(preset: ViewPreset) -> OrbitCamera {
        let mut camera = OrbitCamera::default();
        camera.apply_preset(preset, Some(&unit_bounds()));
        camera
    }

    #[test]
    fn focus_projects_to_viewport_center() {
        let camera = camera_for(ViewPreset::Isometric);
        let p = camera.projection(VIEWPORT).project(camera.focus).unwrap();
        assert_relative_eq!(p.pos.x, 400.0, epsilon = 1e-3);
        assert_relative_eq!(p.pos.y, 300.0, epsilon = 1e-3);
        assert_relative_eq!(p.depth, camera.distance, epsilon = 1e-3);
    }

    #[test]
    fn birds_eye_looks_down_with_y_up() {
        let camera = camera_for(ViewPreset::BirdsEye);
        assert_relative_eq!(camera.eye().z, camera.distance, epsilon = 1e-4);

        let proj = camera.projection(VIEWPORT);
        let north = proj.project(Vec3::new(0.0, 0.5, 0.0)).unwrap();
        let east = proj.project(Vec3::new(0.5, 0.0, 0.0)).unwrap();
        assert!(north.pos.y < 300.0);
        assert!(east.pos.x > 400.0);
    }

    #[test]
    fn front_view_sees_x_right_and_z_up() {
        let camera = camera_for(ViewPreset::Front);
        assert!(camera.eye().y < 0.0);

        let proj = camera.projection(VIEWPORT);
        let right = proj.project(Vec3::new(0.5, 0.0, 0.0)).unwrap();
        let top = proj.project(Vec3::new(0.0, 0.0, 0.5)).unwrap();
        assert!(right.pos.x > 400.0);
        assert!(top.pos.y < 300.0);
    }

    #[test]
    fn side_view_sees_y_right() {
        let camera = camera_for(ViewPreset::Side);
        assert!(camera.eye().x > 0.0);

        let p = camera
            .projection(VIEWPORT)
            .project(Vec3::new(0.0, 0.5, 0.0))
            .unwrap();
        assert!(p.pos.x > 400.0);
    }

    #[test]
    fn fitted_bounds_stay_inside_viewport() {
        let camera = camera_for(ViewPreset::Isometric);
        let proj = camera.projection(VIEWPORT);
        for corner in 0..8 {
            let pick = |bit: usize| if corner & bit == 0 { -1.0 } else { 1.0 };
            let p = proj.project(Vec3::new(pick(1), pick(2), pick(4))).unwrap();
            assert!((0.0..=VIEWPORT.x).contains(&p.pos.x));
            assert!((0.0..=VIEWPORT.y).contains(&p.pos.y));
        }
    }

    #[test]
    fn points_behind_the_eye_are_culled() {
        let camera = camera_for(ViewPreset::BirdsEye);
        let behind = camera.eye() + Vec3::Z;
        assert!(camera.projection(VIEWPORT).project(behind).is_none());
        assert!(camera
            .projection(VIEWPORT)
            .project(Vec3::splat(f32::NAN))
            .is_none());
    }

    #[test]
    fn zoom_and_pan_move_the_camera() {
        let mut camera = camera_for(ViewPreset::BirdsEye);
        let before = camera.distance;
        camera.zoom(100.0);
        assert!(camera.distance < before);

        // Dragging right moves the scene right, so the focus moves left (−X).
        camera.pan(Vec2::new(50.0, 0.0), VIEWPORT.y);
        assert!(camera.focus.x < 0.0);
    }

    #[test]
    fn orbit_keeps_distance() {
        let mut camera = camera_for(ViewPreset::Isometric);
        let eye_dist = (camera.eye() - camera.focus).length();
        camera.orbit(Vec2::new(120.0, -45.0));
        assert_relative_eq!((camera.eye() - camera.focus).length(), eye_dist, epsilon = 1e-3);
    }
}
