/// Software projection of the scan onto the egui viewport.
///
/// `camera` owns the orbit state and the world → screen mapping,
/// `points` turns a projected cloud into a single egui mesh.
pub mod camera;
pub mod points;
