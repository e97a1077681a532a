/// Data layer: scan listing, file loading and the in-memory cloud.
///
/// Architecture:
/// ```text
///  directory ──► ScanDirectory (supported files, sorted)
///                      │ selected entry
///                      ▼
///   .pcd / .ply / .xyz / .bin / .npy
///                      │
///                      ▼
///                ┌──────────┐
///                │  loader  │  dispatch by extension → PointCloud
///                └──────────┘
///                      │
///                      ▼
///                ┌────────────┐
///                │ PointCloud │  Vec<[f32; 3]>, intensity, bounds
///                └────────────┘
/// ```

pub mod directory;
pub mod loader;
pub mod model;
pub mod npy;
