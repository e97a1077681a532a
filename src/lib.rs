//! LiDAR scan viewer: format loaders, orbit camera, colour maps and the egui front end.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod render;
pub mod state;
pub mod ui;
