use clap::Parser;
use eframe::egui;
use lidar_viewer::app::LidarViewerApp;
use lidar_viewer::config::Cli;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("LiDAR Visualizer")
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "LiDAR Visualizer",
        options,
        Box::new(move |cc| Ok(Box::new(LidarViewerApp::new(cc, &cli)))),
    )
}
