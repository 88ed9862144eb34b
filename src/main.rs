mod app;
mod ui;

use app::RustyRosterApp;
use eframe::egui;
use rusty_roster::config::ViewerConfig;

fn main() -> eframe::Result {
    env_logger::init();

    let config = match ViewerConfig::load(".") {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Ignoring config: {e:#}");
            ViewerConfig::default()
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 720.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Roster – School Data Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(RustyRosterApp::new(config)))),
    )
}
