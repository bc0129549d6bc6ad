use ble_proximity::presentation::app::ProximityApp;
use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 600.0])
            .with_title("BLE Proximity"),
        ..Default::default()
    };

    eframe::run_native(
        "BLE Proximity",
        options,
        Box::new(|cc| Ok(Box::new(ProximityApp::new(cc)))),
    )
}
