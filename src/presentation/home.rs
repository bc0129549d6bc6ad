use crate::domain::models::{PeripheralId, UserIntent};
use crate::presentation::app::ProximityApp;
use crate::presentation::components;
use eframe::egui;

pub fn render(app: &mut ProximityApp, ui: &mut egui::Ui) {
    ui.heading("BLE Proximity");
    ui.add_space(12.0);

    ui_notification(app, ui);
    ui_scan_panel(app, ui);
    ui.add_space(10.0);
    ui_proximity_panel(app, ui);
}

fn ui_notification(app: &mut ProximityApp, ui: &mut egui::Ui) {
    let Some(message) = app.state.notification.clone() else {
        return;
    };

    ui.horizontal(|ui| {
        ui.colored_label(components::severity_color(message.severity), &message.message);
        if ui.small_button("Dismiss").clicked() {
            app.state.dismiss_notification();
        }
    });
    ui.add_space(8.0);
}

fn ui_scan_panel(app: &mut ProximityApp, ui: &mut egui::Ui) {
    components::panel(ui, "Devices", |ui| {
        ui.horizontal(|ui| {
            if app.state.is_scanning {
                if ui.button("Stop Scan").clicked() {
                    app.send(UserIntent::StopScanRequested);
                }
                ui.spinner();
            } else if ui.button("Scan").clicked() {
                app.send(UserIntent::ScanRequested);
            }
        });

        if app.state.devices.is_empty() {
            ui.label("No devices found yet.");
            return;
        }

        ui.add_space(4.0);
        let connected = app.state.connected_device.as_ref().map(|p| p.id.clone());
        let mut selected: Option<PeripheralId> = None;
        for device in &app.state.devices {
            let is_connected = connected.as_ref() == Some(&device.id);
            let text = format!("{}  ({} dBm)", device.name, device.signal_strength);
            if ui
                .selectable_label(is_connected, text)
                .on_hover_text(device.id.as_str())
                .clicked()
            {
                selected = Some(device.id.clone());
            }
        }

        if let Some(id) = selected {
            app.send(UserIntent::PeripheralSelected(id));
        }
    });
}

fn ui_proximity_panel(app: &mut ProximityApp, ui: &mut egui::Ui) {
    components::panel(ui, "Proximity", |ui| {
        components::connection_banner(ui, app.state.connection_status);
        ui.add_space(6.0);

        match &app.state.connected_device {
            Some(device) => ui.label(format!("Device: {}", device.name)),
            None => ui.label("Device: none"),
        };

        match app.state.distance_label() {
            Some(label) => ui.label(format!("Estimated distance: {}", label)),
            None if app.state.distance.is_some() => ui.label("Estimated distance: unknown"),
            None => ui.label("Estimated distance: -"),
        };
    });
}
