//! Widgets shared by the proximity screen.

use crate::domain::models::{ConnectionStatus, MessageSeverity};
use eframe::egui;

/// Titled group box used for each panel of the screen.
pub fn panel<R>(
    ui: &mut egui::Ui,
    title: &str,
    add_contents: impl FnOnce(&mut egui::Ui) -> R,
) -> R {
    ui.group(|ui| {
        ui.set_width(ui.available_width());
        ui.strong(title);
        ui.separator();
        add_contents(ui)
    })
    .inner
}

/// Full-width banner describing the current connection attempt.
pub fn connection_banner(ui: &mut egui::Ui, status: Option<ConnectionStatus>) {
    let (text, fill) = match status {
        Some(ConnectionStatus::Connected) => ("CONNECTED", egui::Color32::from_rgb(0, 200, 0)),
        Some(ConnectionStatus::Connecting) => {
            ("CONNECTING...", egui::Color32::from_rgb(255, 200, 0))
        }
        Some(ConnectionStatus::Failed) => {
            ("CONNECTION FAILED", egui::Color32::from_rgb(255, 50, 50))
        }
        None => ("NOT CONNECTED", egui::Color32::from_gray(100)),
    };
    // dark text only reads well on the bright fills
    let text_color = match status {
        Some(ConnectionStatus::Connected | ConnectionStatus::Connecting) => egui::Color32::BLACK,
        _ => egui::Color32::WHITE,
    };

    egui::Frame::default()
        .fill(fill)
        .rounding(4.0)
        .inner_margin(egui::Margin::symmetric(8.0, 6.0))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(egui::RichText::new(text).color(text_color).strong());
        });
}

pub fn severity_color(severity: MessageSeverity) -> egui::Color32 {
    match severity {
        MessageSeverity::Info => egui::Color32::from_gray(120),
        MessageSeverity::Success => egui::Color32::from_rgb(0, 160, 0),
        MessageSeverity::Warning => egui::Color32::from_rgb(200, 140, 0),
        MessageSeverity::Error => egui::Color32::from_rgb(220, 50, 50),
    }
}
