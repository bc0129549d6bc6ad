use crate::domain::models::{AppEvent, MessageSeverity, StatusMessage, UserIntent, ViewState};
use crate::domain::settings::SettingsService;
use crate::infrastructure::bluetooth::{BtleplugRadio, ProximityController};
use crate::infrastructure::logging::{init_logger, LoggingGuard};
use eframe::egui;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::error;

pub struct ProximityApp {
    pub(crate) intents: mpsc::UnboundedSender<UserIntent>,
    pub(crate) events: mpsc::UnboundedReceiver<AppEvent>,
    pub(crate) state: ViewState,

    worker: Option<JoinHandle<()>>,
    _logging_guard: Option<LoggingGuard>,
}

impl ProximityApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings_service = SettingsService::new().unwrap_or_else(|e| {
            eprintln!("Failed to locate settings, using local file: {}", e);
            SettingsService::with_path(PathBuf::from("settings.json"))
        });
        let settings = settings_service.get().clone();

        let logging_guard = init_logger(&settings.log_settings)
            .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
            .ok();

        tracing::info!("Starting BLE Proximity");

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();

        // The radio and its event loop live on their own single-threaded runtime
        let worker = std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create tokio runtime for Bluetooth: {}", e);
                    return;
                }
            };

            rt.block_on(async move {
                let radio = match BtleplugRadio::new(settings.adapter_index).await {
                    Ok(radio) => radio,
                    Err(e) => {
                        error!("Bluetooth unavailable: {}", e);
                        let _ = event_tx.send(AppEvent::LogMessage(StatusMessage {
                            message: format!("Bluetooth unavailable: {}", e),
                            severity: MessageSeverity::Error,
                        }));
                        return;
                    }
                };

                let controller = ProximityController::new(Arc::new(radio), event_tx, &settings);
                controller.run(intent_rx).await;
            });
        });

        Self {
            intents: intent_tx,
            events: event_rx,
            state: ViewState::default(),
            worker: Some(worker),
            _logging_guard: logging_guard,
        }
    }

    pub(crate) fn send(&self, intent: UserIntent) {
        if self.intents.send(intent).is_err() {
            tracing::warn!("Bluetooth worker is not running");
        }
    }
}

impl eframe::App for ProximityApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(event) = self.events.try_recv() {
            self.state.apply(event);
        }

        // Events arrive from the worker thread; poll for them
        ctx.request_repaint_after(Duration::from_millis(100));

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.set_max_width(480.0);
                    ui.add_space(12.0);
                    crate::presentation::home::render(self, ui);
                });
            });
        });
    }
}

impl Drop for ProximityApp {
    fn drop(&mut self) {
        let _ = self.intents.send(UserIntent::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                eprintln!("Bluetooth worker panicked during shutdown");
            }
        }
    }
}
