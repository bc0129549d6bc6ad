//! Proximity controller
//!
//! Coordinates permissions, scanning, connection and distance estimation,
//! and runs the single-threaded event loop that serves user intents.

use crate::domain::error::{ConnectionError, ProximityError, ScanError};
use crate::domain::models::{
    AppEvent, Connection, MessageSeverity, Peripheral, PeripheralId, ProximityEstimate,
    StatusMessage, UserIntent,
};
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::connection::ConnectionManager;
use crate::infrastructure::bluetooth::permissions::PermissionGate;
use crate::infrastructure::bluetooth::radio::RadioStack;
use crate::infrastructure::bluetooth::scanner::BleScanner;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub struct ProximityController<R: RadioStack + ?Sized> {
    radio: Arc<R>,
    scanner: BleScanner,
    connections: ConnectionManager,
    event_sender: mpsc::UnboundedSender<AppEvent>,
    released: bool,
}

impl<R: RadioStack + ?Sized> ProximityController<R> {
    /// Take ownership of the radio handle for the lifetime of the session.
    /// Call [`ProximityController::shutdown`] to release it.
    pub fn new(
        radio: Arc<R>,
        event_sender: mpsc::UnboundedSender<AppEvent>,
        settings: &Settings,
    ) -> Self {
        Self {
            radio,
            scanner: BleScanner::new(event_sender.clone(), settings.scan_timeout()),
            connections: ConnectionManager::new(event_sender.clone()),
            event_sender,
            released: false,
        }
    }

    /// Start a scan once permissions are confirmed.
    pub async fn request_scan(&mut self) -> Result<(), ScanError> {
        if self.scanner.is_scanning() {
            return Err(ScanError::AlreadyRunning);
        }
        if !PermissionGate::ensure_permissions(self.radio.as_ref()).await {
            return Err(ScanError::PermissionDenied);
        }
        self.scanner.start(self.radio.as_ref()).await
    }

    pub async fn stop_scan(&mut self) -> bool {
        self.scanner.stop(self.radio.as_ref()).await
    }

    /// Connect to `peripheral` and publish its distance estimate.
    ///
    /// The estimate comes from the signal strength captured in the scan
    /// result and is published whether or not the connection succeeds.
    pub async fn select_peripheral(
        &mut self,
        peripheral: Peripheral,
    ) -> Result<Connection, ConnectionError> {
        let estimate = ProximityEstimate::from_selection(&peripheral);
        info!(
            "Selected {} at {} dBm, estimated {:.2} m",
            peripheral.id, estimate.source_signal_strength, estimate.distance_meters
        );
        let _ = self.event_sender.send(AppEvent::Distance(estimate));

        self.connections
            .connect(self.radio.as_ref(), &mut self.scanner, peripheral)
            .await
    }

    /// Look up `id` in the current results and select it.
    ///
    /// Returns `None` when the id is not part of the result set.
    pub async fn select_by_id(
        &mut self,
        id: &PeripheralId,
    ) -> Option<Result<Connection, ConnectionError>> {
        let Some(peripheral) = self.scanner.find(id).cloned() else {
            warn!("Selected unknown peripheral {}", id);
            return None;
        };
        Some(self.select_peripheral(peripheral).await)
    }

    pub fn scanner(&self) -> &BleScanner {
        &self.scanner
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Serve intents until `Shutdown` or until the intent channel closes,
    /// then release the radio.
    pub async fn run(mut self, mut intents: mpsc::UnboundedReceiver<UserIntent>) {
        info!("Proximity controller started");
        loop {
            tokio::select! {
                intent = intents.recv() => {
                    let Some(intent) = intent else { break };
                    if self.handle_intent(intent).await.is_break() {
                        break;
                    }
                }
                signal = self.scanner.next_signal() => {
                    if let Err(e) = self.scanner.handle_signal(self.radio.as_ref(), signal).await {
                        self.surface(e.into());
                    }
                }
            }
        }
        self.shutdown().await;
    }

    async fn handle_intent(&mut self, intent: UserIntent) -> ControlFlow<()> {
        match intent {
            UserIntent::ScanRequested => {
                if let Err(e) = self.request_scan().await {
                    self.surface(e.into());
                }
            }
            UserIntent::StopScanRequested => {
                self.stop_scan().await;
            }
            UserIntent::PeripheralSelected(id) => {
                if let Some(Err(e)) = self.select_by_id(&id).await {
                    self.surface(e.into());
                }
            }
            UserIntent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Stop scanning, drop every open link and release the radio. Idempotent.
    pub async fn shutdown(&mut self) {
        if self.released {
            return;
        }
        info!("Releasing Bluetooth radio");
        self.scanner.stop(self.radio.as_ref()).await;
        self.connections.disconnect(self.radio.as_ref()).await;
        if let Err(e) = self.radio.release().await {
            warn!("Radio release failed: {}", e);
        }
        self.released = true;
    }

    fn surface(&self, err: ProximityError) {
        let severity = match err {
            ProximityError::Scan(ScanError::AlreadyRunning) => MessageSeverity::Warning,
            _ => MessageSeverity::Error,
        };
        error!("{}: {}", err.category(), err);
        let _ = self.event_sender.send(AppEvent::LogMessage(StatusMessage {
            message: format!("{}: {}", err.category(), err),
            severity,
        }));
    }
}
