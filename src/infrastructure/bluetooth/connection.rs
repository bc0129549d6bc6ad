//! BLE Connection Module
//!
//! Turns a selected peripheral into a live link and enumerates its services.

use crate::domain::error::{ConnectionError, ConnectionFailure, RadioError};
use crate::domain::models::{
    AppEvent, CapabilityRecord, Connection, ConnectionStatus, MessageSeverity, Peripheral,
    PeripheralId, StatusMessage,
};
use crate::infrastructure::bluetooth::radio::RadioStack;
use crate::infrastructure::bluetooth::scanner::BleScanner;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Owns the single current connection.
///
/// Links opened by earlier selections stay up until [`ConnectionManager::disconnect`],
/// so they are tracked separately from `current`.
pub struct ConnectionManager {
    current: Option<Connection>,
    capabilities: Option<CapabilityRecord>,
    links: Vec<PeripheralId>,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl ConnectionManager {
    pub fn new(event_sender: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            current: None,
            capabilities: None,
            links: Vec::new(),
            event_sender,
        }
    }

    /// Connect to `peripheral` and discover its services.
    ///
    /// Any running scan is halted first, whatever the outcome. One attempt
    /// per call; the previous connection object is replaced without
    /// disconnecting its link, which stays up until [`Self::disconnect`].
    pub async fn connect<R: RadioStack + ?Sized>(
        &mut self,
        radio: &R,
        scanner: &mut BleScanner,
        peripheral: Peripheral,
    ) -> Result<Connection, ConnectionError> {
        scanner.stop(radio).await;

        info!("Connecting to {} ({})", peripheral.name, peripheral.id);
        self.current = Some(Connection::connecting(peripheral.clone()));
        self.capabilities = None;
        let _ = self
            .event_sender
            .send(AppEvent::ConnectionStatus(ConnectionStatus::Connecting));

        let link = match radio.connect(&peripheral.id).await {
            Ok(link) => link,
            Err(e) => {
                let kind = match e {
                    RadioError::TimedOut => ConnectionFailure::Timeout,
                    other => ConnectionFailure::Refused(other.to_string()),
                };
                return Err(self.fail(peripheral, kind));
            }
        };
        if !self.links.contains(&link.id) {
            self.links.push(link.id.clone());
        }
        self.set_status(ConnectionStatus::Connected);
        info!("Link established, discovering services");

        let record = match radio.discover_capabilities(&link).await {
            Ok(record) => record,
            Err(e) => {
                self.links.retain(|id| id != &link.id);
                if let Err(e) = radio.disconnect(&link.id).await {
                    warn!("Failed to drop link after discovery error: {}", e);
                }
                return Err(self.fail(
                    peripheral,
                    ConnectionFailure::CapabilityDiscovery(e.to_string()),
                ));
            }
        };
        info!("Found {} service(s) on {}", record.services.len(), record.id);
        self.capabilities = Some(record);

        let connection = match self.current.as_mut() {
            Some(connection) => {
                connection.capabilities_discovered = true;
                connection.clone()
            }
            None => Connection {
                peripheral: peripheral.clone(),
                status: ConnectionStatus::Connected,
                capabilities_discovered: true,
            },
        };

        let _ = self.event_sender.send(AppEvent::Connected(peripheral.clone()));
        self.send_log(
            &format!("Connected to {}", peripheral.name),
            MessageSeverity::Success,
        );
        Ok(connection)
    }

    /// Drop every link opened so far, current or superseded. Best-effort.
    pub async fn disconnect<R: RadioStack + ?Sized>(&mut self, radio: &R) {
        self.current = None;
        self.capabilities = None;
        for id in self.links.drain(..) {
            info!("Disconnecting from {}", id);
            if let Err(e) = radio.disconnect(&id).await {
                warn!("Disconnect from {} failed: {}", id, e);
            }
        }
    }

    pub fn current(&self) -> Option<&Connection> {
        self.current.as_ref()
    }

    /// Ids of the links still open.
    pub fn open_links(&self) -> &[PeripheralId] {
        &self.links
    }

    /// Services found on the connected device, joined by peripheral id.
    pub fn capabilities(&self) -> Option<&CapabilityRecord> {
        self.capabilities.as_ref()
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if let Some(connection) = self.current.as_mut() {
            connection.status = status;
        }
        let _ = self.event_sender.send(AppEvent::ConnectionStatus(status));
    }

    fn fail(&mut self, peripheral: Peripheral, kind: ConnectionFailure) -> ConnectionError {
        error!("Connection to {} failed: {}", peripheral.id, kind);
        self.set_status(ConnectionStatus::Failed);
        ConnectionError { peripheral, kind }
    }

    fn send_log(&self, message: &str, severity: MessageSeverity) {
        let _ = self.event_sender.send(AppEvent::LogMessage(StatusMessage {
            message: message.to_string(),
            severity,
        }));
    }
}
