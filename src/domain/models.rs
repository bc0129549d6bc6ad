use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable identifier of a peripheral as reported by the radio stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeripheralId(String);

impl PeripheralId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw advertisement as delivered by a scan subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Advertisement {
    pub id: PeripheralId,
    pub name: Option<String>,
    pub signal_strength: i16,
}

/// Display-oriented record of a selectable peripheral.
///
/// Only named peripherals become a `Peripheral`; the signal strength is the
/// value seen when the advertisement was first collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peripheral {
    pub id: PeripheralId,
    pub name: String,
    pub signal_strength: i16,
}

impl Peripheral {
    /// Returns `None` for anonymous advertisements (no name, or an empty one).
    pub fn from_advertisement(adv: Advertisement) -> Option<Self> {
        let name = adv.name.filter(|n| !n.trim().is_empty())?;
        Some(Self {
            id: adv.id,
            name,
            signal_strength: adv.signal_strength,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanStatus {
    #[default]
    Idle,
    Scanning,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Failed,
}

/// The single "current" connection attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub peripheral: Peripheral,
    pub status: ConnectionStatus,
    pub capabilities_discovered: bool,
}

impl Connection {
    pub fn connecting(peripheral: Peripheral) -> Self {
        Self {
            peripheral,
            status: ConnectionStatus::Connecting,
            capabilities_discovered: false,
        }
    }
}

/// Services and characteristics enumerated on a connected device.
///
/// Owned by the radio layer and never mutated by the core; joined to a
/// [`Peripheral`] through `id`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CapabilityRecord {
    pub id: PeripheralId,
    pub services: Vec<ServiceRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRecord {
    pub uuid: uuid::Uuid,
    pub characteristics: Vec<uuid::Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityEstimate {
    pub distance_meters: f64,
    pub source_signal_strength: i16,
}

impl ProximityEstimate {
    /// Estimate from the signal strength captured in the scan result.
    pub fn from_selection(peripheral: &Peripheral) -> Self {
        Self {
            distance_meters: crate::domain::distance::estimate(peripheral.signal_strength),
            source_signal_strength: peripheral.signal_strength,
        }
    }

    /// Negative distances are the "unknown reading" sentinel.
    pub fn is_physical(&self) -> bool {
        self.distance_meters >= 0.0
    }
}

/// Events published by the controller towards the presentation layer.
#[derive(Debug, Clone)]
pub enum AppEvent {
    DevicesUpdated(Vec<Peripheral>),
    ScanStatus(bool),
    ConnectionStatus(ConnectionStatus),
    Connected(Peripheral),
    Distance(ProximityEstimate),
    LogMessage(StatusMessage),
}

/// User intents emitted by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UserIntent {
    ScanRequested,
    StopScanRequested,
    PeripheralSelected(PeripheralId),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub devices: Vec<Peripheral>,
    pub connected_device: Option<Peripheral>,
    pub connection_status: Option<ConnectionStatus>,
    pub distance: Option<ProximityEstimate>,
    pub is_scanning: bool,
    pub notification: Option<StatusMessage>,
}

impl ViewState {
    pub fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::DevicesUpdated(devices) => self.devices = devices,
            AppEvent::ScanStatus(scanning) => self.is_scanning = scanning,
            // the displayed device only changes once a new one is connected
            AppEvent::ConnectionStatus(status) => self.connection_status = Some(status),
            AppEvent::Connected(peripheral) => {
                self.connection_status = Some(ConnectionStatus::Connected);
                self.connected_device = Some(peripheral);
            }
            AppEvent::Distance(estimate) => self.distance = Some(estimate),
            AppEvent::LogMessage(msg) => self.notification = Some(msg),
        }
    }

    /// Distance formatted for display, hidden when the reading is not physical.
    pub fn distance_label(&self) -> Option<String> {
        self.distance
            .filter(ProximityEstimate::is_physical)
            .map(|d| format!("{:.2} m", d.distance_meters))
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peripheral(id: &str, rssi: i16) -> Peripheral {
        Peripheral {
            id: PeripheralId::new(id),
            name: "Tag".to_string(),
            signal_strength: rssi,
        }
    }

    #[test]
    fn test_anonymous_advertisements_are_rejected() {
        let unnamed = Advertisement {
            id: PeripheralId::new("a"),
            name: None,
            signal_strength: -60,
        };
        let blank = Advertisement {
            name: Some(String::new()),
            ..unnamed.clone()
        };
        assert!(Peripheral::from_advertisement(unnamed).is_none());
        assert!(Peripheral::from_advertisement(blank).is_none());
    }

    #[test]
    fn test_estimate_uses_selection_rssi() {
        let estimate = ProximityEstimate::from_selection(&peripheral("a", -59));
        assert_eq!(estimate.source_signal_strength, -59);
        assert_eq!(
            estimate.distance_meters,
            crate::domain::distance::estimate(-59)
        );
    }

    #[test]
    fn test_view_state_hides_sentinel_distance() {
        let mut state = ViewState::default();
        state.apply(AppEvent::Distance(ProximityEstimate::from_selection(
            &peripheral("a", 0),
        )));
        assert!(state.distance.is_some());
        assert_eq!(state.distance_label(), None);

        state.apply(AppEvent::Distance(ProximityEstimate::from_selection(
            &peripheral("a", -40),
        )));
        assert_eq!(state.distance_label().as_deref(), Some("0.02 m"));
    }

    #[test]
    fn test_failed_attempt_keeps_connected_device() {
        let mut state = ViewState::default();
        state.apply(AppEvent::Connected(peripheral("a", -40)));

        state.apply(AppEvent::ConnectionStatus(ConnectionStatus::Connecting));
        state.apply(AppEvent::ConnectionStatus(ConnectionStatus::Failed));
        assert_eq!(state.connected_device, Some(peripheral("a", -40)));
        assert_eq!(state.connection_status, Some(ConnectionStatus::Failed));

        state.apply(AppEvent::Connected(peripheral("b", -70)));
        assert_eq!(
            state.connected_device.as_ref().map(|p| p.id.as_str()),
            Some("b")
        );
    }
}
