use crate::domain::models::Peripheral;
use thiserror::Error;

/// Failure reported by the radio stack.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RadioError {
    #[error("no Bluetooth adapter available")]
    NoAdapter,
    #[error("unknown peripheral: {0}")]
    UnknownPeripheral(String),
    #[error("operation timed out")]
    TimedOut,
    #[error("{0}")]
    Transport(String),
}

pub type RadioResult<T> = Result<T, RadioError>;

impl From<btleplug::Error> for RadioError {
    fn from(value: btleplug::Error) -> Self {
        match value {
            btleplug::Error::DeviceNotFound => Self::UnknownPeripheral(value.to_string()),
            btleplug::Error::TimedOut(_) => Self::TimedOut,
            other => Self::Transport(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScanError {
    #[error("a scan is already running")]
    AlreadyRunning,
    #[error("Bluetooth permissions were not granted")]
    PermissionDenied,
    #[error("scan failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConnectionFailure {
    #[error("connection refused: {0}")]
    Refused(String),
    #[error("connection timed out")]
    Timeout,
    #[error("capability discovery failed: {0}")]
    CapabilityDiscovery(String),
}

/// A failed connection attempt. The peripheral stays available for another try.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("could not connect to {}: {kind}", .peripheral.name)]
pub struct ConnectionError {
    pub peripheral: Peripheral,
    pub kind: ConnectionFailure,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProximityError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl ProximityError {
    /// Short user-facing failure category.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Scan(ScanError::PermissionDenied) => "Permission denied",
            Self::Scan(ScanError::AlreadyRunning) => "Scan in progress",
            Self::Scan(ScanError::Transport(_)) => "Scan failed",
            Self::Connection(ConnectionError {
                kind: ConnectionFailure::CapabilityDiscovery(_),
                ..
            }) => "Service discovery failed",
            Self::Connection(_) => "Connection failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PeripheralId;

    #[test]
    fn test_capability_discovery_is_a_connection_error() {
        let err: ProximityError = ConnectionError {
            peripheral: Peripheral {
                id: PeripheralId::new("p1"),
                name: "Beacon".to_string(),
                signal_strength: -70,
            },
            kind: ConnectionFailure::CapabilityDiscovery("gatt".to_string()),
        }
        .into();

        assert!(matches!(err, ProximityError::Connection(_)));
        assert_eq!(err.category(), "Service discovery failed");
        assert_eq!(
            err.to_string(),
            "could not connect to Beacon: capability discovery failed: gatt"
        );
    }

    #[test]
    fn test_btleplug_errors_map_to_radio_errors() {
        let timeout = btleplug::Error::TimedOut(std::time::Duration::from_secs(30));
        assert_eq!(RadioError::from(timeout), RadioError::TimedOut);
        assert!(matches!(
            RadioError::from(btleplug::Error::DeviceNotFound),
            RadioError::UnknownPeripheral(_)
        ));
        assert!(matches!(
            RadioError::from(btleplug::Error::NotConnected),
            RadioError::Transport(_)
        ));
    }

    #[test]
    fn test_permission_category() {
        let err = ProximityError::from(ScanError::PermissionDenied);
        assert_eq!(err.category(), "Permission denied");
    }
}
