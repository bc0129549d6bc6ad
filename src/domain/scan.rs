//! Scan session state machine
//!
//! Tracks the lifecycle of one discovery window and the deduplicated,
//! discovery-ordered result set. Timing and radio I/O live in the scanner.

use crate::domain::error::ScanError;
use crate::domain::models::{Advertisement, Peripheral, ScanStatus};
use std::time::Instant;

/// One item delivered by a scan subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanReport {
    Discovered(Advertisement),
    Failed(String),
}

/// What a single report did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// A new peripheral was appended.
    Added,
    /// Anonymous, duplicate, or arrived outside a running scan.
    Ignored,
    /// Transport error; the session is now stopped.
    Failed(String),
}

#[derive(Debug, Default)]
pub struct ScanSession {
    status: ScanStatus,
    results: Vec<Peripheral>,
    started_at: Option<Instant>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new discovery window, dropping the previous results.
    pub fn begin(&mut self, at: Instant) -> Result<(), ScanError> {
        if self.status == ScanStatus::Scanning {
            return Err(ScanError::AlreadyRunning);
        }
        self.results.clear();
        self.status = ScanStatus::Scanning;
        self.started_at = Some(at);
        Ok(())
    }

    pub fn record(&mut self, report: ScanReport) -> ScanOutcome {
        if self.status != ScanStatus::Scanning {
            return ScanOutcome::Ignored;
        }

        match report {
            ScanReport::Failed(message) => {
                self.status = ScanStatus::Stopped;
                ScanOutcome::Failed(message)
            }
            ScanReport::Discovered(adv) => {
                let Some(peripheral) = Peripheral::from_advertisement(adv) else {
                    return ScanOutcome::Ignored;
                };
                if self.results.iter().any(|p| p.id == peripheral.id) {
                    return ScanOutcome::Ignored;
                }
                self.results.push(peripheral);
                ScanOutcome::Added
            }
        }
    }

    /// Transition to `Stopped`. Returns false when no scan was running.
    pub fn finish(&mut self) -> bool {
        if self.status != ScanStatus::Scanning {
            return false;
        }
        self.status = ScanStatus::Stopped;
        true
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn is_scanning(&self) -> bool {
        self.status == ScanStatus::Scanning
    }

    pub fn results(&self) -> &[Peripheral] {
        &self.results
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PeripheralId;

    fn adv(id: &str, name: Option<&str>, rssi: i16) -> ScanReport {
        ScanReport::Discovered(Advertisement {
            id: PeripheralId::new(id),
            name: name.map(str::to_string),
            signal_strength: rssi,
        })
    }

    fn ids(session: &ScanSession) -> Vec<&str> {
        session.results().iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_duplicate_ids_are_dropped() {
        let mut session = ScanSession::new();
        session.begin(Instant::now()).unwrap();

        assert_eq!(session.record(adv("A", Some("X"), -59)), ScanOutcome::Added);
        assert_eq!(session.record(adv("A", Some("X"), -40)), ScanOutcome::Ignored);
        assert_eq!(ids(&session), vec!["A"]);
        // first sighting wins
        assert_eq!(session.results()[0].signal_strength, -59);
    }

    #[test]
    fn test_nameless_peripherals_are_dropped() {
        let mut session = ScanSession::new();
        session.begin(Instant::now()).unwrap();

        assert_eq!(session.record(adv("B", Some(""), 0)), ScanOutcome::Ignored);
        assert_eq!(session.record(adv("D", None, -70)), ScanOutcome::Ignored);
        assert!(session.results().is_empty());
    }

    #[test]
    fn test_same_name_distinct_ids_are_kept_in_order() {
        let mut session = ScanSession::new();
        session.begin(Instant::now()).unwrap();

        session.record(adv("A", Some("X"), -59));
        session.record(adv("B", Some(""), 0));
        session.record(adv("C", Some("X"), -59));
        assert_eq!(ids(&session), vec!["A", "C"]);
    }

    #[test]
    fn test_begin_while_scanning_is_rejected() {
        let mut session = ScanSession::new();
        let first = Instant::now();
        session.begin(first).unwrap();
        session.record(adv("A", Some("X"), -59));

        assert_eq!(session.begin(Instant::now()), Err(ScanError::AlreadyRunning));
        assert_eq!(ids(&session), vec!["A"]);
        assert_eq!(session.started_at(), Some(first));
    }

    #[test]
    fn test_restart_clears_previous_results() {
        let mut session = ScanSession::new();
        session.begin(Instant::now()).unwrap();
        session.record(adv("A", Some("X"), -59));
        assert!(session.finish());

        session.begin(Instant::now()).unwrap();
        assert!(session.results().is_empty());
        assert_eq!(session.status(), ScanStatus::Scanning);
    }

    #[test]
    fn test_transport_error_stops_session() {
        let mut session = ScanSession::new();
        session.begin(Instant::now()).unwrap();
        session.record(adv("A", Some("X"), -59));

        let outcome = session.record(ScanReport::Failed("adapter off".to_string()));
        assert_eq!(outcome, ScanOutcome::Failed("adapter off".to_string()));
        assert_eq!(session.status(), ScanStatus::Stopped);

        // late reports have no effect
        assert_eq!(session.record(adv("E", Some("Y"), -60)), ScanOutcome::Ignored);
        assert_eq!(ids(&session), vec!["A"]);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut session = ScanSession::new();
        assert!(!session.finish());
        assert_eq!(session.status(), ScanStatus::Idle);

        session.begin(Instant::now()).unwrap();
        assert!(session.finish());
        assert!(!session.finish());
        assert_eq!(session.status(), ScanStatus::Stopped);
    }
}
