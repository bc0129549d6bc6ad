//! BLE Scanner Module
//!
//! Drives a [`ScanSession`]: owns the radio subscription and the auto-stop
//! deadline, and publishes the result set as it grows.

use crate::domain::error::ScanError;
use crate::domain::models::{AppEvent, Peripheral, PeripheralId, ScanStatus};
use crate::domain::scan::{ScanOutcome, ScanReport, ScanSession};
use crate::infrastructure::bluetooth::radio::RadioStack;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Next thing that happened to a running scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanSignal {
    Report(ScanReport),
    SubscriptionClosed,
    TimedOut,
}

/// BLE Scanner for discovering nearby peripherals
pub struct BleScanner {
    session: ScanSession,
    reports: Option<mpsc::UnboundedReceiver<ScanReport>>,
    deadline: Option<Instant>,
    timeout: Duration,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl BleScanner {
    /// Create a new scanner that stops itself `timeout` after each start
    pub fn new(event_sender: mpsc::UnboundedSender<AppEvent>, timeout: Duration) -> Self {
        Self {
            session: ScanSession::new(),
            reports: None,
            deadline: None,
            timeout,
            event_sender,
        }
    }

    /// Start an unfiltered scan
    ///
    /// Rejected with [`ScanError::AlreadyRunning`] while a scan is in
    /// progress; the running scan and its deadline are left untouched.
    pub async fn start<R: RadioStack + ?Sized>(&mut self, radio: &R) -> Result<(), ScanError> {
        if self.session.is_scanning() {
            info!("Scan already running, ignoring start request");
            return Err(ScanError::AlreadyRunning);
        }

        let reports = radio
            .start_scan()
            .await
            .map_err(|e| ScanError::Transport(e.to_string()))?;

        let now = Instant::now();
        self.session.begin(now.into_std())?;
        self.reports = Some(reports);
        self.deadline = Some(now + self.timeout);

        info!("BLE scan started ({}s window)", self.timeout.as_secs());
        let _ = self.event_sender.send(AppEvent::DevicesUpdated(Vec::new()));
        let _ = self.event_sender.send(AppEvent::ScanStatus(true));
        Ok(())
    }

    /// Stop scanning. Returns false if no scan was running.
    pub async fn stop<R: RadioStack + ?Sized>(&mut self, radio: &R) -> bool {
        if !self.session.finish() {
            return false;
        }
        info!("Stopping BLE scan...");
        self.teardown(radio).await;
        info!("Scan stopped");
        true
    }

    /// Wait for the next report or the auto-stop deadline.
    ///
    /// Never resolves while no scan is running.
    pub async fn next_signal(&mut self) -> ScanSignal {
        let (Some(reports), Some(deadline)) = (self.reports.as_mut(), self.deadline) else {
            return std::future::pending().await;
        };

        tokio::select! {
            biased;
            _ = tokio::time::sleep_until(deadline) => ScanSignal::TimedOut,
            report = reports.recv() => match report {
                Some(report) => ScanSignal::Report(report),
                None => ScanSignal::SubscriptionClosed,
            },
        }
    }

    /// Apply a signal to the session. Transport failures end the session and
    /// are returned to the caller.
    pub async fn handle_signal<R: RadioStack + ?Sized>(
        &mut self,
        radio: &R,
        signal: ScanSignal,
    ) -> Result<(), ScanError> {
        let outcome = match signal {
            ScanSignal::Report(report) => self.session.record(report),
            ScanSignal::SubscriptionClosed => self
                .session
                .record(ScanReport::Failed("scan subscription closed".to_string())),
            ScanSignal::TimedOut => {
                info!("Scan window elapsed");
                self.stop(radio).await;
                return Ok(());
            }
        };

        match outcome {
            ScanOutcome::Added => {
                debug!("Discovered {} device(s)", self.session.results().len());
                let _ = self
                    .event_sender
                    .send(AppEvent::DevicesUpdated(self.session.results().to_vec()));
                Ok(())
            }
            ScanOutcome::Ignored => Ok(()),
            ScanOutcome::Failed(message) => {
                warn!("Scan failed: {}", message);
                self.teardown(radio).await;
                Err(ScanError::Transport(message))
            }
        }
    }

    /// Check if currently scanning
    pub fn is_scanning(&self) -> bool {
        self.session.is_scanning()
    }

    pub fn status(&self) -> ScanStatus {
        self.session.status()
    }

    pub fn results(&self) -> &[Peripheral] {
        self.session.results()
    }

    pub fn find(&self, id: &PeripheralId) -> Option<&Peripheral> {
        self.session.results().iter().find(|p| &p.id == id)
    }

    async fn teardown<R: RadioStack + ?Sized>(&mut self, radio: &R) {
        self.reports = None;
        self.deadline = None;
        if let Err(e) = radio.stop_scan().await {
            warn!("Radio did not stop scanning cleanly: {}", e);
        }
        let _ = self.event_sender.send(AppEvent::ScanStatus(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::radio::mock::MockRadio;

    const WINDOW: Duration = Duration::from_secs(10);

    fn scanner() -> (BleScanner, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (BleScanner::new(tx, WINDOW), rx)
    }

    async fn pump(scanner: &mut BleScanner, radio: &MockRadio) -> Result<(), ScanError> {
        let signal = scanner.next_signal().await;
        scanner.handle_signal(radio, signal).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_stop_after_exactly_ten_seconds() {
        let radio = MockRadio::granting_all();
        let (mut scanner, _events) = scanner();
        let started = Instant::now();
        scanner.start(&radio).await.unwrap();

        let early = tokio::time::timeout(Duration::from_millis(9_900), scanner.next_signal()).await;
        assert!(early.is_err());
        assert!(scanner.is_scanning());

        let signal = scanner.next_signal().await;
        assert_eq!(signal, ScanSignal::TimedOut);
        let elapsed = Instant::now() - started;
        assert!(elapsed >= WINDOW && elapsed < WINDOW + Duration::from_millis(2));

        scanner.handle_signal(&radio, signal).await.unwrap();
        assert_eq!(scanner.status(), ScanStatus::Stopped);
        assert_eq!(radio.stop_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_stop_cancels_auto_stop() {
        let radio = MockRadio::granting_all();
        let (mut scanner, _events) = scanner();
        scanner.start(&radio).await.unwrap();

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(scanner.stop(&radio).await);
        assert!(!scanner.stop(&radio).await);
        assert_eq!(radio.stop_calls(), 1);

        let later = tokio::time::timeout(Duration::from_secs(30), scanner.next_signal()).await;
        assert!(later.is_err());
        assert_eq!(radio.stop_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_scanning_is_rejected() {
        let radio = MockRadio::granting_all();
        let (mut scanner, _events) = scanner();
        scanner.start(&radio).await.unwrap();
        radio.advertise("A", Some("Tag"), -60);
        pump(&mut scanner, &radio).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(scanner.start(&radio).await, Err(ScanError::AlreadyRunning));
        assert_eq!(radio.scans_started(), 1);
        assert_eq!(scanner.results().len(), 1);

        // the original deadline still applies
        let signal = tokio::time::timeout(Duration::from_secs(7), scanner.next_signal())
            .await
            .unwrap();
        assert_eq!(signal, ScanSignal::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_discoveries_are_published_deduplicated() {
        let radio = MockRadio::granting_all();
        let (mut scanner, mut events) = scanner();
        scanner.start(&radio).await.unwrap();

        radio.advertise("A", Some("X"), -59);
        radio.advertise("B", Some(""), 0);
        radio.advertise("A", Some("X"), -45);
        radio.advertise("C", Some("X"), -59);
        for _ in 0..4 {
            pump(&mut scanner, &radio).await.unwrap();
        }

        let ids: Vec<_> = scanner.results().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);

        let mut updates = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let AppEvent::DevicesUpdated(devices) = event {
                updates.push(devices.len());
            }
        }
        // cleared on start, then one update per new device
        assert_eq!(updates, vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_ends_session() {
        let radio = MockRadio::granting_all();
        let (mut scanner, _events) = scanner();
        scanner.start(&radio).await.unwrap();

        radio.emit(ScanReport::Failed("adapter powered off".to_string()));
        let result = pump(&mut scanner, &radio).await;
        assert_eq!(
            result,
            Err(ScanError::Transport("adapter powered off".to_string()))
        );
        assert_eq!(scanner.status(), ScanStatus::Stopped);
        assert_eq!(radio.stop_calls(), 1);

        // a new user-initiated scan may start again
        scanner.start(&radio).await.unwrap();
        assert_eq!(radio.scans_started(), 2);
    }

    #[tokio::test]
    async fn test_scan_lifecycle_sends_no_notifications() {
        let radio = MockRadio::granting_all();
        let (mut scanner, mut events) = scanner();
        scanner.start(&radio).await.unwrap();
        scanner.stop(&radio).await;

        let mut scan_status = Vec::new();
        while let Ok(event) = events.try_recv() {
            match event {
                AppEvent::ScanStatus(scanning) => scan_status.push(scanning),
                AppEvent::LogMessage(msg) => panic!("unexpected notification: {:?}", msg),
                _ => {}
            }
        }
        assert_eq!(scan_status, vec![true, false]);
    }

    #[tokio::test]
    async fn test_start_failure_leaves_scanner_idle() {
        let radio = MockRadio::granting_all();
        radio.fail_scan_start("busy");
        let (mut scanner, _events) = scanner();

        assert!(matches!(
            scanner.start(&radio).await,
            Err(ScanError::Transport(_))
        ));
        assert_eq!(scanner.status(), ScanStatus::Idle);
    }
}
