//! Radio stack boundary
//!
//! Everything the core needs from the platform Bluetooth layer. The
//! production implementation lives in [`super::btle`]; tests use an
//! in-memory radio.

use crate::domain::error::RadioResult;
use crate::domain::models::{CapabilityRecord, PeripheralId};
use crate::domain::scan::ScanReport;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// OS-level capabilities required before any radio operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Scan,
    Connect,
    Location,
}

pub const REQUIRED_CAPABILITIES: [Capability; 3] =
    [Capability::Scan, Capability::Connect, Capability::Location];

/// Handle to a live radio link, returned by [`RadioStack::connect`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceLink {
    pub id: PeripheralId,
}

#[async_trait]
pub trait RadioStack: Send + Sync {
    /// Ask for all capabilities in one batched prompt.
    async fn request_capabilities(
        &self,
        capabilities: &[Capability],
    ) -> RadioResult<HashMap<Capability, bool>>;

    /// Begin unfiltered discovery. Reports arrive on the returned channel
    /// until [`RadioStack::stop_scan`] is called.
    async fn start_scan(&self) -> RadioResult<mpsc::UnboundedReceiver<ScanReport>>;

    async fn stop_scan(&self) -> RadioResult<()>;

    async fn connect(&self, id: &PeripheralId) -> RadioResult<DeviceLink>;

    /// Enumerate services and characteristics on a connected device.
    async fn discover_capabilities(&self, link: &DeviceLink) -> RadioResult<CapabilityRecord>;

    async fn disconnect(&self, id: &PeripheralId) -> RadioResult<()>;

    /// Stop any outstanding scan, drop links that are still up and give the
    /// adapter back.
    async fn release(&self) -> RadioResult<()>;
}
