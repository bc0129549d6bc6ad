//! btleplug-backed radio stack
//!
//! Desktop hosts have no runtime permission prompt, so capabilities are
//! reported as granted once an adapter has been acquired.

use crate::domain::error::{RadioError, RadioResult};
use crate::domain::models::{Advertisement, CapabilityRecord, PeripheralId, ServiceRecord};
use crate::domain::scan::ScanReport;
use crate::infrastructure::bluetooth::radio::{Capability, DeviceLink, RadioStack};
use async_trait::async_trait;
use btleplug::api::{BDAddr, Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type PeripheralCache = Arc<Mutex<HashMap<PeripheralId, Peripheral>>>;

pub struct BtleplugRadio {
    adapter: Adapter,
    peripherals: PeripheralCache,
    scan_task: Mutex<Option<JoinHandle<()>>>,
}

impl BtleplugRadio {
    /// Acquire the host adapter at `adapter_index`.
    pub async fn new(adapter_index: usize) -> anyhow::Result<Self> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .nth(adapter_index)
            .ok_or_else(|| anyhow::anyhow!("No Bluetooth adapter at index {}", adapter_index))?;

        match adapter.adapter_info().await {
            Ok(name) => info!("Using Bluetooth adapter: {}", name),
            Err(e) => warn!("Could not read adapter info: {}", e),
        }

        Ok(Self {
            adapter,
            peripherals: Arc::new(Mutex::new(HashMap::new())),
            scan_task: Mutex::new(None),
        })
    }

    fn cache(&self) -> RadioResult<MutexGuard<'_, HashMap<PeripheralId, Peripheral>>> {
        self.peripherals
            .lock()
            .map_err(|_| RadioError::Transport("peripheral cache poisoned".into()))
    }

    fn lookup(&self, id: &PeripheralId) -> RadioResult<Peripheral> {
        self.cache()?
            .get(id)
            .cloned()
            .ok_or_else(|| RadioError::UnknownPeripheral(id.to_string()))
    }

    fn abort_scan_task(&self) {
        if let Ok(mut task) = self.scan_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}

/// Stable key for a btleplug peripheral. Some platforms hide the MAC
/// address, in which case the platform id is used.
fn peripheral_key(peripheral: &Peripheral) -> PeripheralId {
    let address = peripheral.address();
    if address == BDAddr::default() {
        PeripheralId::new(format!("{:?}", peripheral.id()))
    } else {
        PeripheralId::new(address.to_string())
    }
}

async fn read_advertisement(
    adapter: &Adapter,
    id: &btleplug::platform::PeripheralId,
) -> RadioResult<Option<(Peripheral, Advertisement)>> {
    let peripheral = adapter.peripheral(id).await?;
    let Some(props) = peripheral.properties().await? else {
        return Ok(None);
    };
    // advertisements without a reading are not usable for ranging
    let Some(rssi) = props.rssi else {
        return Ok(None);
    };

    let advertisement = Advertisement {
        id: peripheral_key(&peripheral),
        name: props.local_name,
        signal_strength: rssi,
    };
    Ok(Some((peripheral, advertisement)))
}

/// A device that vanished or whose properties could not be read is skipped;
/// only the event stream ending stops the scan.
fn usable<P>(id: &impl std::fmt::Debug, read: RadioResult<Option<P>>) -> Option<P> {
    match read {
        Ok(found) => found,
        Err(e) => {
            warn!("Skipping advertisement from {:?}: {}", id, e);
            None
        }
    }
}

#[async_trait]
impl RadioStack for BtleplugRadio {
    async fn request_capabilities(
        &self,
        capabilities: &[Capability],
    ) -> RadioResult<HashMap<Capability, bool>> {
        Ok(capabilities.iter().map(|c| (*c, true)).collect())
    }

    async fn start_scan(&self) -> RadioResult<mpsc::UnboundedReceiver<ScanReport>> {
        self.abort_scan_task();

        let mut events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let adapter = self.adapter.clone();
        let cache = self.peripherals.clone();

        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => continue,
                };

                let Some((peripheral, advertisement)) =
                    usable(&id, read_advertisement(&adapter, &id).await)
                else {
                    continue;
                };
                if let Ok(mut known) = cache.lock() {
                    known.insert(advertisement.id.clone(), peripheral);
                }
                if tx.send(ScanReport::Discovered(advertisement)).is_err() {
                    debug!("Scan receiver dropped");
                    return;
                }
            }
            warn!("Adapter event stream ended");
            let _ = tx.send(ScanReport::Failed("adapter event stream ended".into()));
        });

        if let Ok(mut slot) = self.scan_task.lock() {
            *slot = Some(task);
        }
        Ok(rx)
    }

    async fn stop_scan(&self) -> RadioResult<()> {
        self.abort_scan_task();
        self.adapter.stop_scan().await?;
        Ok(())
    }

    async fn connect(&self, id: &PeripheralId) -> RadioResult<DeviceLink> {
        let peripheral = self.lookup(id)?;
        if !peripheral.is_connected().await? {
            peripheral.connect().await?;
        }
        Ok(DeviceLink { id: id.clone() })
    }

    async fn discover_capabilities(&self, link: &DeviceLink) -> RadioResult<CapabilityRecord> {
        let peripheral = self.lookup(&link.id)?;
        peripheral.discover_services().await?;

        let services = peripheral
            .services()
            .into_iter()
            .map(|service| ServiceRecord {
                uuid: service.uuid,
                characteristics: service.characteristics.iter().map(|c| c.uuid).collect(),
            })
            .collect();

        Ok(CapabilityRecord {
            id: link.id.clone(),
            services,
        })
    }

    async fn disconnect(&self, id: &PeripheralId) -> RadioResult<()> {
        let peripheral = self.lookup(id)?;
        peripheral.disconnect().await?;
        Ok(())
    }

    async fn release(&self) -> RadioResult<()> {
        self.abort_scan_task();
        let result = self.adapter.stop_scan().await;

        let known: Vec<(PeripheralId, Peripheral)> = self.cache()?.drain().collect();
        for (id, peripheral) in known {
            if peripheral.is_connected().await.unwrap_or(false) {
                info!("Dropping link to {} on release", id);
                if let Err(e) = peripheral.disconnect().await {
                    warn!("Disconnect from {} failed: {}", id, e);
                }
            }
        }
        result.map_err(RadioError::from)
    }
}
