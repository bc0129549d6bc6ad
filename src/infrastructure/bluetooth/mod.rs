//! Bluetooth Module
//!
//! Discovers nearby BLE peripherals, connects to a selected one and
//! estimates its distance.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  ProximityController                     │
//! │   (event loop - user intents in, AppEvents out)          │
//! └──────┬──────────────┬───────────────┬───────────────────┘
//!        │              │               │
//!        ▼              ▼               ▼
//! ┌────────────┐  ┌───────────┐  ┌──────────────────┐
//! │ Permission │  │  Scanner  │  │ ConnectionManager│
//! │    Gate    │  │ - 10s     │  │ - halts scan     │
//! │            │  │   window  │  │ - service        │
//! │            │  │ - dedup   │  │   discovery      │
//! └────────────┘  └───────────┘  └──────────────────┘
//!        │              │               │
//!        └──────────────┴───────┬───────┘
//!                               ▼
//!                      ┌─────────────────┐
//!                      │   RadioStack    │
//!                      │ (btleplug impl) │
//!                      └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`radio`] - Radio stack boundary trait
//! - [`btle`] - btleplug implementation of the radio stack
//! - [`permissions`] - Capability checks before scanning
//! - [`scanner`] - Scan subscription and auto-stop timer
//! - [`connection`] - Connection and service discovery
//! - [`service`] - Controller coordinating the above

pub mod btle;
pub mod connection;
pub mod permissions;
pub mod radio;
pub mod scanner;
pub mod service;

pub use btle::BtleplugRadio;
pub use service::ProximityController;
