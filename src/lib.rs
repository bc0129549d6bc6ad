//! Discover nearby Bluetooth LE peripherals, connect to one and estimate
//! how far away it is from its signal strength.
//!
//! - [`domain`] - models, distance estimation, scan state machine, settings
//! - [`infrastructure`] - radio stack, controller event loop, logging
//! - [`presentation`] - egui front end

pub mod domain;
pub mod infrastructure;
pub mod presentation;
