//! wakeonle - Bluetooth LE wake-on-advertisement host library
//!
//! Programs a controller's advertising packet content filter, starts a low
//! duty passive scan and hands the controller over to UART sleep mode. When
//! a matching advertisement arrives the controller asserts host-wake and the
//! session is torn down again.
//!
//! The [`Coordinator`] drives the handshake through two services: a
//! [`BleCommandService`] for HCI commands and a [`GpioLineService`] for the
//! device-wake and host-wake lines. [`HciController`] and [`CdevGpio`]
//! implement them on Linux.

pub mod apcf;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod gpio;
pub mod hci;
pub mod scan;

#[cfg(test)]
mod testing;

// Re-export common types for convenience
pub use apcf::{FilterConfigManager, FilterIndex, FilterSpec, FilterUuid, ManufacturerPattern};
pub use config::WakeConfig;
pub use controller::{BleCommandService, HciController, SleepModeParams};
pub use coordinator::{Coordinator, CoordinatorHandle, Event, HandshakeState, SleepFailurePolicy};
pub use error::{FilterConfigError, GpioError, HciError, WakeError, WakeResult};
pub use gpio::{CdevGpio, GpioLineService, LineConfig, Polarity, WakeLines};
pub use hci::{HciChannel, HciSocket};
pub use scan::{ScanMode, ScanStatus};
