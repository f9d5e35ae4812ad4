//! BLE command service
//!
//! The commands the coordinator needs from the controller: filter
//! configuration, scan control and the sleep mode handshake. `HciController`
//! implements them over an HCI socket.

pub mod hci;

pub use self::hci::HciController;

use crate::apcf::{FilterAction, FilterIndex, FilterParams, FilterUuid, ManufacturerData};
use crate::error::HciError;
use crate::gpio::Polarity;
use crate::scan::{ScanMode, ScanStatus};

/// Callback receiving the status byte of a completed sleep mode request
pub type SleepCompleteCallback = Box<dyn FnOnce(u8) + Send + 'static>;

/// Controller sleep mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepMode {
    None,
    Uart,
}

/// Parameters of a sleep mode request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepModeParams {
    pub mode: SleepMode,
    pub device_wake: Polarity,
    pub host_wake: Polarity,
    pub combine_low_power: bool,
}

impl SleepModeParams {
    /// Enter UART sleep
    pub fn uart(device_wake: Polarity, host_wake: Polarity, combine_low_power: bool) -> Self {
        Self {
            mode: SleepMode::Uart,
            device_wake,
            host_wake,
            combine_low_power,
        }
    }

    /// Leave sleep mode
    pub fn disabled(device_wake: Polarity, host_wake: Polarity) -> Self {
        Self {
            mode: SleepMode::None,
            device_wake,
            host_wake,
            combine_low_power: false,
        }
    }
}

/// Commands issued to the BLE controller
///
/// Every call except `set_sleep_mode` completes before returning. A sleep
/// mode request only waits for submission; its outcome reaches
/// `on_complete` later, exactly once.
pub trait BleCommandService {
    fn set_sleep_mode(
        &mut self,
        params: &SleepModeParams,
        on_complete: Option<SleepCompleteCallback>,
    ) -> Result<(), HciError>;

    fn set_filter_enabled(&mut self, enable: bool) -> Result<(), HciError>;

    fn set_filter_data_uuid(
        &mut self,
        uuid: FilterUuid,
        action: FilterAction,
        index: FilterIndex,
    ) -> Result<(), HciError>;

    fn set_filter_data_manufacturer(
        &mut self,
        data: &ManufacturerData,
        action: FilterAction,
        index: FilterIndex,
    ) -> Result<(), HciError>;

    fn set_filter_param(&mut self, params: &FilterParams) -> Result<(), HciError>;

    fn start_stop_scan(&mut self, mode: ScanMode, filter_duplicates: bool) -> Result<ScanStatus, HciError>;
}
