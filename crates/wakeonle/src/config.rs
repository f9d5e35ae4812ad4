//! Runtime configuration
//!
//! Everything here is fixed at startup; the coordinator never changes it.

use crate::apcf::{FilterIndex, DEFAULT_COMPANY_ID};
use crate::coordinator::SleepFailurePolicy;
use crate::error::{WakeError, WakeResult};
use crate::gpio::{LineConfig, Polarity};
use crate::hci::HciChannel;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration of the wake-on-LE host
#[derive(Debug, Clone)]
pub struct WakeConfig {
    /// HCI device number (`hciN`)
    pub hci_device: u16,
    pub hci_channel: HciChannel,
    /// GPIO chip carrying both wake lines
    pub gpio_chip: PathBuf,
    pub device_wake: LineConfig,
    pub host_wake: LineConfig,
    /// Controller filter slot used for every session
    pub filter_index: FilterIndex,
    /// Company identifier matched together with a manufacturer pattern
    pub company_id: u16,
    /// Let the controller combine sleep mode with its low power mode
    pub combine_low_power: bool,
    /// What to do when the controller refuses to sleep
    pub sleep_failure: SleepFailurePolicy,
    /// Upper bound on a synchronous HCI command
    pub command_timeout: Duration,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            hci_device: 0,
            hci_channel: HciChannel::default(),
            gpio_chip: PathBuf::from("/dev/gpiochip0"),
            device_wake: LineConfig {
                offset: 0,
                polarity: Polarity::ActiveLow,
            },
            host_wake: LineConfig {
                offset: 1,
                polarity: Polarity::ActiveLow,
            },
            filter_index: FilterIndex::default(),
            company_id: DEFAULT_COMPANY_ID,
            combine_low_power: true,
            sleep_failure: SleepFailurePolicy::default(),
            command_timeout: Duration::from_secs(2),
        }
    }
}

impl WakeConfig {
    /// Set the filter slot from a raw index
    pub fn with_filter_index(mut self, index: u8) -> WakeResult<Self> {
        self.filter_index = FilterIndex::new(index).ok_or_else(|| {
            WakeError::InvalidInput(format!(
                "filter index {} is past the last slot {}",
                index,
                FilterIndex::MAX
            ))
        })?;
        Ok(self)
    }

    /// Check settings that cannot work together
    pub fn validate(&self) -> WakeResult<()> {
        if self.device_wake.offset == self.host_wake.offset {
            return Err(WakeError::InvalidInput(format!(
                "device-wake and host-wake both use line {}",
                self.device_wake.offset
            )));
        }
        if self.command_timeout.is_zero() {
            return Err(WakeError::InvalidInput("command timeout must be non-zero".into()));
        }
        Ok(())
    }
}
