//! Device-wake / host-wake GPIO lines
//!
//! The host drives device-wake to keep the controller awake; the controller
//! drives host-wake when it needs the host. `WakeLines` owns the line service
//! together with each line's active polarity and turns assert/deassert into
//! physical levels.

pub mod cdev;

pub use cdev::CdevGpio;

use crate::error::GpioError;
use log::debug;
use std::fmt;

/// The two wake lines shared by host and controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WakeLine {
    DeviceWake,
    HostWake,
}

impl fmt::Display for WakeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WakeLine::DeviceWake => f.write_str("DEV-WAKE"),
            WakeLine::HostWake => f.write_str("HOST-WAKE"),
        }
    }
}

/// Physical line level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn as_u8(&self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

/// Active polarity of a wake line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    ActiveLow,
    ActiveHigh,
}

impl Polarity {
    /// Level that asserts the line
    pub fn asserted(&self) -> Level {
        match self {
            Polarity::ActiveLow => Level::Low,
            Polarity::ActiveHigh => Level::High,
        }
    }

    /// Level that releases the line
    pub fn deasserted(&self) -> Level {
        match self {
            Polarity::ActiveLow => Level::High,
            Polarity::ActiveHigh => Level::Low,
        }
    }

    /// Encoding used by the sleep mode command
    pub fn as_u8(&self) -> u8 {
        match self {
            Polarity::ActiveLow => 0,
            Polarity::ActiveHigh => 1,
        }
    }
}

/// Line offset and polarity, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    pub offset: u32,
    pub polarity: Polarity,
}

/// Callback fired once on the next falling edge
pub type EdgeCallback = Box<dyn FnOnce() + Send + 'static>;

/// Access to the wake lines
pub trait GpioLineService {
    /// Drive `line` to `level`
    fn write_line(&mut self, line: WakeLine, level: Level) -> Result<(), GpioError>;

    /// Subscribe to the next falling edge on `line`
    ///
    /// The subscription is one-shot and has to be renewed after it fires.
    fn poll_falling_edge(&mut self, line: WakeLine, callback: EdgeCallback) -> Result<(), GpioError>;

    /// Drop the pending subscription on `line`, if any
    fn cancel_falling_edge(&mut self, line: WakeLine);
}

/// The wake lines with their configured polarities
pub struct WakeLines<G> {
    gpio: G,
    device_wake: Polarity,
    host_wake: Polarity,
}

impl<G: GpioLineService> WakeLines<G> {
    pub fn new(gpio: G, device_wake: Polarity, host_wake: Polarity) -> Self {
        Self {
            gpio,
            device_wake,
            host_wake,
        }
    }

    pub fn device_wake_polarity(&self) -> Polarity {
        self.device_wake
    }

    pub fn host_wake_polarity(&self) -> Polarity {
        self.host_wake
    }

    /// Keep the controller awake
    pub fn assert_device_wake(&mut self) -> Result<(), GpioError> {
        debug!("Asserting {}", WakeLine::DeviceWake);
        self.gpio
            .write_line(WakeLine::DeviceWake, self.device_wake.asserted())
    }

    /// Let the controller sleep
    pub fn deassert_device_wake(&mut self) -> Result<(), GpioError> {
        debug!("Deasserting {}", WakeLine::DeviceWake);
        self.gpio
            .write_line(WakeLine::DeviceWake, self.device_wake.deasserted())
    }

    /// Watch for the controller asserting host-wake
    pub fn arm_host_wake(&mut self, callback: EdgeCallback) -> Result<(), GpioError> {
        debug!("Monitoring {}", WakeLine::HostWake);
        self.gpio.poll_falling_edge(WakeLine::HostWake, callback)
    }

    /// Stop reporting host-wake edges to the current subscriber
    pub fn disarm_host_wake(&mut self) {
        debug!("No longer monitoring {}", WakeLine::HostWake);
        self.gpio.cancel_falling_edge(WakeLine::HostWake);
    }
}
