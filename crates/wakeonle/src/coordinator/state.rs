//! Handshake states and the events that drive them
use crate::apcf::FilterSpec;
use std::fmt;

/// Where the wake-on-LE session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakeState {
    /// No session; device-wake asserted, filter and scan not in use
    #[default]
    Idle,
    /// Filter programmed for the session
    FilterArmed,
    /// Filter programmed and low duty scan running
    Scanning,
    /// Sleep mode requested, waiting for the controller's answer
    SleepPending,
    /// Controller asleep, host-wake monitored
    Asleep,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandshakeState::Idle => "idle",
            HandshakeState::FilterArmed => "filter armed",
            HandshakeState::Scanning => "scanning",
            HandshakeState::SleepPending => "sleep pending",
            HandshakeState::Asleep => "asleep",
        };
        f.write_str(name)
    }
}

/// Inputs of the handshake state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Operator asks to arm a filter and put the controller to sleep
    Enable(FilterSpec),
    /// Operator asks to wake the controller and stop scanning
    Disable,
    /// Controller answered the sleep mode request
    SleepModeComplete { status: u8 },
    /// Controller asserted host-wake
    HostWake,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Enable(spec) => write!(f, "enable(uuid {})", spec.uuid),
            Event::Disable => f.write_str("disable"),
            Event::SleepModeComplete { status } => write!(f, "sleep mode complete(0x{:02X})", status),
            Event::HostWake => f.write_str("host wake"),
        }
    }
}

/// Recovery when the controller refuses sleep mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SleepFailurePolicy {
    /// Stop the scan, clear the filter and return to idle
    #[default]
    Teardown,
    /// Stay in sleep pending with filter and scan left running
    Stay,
}
