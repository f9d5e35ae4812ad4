//! Error types for the wakeonle library
//!
//! Each layer has its own error enum. `WakeError` is the operator-facing
//! taxonomy reported by the coordinator.

use crate::apcf::FilterStep;
use crate::coordinator::HandshakeState;
use crate::gpio::WakeLine;
use crate::scan::ScanStatus;
use thiserror::Error;

/// Errors that can occur when talking to the controller over HCI
#[derive(Error, Debug)]
pub enum HciError {
    #[error("Failed to open HCI socket: {0}")]
    SocketError(#[from] std::io::Error),

    #[error("Failed to bind to HCI device: {0}")]
    BindError(std::io::Error),

    #[error("Failed to send HCI command: {0}")]
    SendError(std::io::Error),

    #[error("Failed to receive HCI event: {0}")]
    ReceiveError(std::io::Error),

    #[error("Invalid parameter length: {0}")]
    InvalidParamLength(usize),

    #[error("Invalid HCI packet format")]
    InvalidPacketFormat,

    #[error("Command 0x{opcode:04X} failed with status 0x{status:02X}")]
    CommandFailed { opcode: u16, status: u8 },

    #[error("Timed out waiting for completion of command 0x{0:04X}")]
    Timeout(u16),

    #[error("Controller event reader is not running")]
    Disconnected,

    #[error("Scan request returned {0}")]
    ScanStatus(ScanStatus),
}

/// Errors raised by the GPIO line service
#[derive(Error, Debug)]
pub enum GpioError {
    #[error("Failed to open GPIO chip {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to request GPIO line {offset}: {source}")]
    Request { offset: u32, source: std::io::Error },

    #[error("Failed to write {line} line: {source}")]
    Write {
        line: WakeLine,
        source: std::io::Error,
    },

    #[error("Failed to poll {line} line: {source}")]
    Poll {
        line: WakeLine,
        source: std::io::Error,
    },

    #[error("{0} line does not support this operation")]
    Unsupported(WakeLine),
}

/// A single advertisement filter step failed
#[derive(Error, Debug)]
#[error("Filter step '{step}' rejected: {source}")]
pub struct FilterConfigError {
    pub step: FilterStep,
    #[source]
    pub source: HciError,
}

/// Errors reported by the wake/sleep handshake coordinator
#[derive(Error, Debug)]
pub enum WakeError {
    #[error("Command rejected ({command}): {source}")]
    CommandRejected {
        command: &'static str,
        #[source]
        source: HciError,
    },

    #[error("Filter configuration failed: {0}")]
    FilterConfig(#[from] FilterConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Already in state: {0}")]
    AlreadyInState(HandshakeState),

    #[error("Hardware signal failure: {0}")]
    HardwareSignalFailure(#[from] GpioError),

    #[error("Coordinator is no longer running")]
    Stopped,
}

impl WakeError {
    pub(crate) fn rejected(command: &'static str, source: HciError) -> Self {
        WakeError::CommandRejected { command, source }
    }
}

/// Result type for coordinator operations
pub type WakeResult<T> = Result<T, WakeError>;
