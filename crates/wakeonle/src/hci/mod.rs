//! Bluetooth HCI (Host Controller Interface) implementation
//!
//! This module provides the packets, vendor commands and socket used to talk
//! to the controller.

pub mod constants;
pub mod packet;
pub mod socket;
pub mod vendor;

#[cfg(test)]
mod tests;

pub use packet::{CommandCompletion, HciCommand, HciEvent, LeAdvertisingReport};
pub use socket::{HciChannel, HciSocket};
