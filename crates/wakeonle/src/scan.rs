//! Bluetooth LE scanning types
//!
//! The wake session runs a low duty passive scan so that the controller's
//! advertisement filter can do the match detection while the host sleeps.

use crate::hci::LeAdvertisingReport;
use std::fmt;

// AD types worth naming in scan logs
const AD_TYPE_FLAGS: u8 = 0x01;
const AD_TYPE_UUID16_INCOMPLETE: u8 = 0x02;
const AD_TYPE_UUID16_COMPLETE: u8 = 0x03;
const AD_TYPE_UUID32_INCOMPLETE: u8 = 0x04;
const AD_TYPE_UUID32_COMPLETE: u8 = 0x05;
const AD_TYPE_SHORT_NAME: u8 = 0x08;
const AD_TYPE_COMPLETE_NAME: u8 = 0x09;
const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// Scan requested from the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Scanning off
    None,
    /// Reduced duty cycle passive scan
    LowDuty,
}

/// Outcome reported by a scan start/stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Success,
    Pending,
    Busy,
    Error,
}

impl ScanStatus {
    /// Whether a start request leaves the controller scanning
    pub fn is_started(&self) -> bool {
        matches!(self, ScanStatus::Success | ScanStatus::Pending | ScanStatus::Busy)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanStatus::Success => "success",
            ScanStatus::Pending => "pending",
            ScanStatus::Busy => "busy",
            ScanStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Parse advertisement data from a LE Advertising Report
///
/// # Arguments
///
/// * `data` - The advertisement data
///
/// # Returns
///
/// A vector of (type, data) tuples
pub fn parse_advertising_data(data: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut result = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let length = data[i] as usize;
        if length == 0 || i + length >= data.len() {
            break;
        }

        let ad_type = data[i + 1];
        let ad_data = data[i + 2..i + 1 + length].to_vec();

        result.push((ad_type, ad_data));

        i += 1 + length;
    }

    result
}

/// One line summary of an advertising report for scan logs
pub fn describe_report(report: &LeAdvertisingReport) -> String {
    let address = report
        .address
        .iter()
        .rev()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":");

    let mut summary = format!("{} rssi {}", address, report.rssi);
    for (ad_type, value) in parse_advertising_data(&report.data) {
        let field = match ad_type {
            AD_TYPE_FLAGS => continue,
            AD_TYPE_UUID16_INCOMPLETE | AD_TYPE_UUID16_COMPLETE => value
                .chunks_exact(2)
                .map(|c| format!("uuid16=0x{:04X}", u16::from_le_bytes([c[0], c[1]])))
                .collect::<Vec<_>>()
                .join(" "),
            AD_TYPE_UUID32_INCOMPLETE | AD_TYPE_UUID32_COMPLETE => value
                .chunks_exact(4)
                .map(|c| format!("uuid32=0x{:08X}", u32::from_le_bytes([c[0], c[1], c[2], c[3]])))
                .collect::<Vec<_>>()
                .join(" "),
            AD_TYPE_SHORT_NAME | AD_TYPE_COMPLETE_NAME => {
                format!("name={}", String::from_utf8_lossy(&value))
            }
            AD_TYPE_MANUFACTURER_DATA => format!("manufacturer={}", hex::encode_upper(&value)),
            other => format!("ad[0x{:02X}]={}", other, hex::encode_upper(&value)),
        };
        summary.push(' ');
        summary.push_str(&field);
    }
    summary
}
