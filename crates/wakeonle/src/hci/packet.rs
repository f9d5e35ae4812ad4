//! HCI packet structures and parsing
//!
//! This module contains structures and methods for handling HCI packets.

use crate::hci::constants::*;

/// HCI Commands issued by the wake coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HciCommand {
    // LE Commands (OGF: 0x08)
    LeSetScanParameters {
        scan_type: u8,
        scan_interval: u16,
        scan_window: u16,
        own_address_type: u8,
        filter_policy: u8,
    },
    LeSetScanEnable { enable: bool, filter_duplicates: bool },

    // Vendor Specific Commands (OGF: 0x3F)
    Vendor { ocf: u16, params: Vec<u8> },
}

impl HciCommand {
    /// Get the OGF and OCF for this command
    pub fn opcode_parts(&self) -> (u8, u16) {
        match self {
            Self::LeSetScanParameters { .. } => (OGF_LE, OCF_LE_SET_SCAN_PARAMETERS),
            Self::LeSetScanEnable { .. } => (OGF_LE, OCF_LE_SET_SCAN_ENABLE),
            Self::Vendor { ocf, .. } => (OGF_VENDOR, *ocf),
        }
    }

    /// Get the packed 16 bit opcode
    pub fn opcode(&self) -> u16 {
        let (ogf, ocf) = self.opcode_parts();
        opcode(ogf, ocf)
    }

    /// Convert the command to its raw parameter bytes
    fn parameters(&self) -> Vec<u8> {
        match self {
            Self::LeSetScanParameters {
                scan_type,
                scan_interval,
                scan_window,
                own_address_type,
                filter_policy,
            } => {
                let mut params = Vec::with_capacity(7);
                params.push(*scan_type);
                params.extend_from_slice(&scan_interval.to_le_bytes());
                params.extend_from_slice(&scan_window.to_le_bytes());
                params.push(*own_address_type);
                params.push(*filter_policy);
                params
            }

            Self::LeSetScanEnable {
                enable,
                filter_duplicates,
            } => vec![*enable as u8, *filter_duplicates as u8],

            Self::Vendor { params, .. } => params.clone(),
        }
    }

    /// Convert the command to a raw HCI packet
    pub fn to_packet(&self) -> Vec<u8> {
        let params = self.parameters();

        let mut packet = vec![HCI_COMMAND_PKT];
        packet.extend_from_slice(&self.opcode().to_le_bytes());
        packet.push(params.len() as u8);
        packet.extend_from_slice(&params);
        packet
    }
}

/// HCI Event packet
#[derive(Debug, Clone)]
pub struct HciEvent {
    pub event_code: u8,
    pub parameter_total_length: u8,
    pub parameters: Vec<u8>,
}

impl HciEvent {
    /// Parse an HCI event from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 2 {
            return None;
        }

        let event_code = data[0];
        let parameter_total_length = data[1];

        if data.len() < (parameter_total_length as usize + 2) {
            return None;
        }

        let parameters = data[2..(parameter_total_length as usize + 2)].to_vec();

        Some(HciEvent {
            event_code,
            parameter_total_length,
            parameters,
        })
    }
}

/// Completion of a command, from either a Command Complete or a Command
/// Status event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCompletion {
    pub opcode: u16,
    pub status: u8,
    /// True when this came from a Command Status event; the command is still
    /// running if `status` is success
    pub pending: bool,
    pub return_parameters: Vec<u8>,
}

impl CommandCompletion {
    /// Parse a Command Complete or Command Status event
    pub fn parse(event: &HciEvent) -> Option<Self> {
        let params = &event.parameters;
        match event.event_code {
            EVT_CMD_COMPLETE => {
                // Num_HCI_Command_Packets, Command_Opcode, Status, ...
                if params.len() < 4 {
                    return None;
                }
                Some(CommandCompletion {
                    opcode: u16::from_le_bytes([params[1], params[2]]),
                    status: params[3],
                    pending: false,
                    return_parameters: params[4..].to_vec(),
                })
            }
            EVT_CMD_STATUS => {
                // Status, Num_HCI_Command_Packets, Command_Opcode
                if params.len() < 4 {
                    return None;
                }
                Some(CommandCompletion {
                    opcode: u16::from_le_bytes([params[2], params[3]]),
                    status: params[0],
                    pending: true,
                    return_parameters: Vec::new(),
                })
            }
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == HCI_SUCCESS
    }
}

/// LE Advertising Report Event
#[derive(Debug, Clone)]
pub struct LeAdvertisingReport {
    pub event_type: u8,
    pub address_type: u8,
    pub address: [u8; 6],
    pub data_length: u8,
    pub data: Vec<u8>,
    pub rssi: i8,
}

impl LeAdvertisingReport {
    /// Parse an LE Advertising Report from an HCI LE Meta Event
    pub fn parse_from_meta_event(event: &HciEvent) -> Option<Self> {
        if event.event_code != EVT_LE_META_EVENT || event.parameters.is_empty() {
            return None;
        }

        let subevent_code = event.parameters[0];
        if subevent_code != EVT_LE_ADVERTISING_REPORT {
            return None;
        }

        // Simple parsing for a single report
        if event.parameters.len() < 12 {
            return None;
        }

        let event_type = event.parameters[2];
        let address_type = event.parameters[3];

        let mut address = [0u8; 6];
        address.copy_from_slice(&event.parameters[4..10]);

        let data_length = event.parameters[10];
        if event.parameters.len() < (11 + data_length as usize + 1) {
            return None;
        }

        let data = event.parameters[11..(11 + data_length as usize)].to_vec();
        let rssi = event.parameters[11 + data_length as usize] as i8;

        Some(LeAdvertisingReport {
            event_type,
            address_type,
            address,
            data_length,
            data,
            rssi,
        })
    }
}
