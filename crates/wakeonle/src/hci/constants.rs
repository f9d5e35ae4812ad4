//! HCI protocol constants
//!
//! This module contains the constants used to drive the controller: packet
//! types, the standard LE scan commands, and the vendor specific commands for
//! advertising packet content filtering and UART sleep mode.

// HCI packet types
pub const HCI_COMMAND_PKT: u8 = 0x01;
pub const HCI_EVENT_PKT: u8 = 0x04;

// Maximum size of HCI command parameters
pub const HCI_MAX_PARAM_LEN: usize = 255;

// OGF (Opcode Group Field) values
pub const OGF_LE: u8 = 0x08;
pub const OGF_VENDOR: u8 = 0x3F;

// LE Command OCF values (OGF: 0x08)
pub const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
pub const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

// Vendor Command OCF values (OGF: 0x3F)
pub const OCF_VS_WRITE_SLEEP_MODE: u16 = 0x0027;
pub const OCF_VS_LE_APCF: u16 = 0x0157;

// APCF sub-commands
pub const APCF_SUBCMD_ENABLE: u8 = 0x00;
pub const APCF_SUBCMD_FILTER_PARAM: u8 = 0x01;
pub const APCF_SUBCMD_SERVICE_UUID: u8 = 0x03;
pub const APCF_SUBCMD_MANUFACTURER_DATA: u8 = 0x06;

// Write sleep mode values
pub const SLEEP_MODE_NONE: u8 = 0x00;
pub const SLEEP_MODE_UART: u8 = 0x01;
pub const SLEEP_IDLE_THRESHOLD_HOST: u8 = 0x01;
pub const SLEEP_IDLE_THRESHOLD_CONTROLLER: u8 = 0x01;
pub const SLEEP_MODE_PARAM_LEN: usize = 12;

// Low duty scan timing, in 0.625ms units
pub const LOW_DUTY_SCAN_INTERVAL: u16 = 0x0800;
pub const LOW_DUTY_SCAN_WINDOW: u16 = 0x0030;

// HCI Events
pub const EVT_CMD_COMPLETE: u8 = 0x0E;
pub const EVT_CMD_STATUS: u8 = 0x0F;
pub const EVT_LE_META_EVENT: u8 = 0x3E;

// LE Meta Events
pub const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

// Status codes
pub const HCI_SUCCESS: u8 = 0x00;

/// Build a 16 bit opcode from its group and command fields
pub const fn opcode(ogf: u8, ocf: u16) -> u16 {
    ((ogf as u16) << 10) | (ocf & 0x3ff)
}

pub const OPCODE_LE_SET_SCAN_PARAMETERS: u16 = opcode(OGF_LE, OCF_LE_SET_SCAN_PARAMETERS);
pub const OPCODE_LE_SET_SCAN_ENABLE: u16 = opcode(OGF_LE, OCF_LE_SET_SCAN_ENABLE);
pub const OPCODE_VS_WRITE_SLEEP_MODE: u16 = opcode(OGF_VENDOR, OCF_VS_WRITE_SLEEP_MODE);
pub const OPCODE_VS_LE_APCF: u16 = opcode(OGF_VENDOR, OCF_VS_LE_APCF);
