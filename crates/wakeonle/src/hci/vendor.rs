//! Vendor specific commands for packet content filtering and sleep mode
//!
//! All advertising packet content filter (APCF) operations share one vendor
//! opcode; the first parameter byte selects the sub-command. Clearing a slot
//! only carries the action and the filter index.

use crate::apcf::{FilterAction, FilterIndex, FilterParams, FilterUuid, ManufacturerData};
use crate::controller::{SleepMode, SleepModeParams};
use crate::hci::constants::*;
use crate::hci::HciCommand;
use byteorder::{ByteOrder, LittleEndian};

fn put_u16(params: &mut Vec<u8>, value: u16) {
    let mut bytes = [0u8; 2];
    LittleEndian::write_u16(&mut bytes, value);
    params.extend_from_slice(&bytes);
}

fn apcf(params: Vec<u8>) -> HciCommand {
    HciCommand::Vendor {
        ocf: OCF_VS_LE_APCF,
        params,
    }
}

/// Turn packet content filtering on or off
pub fn apcf_enable(enable: bool) -> HciCommand {
    apcf(vec![APCF_SUBCMD_ENABLE, enable as u8])
}

/// Filter parameters for one slot
pub fn apcf_filter_param(filter: &FilterParams) -> HciCommand {
    let mut params = vec![
        APCF_SUBCMD_FILTER_PARAM,
        filter.action.as_u8(),
        filter.index.value(),
    ];
    if filter.action == FilterAction::Clear {
        return apcf(params);
    }

    put_u16(&mut params, filter.features.bits());
    put_u16(&mut params, filter.feature_logic.bits());
    params.push(filter.filter_logic.as_u8());
    params.push(filter.rssi_high_threshold as u8);
    params.push(filter.delivery_mode.as_u8());
    apcf(params)
}

/// Service UUID criteria, matched on every bit
pub fn apcf_service_uuid(uuid: FilterUuid, action: FilterAction, index: FilterIndex) -> HciCommand {
    let mut params = vec![APCF_SUBCMD_SERVICE_UUID, action.as_u8(), index.value()];
    if action == FilterAction::Clear {
        return apcf(params);
    }

    params.extend_from_slice(&uuid.to_le_bytes());
    params.extend(std::iter::repeat(0xFF).take(uuid.len()));
    apcf(params)
}

/// Manufacturer specific data criteria
///
/// The data and mask fields both lead with the company identifier.
pub fn apcf_manufacturer_data(
    data: &ManufacturerData,
    action: FilterAction,
    index: FilterIndex,
) -> HciCommand {
    let mut params = vec![APCF_SUBCMD_MANUFACTURER_DATA, action.as_u8(), index.value()];
    if action == FilterAction::Clear {
        return apcf(params);
    }

    put_u16(&mut params, data.company_id);
    params.extend_from_slice(&data.pattern);
    put_u16(&mut params, data.company_id_mask);
    params.extend_from_slice(&data.pattern_mask);
    apcf(params)
}

/// Write sleep mode
pub fn write_sleep_mode(sleep: &SleepModeParams) -> HciCommand {
    let mode = match sleep.mode {
        SleepMode::None => SLEEP_MODE_NONE,
        SleepMode::Uart => SLEEP_MODE_UART,
    };

    let params = vec![
        mode,
        SLEEP_IDLE_THRESHOLD_HOST,
        SLEEP_IDLE_THRESHOLD_CONTROLLER,
        sleep.device_wake.as_u8(),
        sleep.host_wake.as_u8(),
        0x01, // allow host sleep during SCO
        sleep.combine_low_power as u8,
        0x00, // UART TXD tri-state
        0x00, // active connection handling on suspend
        0x00, // resume timeout
        0x00, // break to host
        0x00, // pulsed host wake
    ];
    debug_assert_eq!(params.len(), SLEEP_MODE_PARAM_LEN);

    HciCommand::Vendor {
        ocf: OCF_VS_WRITE_SLEEP_MODE,
        params,
    }
}
