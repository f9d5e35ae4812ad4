//! Unit tests for HCI packet parsing and serialization

use super::constants::*;
use super::packet::*;
use super::vendor;
use crate::apcf::*;
use crate::controller::SleepModeParams;
use crate::gpio::Polarity;

fn slot(index: u8) -> FilterIndex {
    FilterIndex::new(index).unwrap()
}

/// Parameter bytes of an APCF command, checking the vendor opcode on the way
fn apcf_params(command: &HciCommand) -> Vec<u8> {
    let packet = command.to_packet();
    assert_eq!(packet[0], HCI_COMMAND_PKT);
    assert_eq!(u16::from_le_bytes([packet[1], packet[2]]), 0xFD57); // OGF_VENDOR << 10 | 0x157
    assert_eq!(packet[3] as usize, packet.len() - 4);
    packet[4..].to_vec()
}

#[test]
fn test_hci_command_serialization() {
    // Test LE Set Scan Parameters command with the low duty timing
    let command = HciCommand::LeSetScanParameters {
        scan_type: 0x00,
        scan_interval: LOW_DUTY_SCAN_INTERVAL,
        scan_window: LOW_DUTY_SCAN_WINDOW,
        own_address_type: 0x00,
        filter_policy: 0x00,
    };
    let packet = command.to_packet();
    assert_eq!(packet[0], HCI_COMMAND_PKT);

    // Opcode: LE Set Scan Parameters (0x200B)
    assert_eq!(u16::from_le_bytes([packet[1], packet[2]]), OPCODE_LE_SET_SCAN_PARAMETERS);
    assert_eq!(packet[3], 7);
    assert_eq!(packet[4], 0x00); // passive
    assert_eq!(u16::from_le_bytes([packet[5], packet[6]]), 0x0800); // scan_interval
    assert_eq!(u16::from_le_bytes([packet[7], packet[8]]), 0x0030); // scan_window

    // Test LE Set Scan Enable command
    let command = HciCommand::LeSetScanEnable {
        enable: true,
        filter_duplicates: true,
    };
    assert_eq!(command.opcode(), 0x200C);
    assert_eq!(command.to_packet()[3..], [2u8, 1, 1]);
}

#[test]
fn test_apcf_enable() {
    assert_eq!(apcf_params(&vendor::apcf_enable(true)), vec![APCF_SUBCMD_ENABLE, 1]);
    assert_eq!(apcf_params(&vendor::apcf_enable(false)), vec![APCF_SUBCMD_ENABLE, 0]);
}

#[test]
fn test_apcf_filter_param() {
    let params = FilterParams::add(
        slot(0),
        FeatureSelection::SERVICE_UUID | FeatureSelection::MANUFACTURER_DATA,
    );

    assert_eq!(
        apcf_params(&vendor::apcf_filter_param(&params)),
        vec![
            APCF_SUBCMD_FILTER_PARAM,
            0x00, // add
            0x00, // filter index
            0x24,
            0x00, // features
            0x24,
            0x00, // feature logic
            0x01, // AND
            0x80, // RSSI -128
            0x00, // immediate delivery
        ]
    );

    // Clearing only names the slot
    assert_eq!(
        apcf_params(&vendor::apcf_filter_param(&FilterParams::clear(slot(5)))),
        vec![APCF_SUBCMD_FILTER_PARAM, 0x02, 0x05]
    );
}

#[test]
fn test_apcf_service_uuid() {
    let command = vendor::apcf_service_uuid(FilterUuid::Uuid16(0xAABB), FilterAction::Add, slot(0));
    assert_eq!(
        apcf_params(&command),
        vec![APCF_SUBCMD_SERVICE_UUID, 0x00, 0x00, 0xBB, 0xAA, 0xFF, 0xFF]
    );

    let command = vendor::apcf_service_uuid(FilterUuid::Uuid32(0x11223344), FilterAction::Add, slot(1));
    assert_eq!(
        apcf_params(&command),
        vec![
            APCF_SUBCMD_SERVICE_UUID,
            0x00,
            0x01,
            0x44,
            0x33,
            0x22,
            0x11, // uuid
            0xFF,
            0xFF,
            0xFF,
            0xFF, // mask
        ]
    );
}

#[test]
fn test_apcf_manufacturer_data() {
    let filter = ManufacturerFilter {
        company_id: 0x0009,
        pattern: ManufacturerPattern::new(vec![0xAA, 0xBB, 0xCC]).unwrap(),
    };
    let command = vendor::apcf_manufacturer_data(
        &ManufacturerData::full_match(&filter),
        FilterAction::Add,
        slot(0),
    );

    assert_eq!(
        apcf_params(&command),
        vec![
            APCF_SUBCMD_MANUFACTURER_DATA,
            0x00,
            0x00,
            0x09,
            0x00, // company id
            0xAA,
            0xBB,
            0xCC, // pattern
            0xFF,
            0xFF, // company id mask
            0xFF,
            0xFF,
            0xFF, // pattern mask
        ]
    );
}

#[test]
fn test_apcf_max_pattern_fits() {
    let filter = ManufacturerFilter {
        company_id: DEFAULT_COMPANY_ID,
        pattern: ManufacturerPattern::new(vec![0x5A; MANUFACTURER_PATTERN_MAX_LEN]).unwrap(),
    };
    let command = vendor::apcf_manufacturer_data(
        &ManufacturerData::full_match(&filter),
        FilterAction::Add,
        slot(0),
    );

    let params = apcf_params(&command);
    assert_eq!(params.len(), 3 + 2 + 27 + 2 + 27);
    assert!(params.len() <= HCI_MAX_PARAM_LEN);
}

#[test]
fn test_write_sleep_mode() {
    let command = vendor::write_sleep_mode(&SleepModeParams::uart(
        Polarity::ActiveLow,
        Polarity::ActiveHigh,
        true,
    ));
    let packet = command.to_packet();

    // Opcode: Write Sleep Mode (0xFC27)
    assert_eq!(u16::from_le_bytes([packet[1], packet[2]]), OPCODE_VS_WRITE_SLEEP_MODE);
    assert_eq!(packet[3] as usize, SLEEP_MODE_PARAM_LEN);
    assert_eq!(
        packet[4..],
        [
            SLEEP_MODE_UART,
            0x01, // host idle threshold
            0x01, // controller idle threshold
            0x00, // device-wake active low
            0x01, // host-wake active high
            0x01, // allow host sleep during SCO
            0x01, // combine low power
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
        ]
    );

    let command = vendor::write_sleep_mode(&SleepModeParams::disabled(
        Polarity::ActiveLow,
        Polarity::ActiveLow,
    ));
    let packet = command.to_packet();
    assert_eq!(packet[4], SLEEP_MODE_NONE);
    assert_eq!(packet[10], 0x00); // combine low power
}

#[test]
fn test_hci_event_parsing() {
    // Command Complete for LE Set Scan Enable
    let data = [EVT_CMD_COMPLETE, 4, 1, 0x0C, 0x20, 0x00];

    let event = HciEvent::parse(&data).unwrap();
    assert_eq!(event.event_code, EVT_CMD_COMPLETE);
    assert_eq!(event.parameter_total_length, 4);
    assert_eq!(event.parameters, vec![1, 0x0C, 0x20, 0x00]);

    // Truncated
    assert!(HciEvent::parse(&[EVT_CMD_COMPLETE, 4, 1, 0x0C]).is_none());
    assert!(HciEvent::parse(&[EVT_CMD_COMPLETE]).is_none());
}

#[test]
fn test_command_completion_parsing() {
    let complete = HciEvent::parse(&[EVT_CMD_COMPLETE, 5, 1, 0x57, 0xFD, 0x00, 0x01]).unwrap();
    let completion = CommandCompletion::parse(&complete).unwrap();
    assert_eq!(completion.opcode, OPCODE_VS_LE_APCF);
    assert!(completion.is_success());
    assert!(!completion.pending);
    assert_eq!(completion.return_parameters, vec![0x01]);

    // Command Status: status comes first
    let status = HciEvent::parse(&[EVT_CMD_STATUS, 4, 0x0C, 1, 0x27, 0xFC]).unwrap();
    let completion = CommandCompletion::parse(&status).unwrap();
    assert_eq!(completion.opcode, OPCODE_VS_WRITE_SLEEP_MODE);
    assert_eq!(completion.status, 0x0C);
    assert!(completion.pending);

    // Anything else is not a completion
    let other = HciEvent {
        event_code: EVT_LE_META_EVENT,
        parameter_total_length: 1,
        parameters: vec![EVT_LE_ADVERTISING_REPORT],
    };
    assert!(CommandCompletion::parse(&other).is_none());

    let short = HciEvent {
        event_code: EVT_CMD_COMPLETE,
        parameter_total_length: 3,
        parameters: vec![1, 0x0C, 0x20],
    };
    assert!(CommandCompletion::parse(&short).is_none());
}

#[test]
fn test_le_advertising_report_parsing() {
    let event = HciEvent {
        event_code: EVT_LE_META_EVENT,
        parameter_total_length: 15,
        parameters: vec![
            EVT_LE_ADVERTISING_REPORT, // Subevent code
            1,                         // Num_Reports
            0,                         // Event_Type
            0,                         // Address_Type
            0x01,
            0x02,
            0x03,
            0x04,
            0x05,
            0x06, // Address
            3,    // Data_Length
            0x09,
            0x54,
            0x65, // Data
            0xC3, // RSSI
        ],
    };

    let report = LeAdvertisingReport::parse_from_meta_event(&event).unwrap();
    assert_eq!(report.address, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    assert_eq!(report.data, vec![0x09, 0x54, 0x65]);
    assert_eq!(report.rssi, -61);

    // Not an LE Meta event
    let invalid_event = HciEvent {
        event_code: EVT_CMD_COMPLETE,
        parameter_total_length: 4,
        parameters: vec![1, 0x03, 0x0C, 0x00],
    };
    assert!(LeAdvertisingReport::parse_from_meta_event(&invalid_event).is_none());

    // Data runs past the end of the event
    let mut truncated = event.clone();
    truncated.parameters[10] = 10;
    assert!(LeAdvertisingReport::parse_from_meta_event(&truncated).is_none());
}
