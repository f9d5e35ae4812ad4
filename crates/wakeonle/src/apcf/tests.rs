use super::*;
use crate::error::{FilterConfigError, HciError};
use crate::testing::{mocks, Call};

#[test]
fn test_filter_index_bounds() {
    assert_eq!(FilterIndex::new(0).map(|i| i.value()), Some(0));
    assert_eq!(FilterIndex::new(FilterIndex::MAX).map(|i| i.value()), Some(0x1F));
    assert!(FilterIndex::new(FilterIndex::MAX + 1).is_none());
}

#[test]
fn test_filter_uuid_width() {
    let short = FilterUuid::Uuid16(0xAABB);
    assert_eq!(short.len(), 2);
    assert_eq!(short.to_le_bytes(), vec![0xBB, 0xAA]);
    assert_eq!(short.to_string(), "0xAABB");

    let long = FilterUuid::Uuid32(0x11223344);
    assert_eq!(long.len(), 4);
    assert_eq!(long.to_le_bytes(), vec![0x44, 0x33, 0x22, 0x11]);
    assert_eq!(long.to_string(), "0x11223344");
}

#[test]
fn test_manufacturer_pattern() {
    let pattern = ManufacturerPattern::new(vec![0xAA, 0xBB, 0xCC]).unwrap();
    assert_eq!(pattern.len(), 3);
    assert_eq!(pattern.to_string(), "0xAABBCC");

    assert!(ManufacturerPattern::new(Vec::new()).unwrap().is_empty());
    assert!(ManufacturerPattern::new(vec![0; 27]).is_ok());
    assert!(ManufacturerPattern::new(vec![0; 28]).is_err());
}

#[test]
fn test_filter_spec_features() {
    let spec = FilterSpec::uuid(FilterUuid::Uuid16(0x1234));
    assert_eq!(spec.match_kind(), MatchKind::UuidOnly);
    assert_eq!(spec.features(), FeatureSelection::SERVICE_UUID);

    let spec = FilterSpec::uuid_and_manufacturer(
        FilterUuid::Uuid32(0x11223344),
        DEFAULT_COMPANY_ID,
        ManufacturerPattern::default(),
    );
    assert_eq!(spec.match_kind(), MatchKind::UuidPlusManufacturer);
    assert!(spec.features().contains(FeatureSelection::MANUFACTURER_DATA));
    assert!(spec.features().contains(FeatureSelection::SERVICE_UUID));
}

#[test]
fn test_filter_params_defaults() {
    let index = FilterIndex::new(3).unwrap();
    let params = FilterParams::add(index, FeatureSelection::SERVICE_UUID);
    assert_eq!(params.action, FilterAction::Add);
    assert_eq!(params.feature_logic, params.features);
    assert_eq!(params.filter_logic, FilterLogic::And);
    assert_eq!(params.rssi_high_threshold, -128);
    assert_eq!(params.delivery_mode, DeliveryMode::Immediate);

    let clear = FilterParams::clear(index);
    assert_eq!(clear.action, FilterAction::Clear);
    assert_eq!(clear.index, index);
    assert!(clear.features.is_empty());
}

#[test]
fn test_full_match_masks() {
    let filter = ManufacturerFilter {
        company_id: 0x004C,
        pattern: ManufacturerPattern::new(vec![1, 2, 3, 4]).unwrap(),
    };
    let data = ManufacturerData::full_match(&filter);
    assert_eq!(data.company_id, 0x004C);
    assert_eq!(data.company_id_mask, 0xFFFF);
    assert_eq!(data.pattern, vec![1, 2, 3, 4]);
    assert_eq!(data.pattern_mask, vec![0xFF; 4]);
}

#[test]
fn test_apply_uses_configured_slot() {
    let (mut ble, _lines, control) = mocks();
    let index = FilterIndex::new(7).unwrap();
    let manager = FilterConfigManager::new(index);
    let uuid = FilterUuid::Uuid16(0xFEAA);

    manager.clear_filter(&mut ble).unwrap();
    manager.apply(&mut ble, &FilterSpec::uuid(uuid)).unwrap();

    assert_eq!(
        control.calls(),
        vec![
            Call::SetFilterEnabled(false),
            Call::SetFilterParam(FilterParams::clear(index)),
            Call::SetFilterDataUuid(uuid, FilterAction::Add, index),
            Call::SetFilterParam(FilterParams::add(index, FeatureSelection::SERVICE_UUID)),
            Call::SetFilterEnabled(true),
        ]
    );
}

#[test]
fn test_failed_step_stops_sequence() {
    let (mut ble, _lines, control) = mocks();
    let manager = FilterConfigManager::default();
    control.fail_when(|call| matches!(call, Call::SetFilterDataManufacturer(..)));

    let spec = FilterSpec::uuid_and_manufacturer(
        FilterUuid::Uuid32(0x11223344),
        DEFAULT_COMPANY_ID,
        ManufacturerPattern::new(vec![0xAA]).unwrap(),
    );
    let err = manager.apply(&mut ble, &spec).unwrap_err();

    assert!(matches!(
        err,
        FilterConfigError {
            step: FilterStep::AddManufacturer,
            source: HciError::CommandFailed { .. },
        }
    ));
    // Nothing past the failed step, nothing undone
    let calls = control.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[1], Call::SetFilterDataManufacturer(..)));
}

#[test]
fn test_clear_reports_failing_step() {
    let (mut ble, _lines, control) = mocks();
    control.fail_when(|call| matches!(call, Call::SetFilterParam(_)));

    let err = FilterConfigManager::default().clear_filter(&mut ble).unwrap_err();
    assert_eq!(err.step, FilterStep::Clear);
    assert!(err.to_string().contains("clear filter param"));
}

#[test]
fn test_entry_points_program_spec_features() {
    let manager = FilterConfigManager::default();
    let uuid = FilterUuid::Uuid32(0x11223344);
    let manufacturer = ManufacturerFilter {
        company_id: DEFAULT_COMPANY_ID,
        pattern: ManufacturerPattern::new(vec![0xAA, 0xBB]).unwrap(),
    };
    let spec = FilterSpec::uuid_and_manufacturer(uuid, DEFAULT_COMPANY_ID, manufacturer.pattern.clone());

    let (mut ble, _lines, direct) = mocks();
    manager
        .apply_uuid_and_manufacturer_filter(&mut ble, uuid, &manufacturer)
        .unwrap();
    let (mut ble, _lines, via_spec) = mocks();
    manager.apply(&mut ble, &spec).unwrap();

    let calls = direct.calls();
    assert_eq!(calls, via_spec.calls());
    assert_eq!(
        calls[2],
        Call::SetFilterParam(FilterParams::add(FilterIndex::default(), spec.features()))
    );

    let (mut ble, _lines, control) = mocks();
    manager.apply_uuid_filter(&mut ble, uuid).unwrap();
    assert_eq!(
        control.calls()[1],
        Call::SetFilterParam(FilterParams::add(
            FilterIndex::default(),
            FilterSpec::uuid(uuid).features()
        ))
    );
}
