//! Type definitions for advertising packet content filtering
use crate::error::{WakeError, WakeResult};
use bitflags::bitflags;
use std::fmt;

/// Longest manufacturer data pattern a filter slot accepts
pub const MANUFACTURER_PATTERN_MAX_LEN: usize = 27;

/// RSSI threshold that lets every advertisement through
pub const RSSI_HIGH_THRESHOLD_DEFAULT: i8 = -128;

/// Company identifier used when none is configured
pub const DEFAULT_COMPANY_ID: u16 = 0x0009;

bitflags! {
    /// Filter features that can be selected for a filter slot
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FeatureSelection: u16 {
        const BROADCAST_ADDR = 0x0001;
        const SERVICE_DATA_CHANGE = 0x0002;
        const SERVICE_UUID = 0x0004;
        const SOLICITED_UUID = 0x0008;
        const LOCAL_NAME = 0x0010;
        const MANUFACTURER_DATA = 0x0020;
        const SERVICE_DATA = 0x0040;
    }
}

/// Action applied to a filter slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    Add,
    Delete,
    Clear,
}

impl FilterAction {
    pub fn as_u8(&self) -> u8 {
        match self {
            FilterAction::Add => 0x00,
            FilterAction::Delete => 0x01,
            FilterAction::Clear => 0x02,
        }
    }
}

/// How the selected features are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterLogic {
    Or,
    And,
}

impl FilterLogic {
    pub fn as_u8(&self) -> u8 {
        match self {
            FilterLogic::Or => 0x00,
            FilterLogic::And => 0x01,
        }
    }
}

/// When matching advertisements are reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Immediate,
    OnFound,
    Batched,
}

impl DeliveryMode {
    pub fn as_u8(&self) -> u8 {
        match self {
            DeliveryMode::Immediate => 0x00,
            DeliveryMode::OnFound => 0x01,
            DeliveryMode::Batched => 0x02,
        }
    }
}

/// Hardware filter slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterIndex(u8);

impl FilterIndex {
    pub const MAX: u8 = 0x1F;

    /// Create a filter index, returning `None` past the last slot
    pub fn new(index: u8) -> Option<Self> {
        if index <= Self::MAX {
            Some(FilterIndex(index))
        } else {
            None
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for FilterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Service UUID matched by the filter, tagged with its width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterUuid {
    Uuid16(u16),
    Uuid32(u32),
}

impl FilterUuid {
    /// Little-endian bytes, as carried on the wire
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            FilterUuid::Uuid16(uuid) => uuid.to_le_bytes().to_vec(),
            FilterUuid::Uuid32(uuid) => uuid.to_le_bytes().to_vec(),
        }
    }

    /// Width of the UUID in bytes
    pub fn len(&self) -> usize {
        match self {
            FilterUuid::Uuid16(_) => 2,
            FilterUuid::Uuid32(_) => 4,
        }
    }
}

impl fmt::Display for FilterUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterUuid::Uuid16(uuid) => write!(f, "0x{:04X}", uuid),
            FilterUuid::Uuid32(uuid) => write!(f, "0x{:08X}", uuid),
        }
    }
}

/// Manufacturer data pattern, at most 27 bytes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManufacturerPattern {
    bytes: Vec<u8>,
}

impl ManufacturerPattern {
    pub fn new(bytes: Vec<u8>) -> WakeResult<Self> {
        if bytes.len() > MANUFACTURER_PATTERN_MAX_LEN {
            return Err(WakeError::InvalidInput(format!(
                "manufacturer pattern is {} bytes, limit is {}",
                bytes.len(),
                MANUFACTURER_PATTERN_MAX_LEN
            )));
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Display for ManufacturerPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode_upper(&self.bytes))
    }
}

/// Manufacturer specific data criteria
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerFilter {
    pub company_id: u16,
    pub pattern: ManufacturerPattern,
}

/// Which criteria a filter checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    UuidOnly,
    UuidPlusManufacturer,
}

/// Filter requested by one enable command
///
/// Built fresh for every request and dropped once applied; the controller
/// keeps the configured filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub uuid: FilterUuid,
    pub manufacturer: Option<ManufacturerFilter>,
}

impl FilterSpec {
    pub fn uuid(uuid: FilterUuid) -> Self {
        Self {
            uuid,
            manufacturer: None,
        }
    }

    pub fn uuid_and_manufacturer(uuid: FilterUuid, company_id: u16, pattern: ManufacturerPattern) -> Self {
        Self {
            uuid,
            manufacturer: Some(ManufacturerFilter { company_id, pattern }),
        }
    }

    pub fn match_kind(&self) -> MatchKind {
        match self.manufacturer {
            Some(_) => MatchKind::UuidPlusManufacturer,
            None => MatchKind::UuidOnly,
        }
    }

    /// Features the filter parameters enable for this filter
    pub fn features(&self) -> FeatureSelection {
        match self.match_kind() {
            MatchKind::UuidOnly => FeatureSelection::SERVICE_UUID,
            MatchKind::UuidPlusManufacturer => {
                FeatureSelection::SERVICE_UUID | FeatureSelection::MANUFACTURER_DATA
            }
        }
    }
}

/// Parameters of a filter param command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterParams {
    pub action: FilterAction,
    pub index: FilterIndex,
    pub features: FeatureSelection,
    pub feature_logic: FeatureSelection,
    pub filter_logic: FilterLogic,
    pub rssi_high_threshold: i8,
    pub delivery_mode: DeliveryMode,
}

impl FilterParams {
    /// Parameters that enable `features` on `index`, AND-ed together
    pub fn add(index: FilterIndex, features: FeatureSelection) -> Self {
        Self {
            action: FilterAction::Add,
            index,
            features,
            feature_logic: features,
            filter_logic: FilterLogic::And,
            rssi_high_threshold: RSSI_HIGH_THRESHOLD_DEFAULT,
            delivery_mode: DeliveryMode::Immediate,
        }
    }

    /// Parameters that clear `index`
    pub fn clear(index: FilterIndex) -> Self {
        Self {
            action: FilterAction::Clear,
            ..Self::add(index, FeatureSelection::empty())
        }
    }
}

/// Manufacturer data command payload with full match masks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerData {
    pub company_id: u16,
    pub company_id_mask: u16,
    pub pattern: Vec<u8>,
    pub pattern_mask: Vec<u8>,
}

impl ManufacturerData {
    pub fn full_match(filter: &ManufacturerFilter) -> Self {
        let pattern = filter.pattern.as_bytes().to_vec();
        Self {
            company_id: filter.company_id,
            company_id_mask: 0xFFFF,
            pattern_mask: vec![0xFF; pattern.len()],
            pattern,
        }
    }
}

/// Steps of the filter configuration sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStep {
    Disable,
    Clear,
    AddUuid,
    AddManufacturer,
    AddParam,
    Enable,
}

impl fmt::Display for FilterStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterStep::Disable => "disable filter",
            FilterStep::Clear => "clear filter param",
            FilterStep::AddUuid => "add uuid data",
            FilterStep::AddManufacturer => "add manufacturer data",
            FilterStep::AddParam => "add filter param",
            FilterStep::Enable => "enable filter",
        };
        f.write_str(name)
    }
}
