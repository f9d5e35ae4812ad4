//! Filter configuration manager
//!
//! Builds the command sequences that clear and program the controller's
//! advertisement content filter. A failed step aborts the sequence without
//! undoing earlier steps; clearing the filter again is the way back to a
//! known state.

use super::types::*;
use crate::controller::BleCommandService;
use crate::error::{FilterConfigError, HciError};
use log::debug;

fn failed(step: FilterStep) -> impl FnOnce(HciError) -> FilterConfigError {
    move |source| FilterConfigError { step, source }
}

/// Programs one fixed filter slot
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterConfigManager {
    index: FilterIndex,
}

impl FilterConfigManager {
    pub fn new(index: FilterIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> FilterIndex {
        self.index
    }

    /// Disable filtering, then clear the slot's parameters
    pub fn clear_filter<B: BleCommandService + ?Sized>(&self, ble: &mut B) -> Result<(), FilterConfigError> {
        debug!("Clearing filter slot {}", self.index);
        ble.set_filter_enabled(false)
            .map_err(failed(FilterStep::Disable))?;
        ble.set_filter_param(&FilterParams::clear(self.index))
            .map_err(failed(FilterStep::Clear))?;
        Ok(())
    }

    /// Match advertisements carrying `uuid`
    ///
    /// Expects `clear_filter` to have succeeded just before.
    pub fn apply_uuid_filter<B: BleCommandService + ?Sized>(
        &self,
        ble: &mut B,
        uuid: FilterUuid,
    ) -> Result<(), FilterConfigError> {
        self.apply(ble, &FilterSpec::uuid(uuid))
    }

    /// Match advertisements carrying `uuid` and the manufacturer pattern
    ///
    /// Expects `clear_filter` to have succeeded just before.
    pub fn apply_uuid_and_manufacturer_filter<B: BleCommandService + ?Sized>(
        &self,
        ble: &mut B,
        uuid: FilterUuid,
        manufacturer: &ManufacturerFilter,
    ) -> Result<(), FilterConfigError> {
        let spec = FilterSpec {
            uuid,
            manufacturer: Some(manufacturer.clone()),
        };
        self.apply(ble, &spec)
    }

    /// Program the slot with whatever `spec` asks for
    ///
    /// Data entries go in first, then the parameters enabling
    /// `spec.features()`, then filtering is switched on.
    pub fn apply<B: BleCommandService + ?Sized>(&self, ble: &mut B, spec: &FilterSpec) -> Result<(), FilterConfigError> {
        debug!("Applying uuid {} to filter slot {}", spec.uuid, self.index);
        ble.set_filter_data_uuid(spec.uuid, FilterAction::Add, self.index)
            .map_err(failed(FilterStep::AddUuid))?;

        if let Some(manufacturer) = &spec.manufacturer {
            debug!(
                "Adding company 0x{:04X} pattern {} to filter slot {}",
                manufacturer.company_id, manufacturer.pattern, self.index
            );
            ble.set_filter_data_manufacturer(
                &ManufacturerData::full_match(manufacturer),
                FilterAction::Add,
                self.index,
            )
            .map_err(failed(FilterStep::AddManufacturer))?;
        }

        self.add_param_and_enable(ble, spec.features())
    }

    fn add_param_and_enable<B: BleCommandService + ?Sized>(
        &self,
        ble: &mut B,
        features: FeatureSelection,
    ) -> Result<(), FilterConfigError> {
        ble.set_filter_param(&FilterParams::add(self.index, features))
            .map_err(failed(FilterStep::AddParam))?;
        ble.set_filter_enabled(true)
            .map_err(failed(FilterStep::Enable))?;
        Ok(())
    }
}
