//! Example: Watching a filtered low duty scan
//!
//! Programs filter slot 0 to match one 16-bit service UUID and runs the low
//! duty scan the wake session uses, without touching sleep mode or the wake
//! lines. Matching advertisements are logged by the controller's event reader.
//!
//! Note: This example requires root privileges, and the HCI device must be
//! down for the user channel.

use std::time::Duration;
use wakeonle::apcf::{FilterConfigManager, FilterIndex, FilterSpec, FilterUuid};
use wakeonle::{BleCommandService, HciChannel, HciController, ScanMode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    println!("Opening hci0...");
    let mut controller = HciController::open(0, HciChannel::User, Duration::from_secs(2))?;

    let filter = FilterConfigManager::new(FilterIndex::default());
    let spec = FilterSpec::uuid(FilterUuid::Uuid16(0xFEAA));
    println!("Arming filter for uuid {}...", spec.uuid);
    filter.clear_filter(&mut controller)?;
    filter.apply(&mut controller, &spec)?;

    let status = controller.start_stop_scan(ScanMode::LowDuty, true)?;
    println!("Low duty scan: {}. Watching for 30 seconds...", status);
    std::thread::sleep(Duration::from_secs(30));

    controller.start_stop_scan(ScanMode::None, true)?;
    filter.clear_filter(&mut controller)?;
    println!("Done!");

    Ok(())
}
