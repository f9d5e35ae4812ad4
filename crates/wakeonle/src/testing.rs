//! Recording stand-ins for the controller and the wake lines
use crate::apcf::{FilterAction, FilterIndex, FilterParams, FilterUuid, ManufacturerData};
use crate::controller::{BleCommandService, SleepCompleteCallback, SleepModeParams};
use crate::error::{GpioError, HciError};
use crate::gpio::{EdgeCallback, GpioLineService, Level, Polarity, WakeLine, WakeLines};
use crate::scan::{ScanMode, ScanStatus};
use std::io;
use std::sync::{Arc, Mutex};

/// Status the mock answers with when a command is made to fail
pub(crate) const INJECTED_STATUS: u8 = 0x12;

/// One call made against the mocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    WriteLine(WakeLine, Level),
    PollFallingEdge(WakeLine),
    SetFilterEnabled(bool),
    SetFilterDataUuid(FilterUuid, FilterAction, FilterIndex),
    SetFilterDataManufacturer(ManufacturerData, FilterAction, FilterIndex),
    SetFilterParam(FilterParams),
    StartStopScan(ScanMode),
    SetSleepMode(SleepModeParams, bool),
}

type FailWhen = Box<dyn Fn(&Call) -> bool + Send>;

struct Shared {
    calls: Vec<Call>,
    fail_when: Option<FailWhen>,
    scan_start: ScanStatus,
    scan_stop: ScanStatus,
    sleep_callback: Option<SleepCompleteCallback>,
    edge_callback: Option<EdgeCallback>,
}

/// Test-side view of the mocks: call log, failure injection and triggers
#[derive(Clone)]
pub(crate) struct MockControl {
    shared: Arc<Mutex<Shared>>,
}

impl MockControl {
    fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                calls: Vec::new(),
                fail_when: None,
                scan_start: ScanStatus::Success,
                scan_stop: ScanStatus::Success,
                sleep_callback: None,
                edge_callback: None,
            })),
        }
    }

    /// Calls recorded so far
    pub fn calls(&self) -> Vec<Call> {
        self.shared.lock().unwrap().calls.clone()
    }

    /// Return and forget the calls recorded so far
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut self.shared.lock().unwrap().calls)
    }

    /// Fail every call matching `predicate`
    pub fn fail_when(&self, predicate: impl Fn(&Call) -> bool + Send + 'static) {
        self.shared.lock().unwrap().fail_when = Some(Box::new(predicate));
    }

    pub fn set_scan_start_status(&self, status: ScanStatus) {
        self.shared.lock().unwrap().scan_start = status;
    }

    pub fn set_scan_stop_status(&self, status: ScanStatus) {
        self.shared.lock().unwrap().scan_stop = status;
    }

    /// Whether a sleep mode request is waiting for its answer
    pub fn sleep_pending(&self) -> bool {
        self.shared.lock().unwrap().sleep_callback.is_some()
    }

    /// Answer the outstanding sleep mode request
    pub fn complete_sleep(&self, status: u8) -> bool {
        let callback = self.shared.lock().unwrap().sleep_callback.take();
        match callback {
            Some(callback) => {
                callback(status);
                true
            }
            None => false,
        }
    }

    /// Whether host-wake is being watched
    pub fn host_wake_armed(&self) -> bool {
        self.shared.lock().unwrap().edge_callback.is_some()
    }

    /// Produce a falling edge on host-wake
    pub fn fire_host_wake(&self) -> bool {
        let callback = self.shared.lock().unwrap().edge_callback.take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Record `call`; returns true when it has to fail
    fn record(&self, call: Call) -> bool {
        let mut shared = self.shared.lock().unwrap();
        let fail = shared.fail_when.as_ref().is_some_and(|fail| fail(&call));
        shared.calls.push(call);
        fail
    }
}

fn injected() -> HciError {
    HciError::CommandFailed {
        opcode: 0,
        status: INJECTED_STATUS,
    }
}

pub(crate) struct MockController {
    control: MockControl,
}

impl BleCommandService for MockController {
    fn set_sleep_mode(
        &mut self,
        params: &SleepModeParams,
        on_complete: Option<SleepCompleteCallback>,
    ) -> Result<(), HciError> {
        if self.control.record(Call::SetSleepMode(*params, on_complete.is_some())) {
            return Err(injected());
        }
        if let Some(callback) = on_complete {
            self.control.shared.lock().unwrap().sleep_callback = Some(callback);
        }
        Ok(())
    }

    fn set_filter_enabled(&mut self, enable: bool) -> Result<(), HciError> {
        if self.control.record(Call::SetFilterEnabled(enable)) {
            return Err(injected());
        }
        Ok(())
    }

    fn set_filter_data_uuid(
        &mut self,
        uuid: FilterUuid,
        action: FilterAction,
        index: FilterIndex,
    ) -> Result<(), HciError> {
        if self.control.record(Call::SetFilterDataUuid(uuid, action, index)) {
            return Err(injected());
        }
        Ok(())
    }

    fn set_filter_data_manufacturer(
        &mut self,
        data: &ManufacturerData,
        action: FilterAction,
        index: FilterIndex,
    ) -> Result<(), HciError> {
        if self
            .control
            .record(Call::SetFilterDataManufacturer(data.clone(), action, index))
        {
            return Err(injected());
        }
        Ok(())
    }

    fn set_filter_param(&mut self, params: &FilterParams) -> Result<(), HciError> {
        if self.control.record(Call::SetFilterParam(*params)) {
            return Err(injected());
        }
        Ok(())
    }

    fn start_stop_scan(&mut self, mode: ScanMode, _filter_duplicates: bool) -> Result<ScanStatus, HciError> {
        if self.control.record(Call::StartStopScan(mode)) {
            return Err(injected());
        }
        let shared = self.control.shared.lock().unwrap();
        Ok(match mode {
            ScanMode::LowDuty => shared.scan_start,
            ScanMode::None => shared.scan_stop,
        })
    }
}

pub(crate) struct MockGpio {
    control: MockControl,
}

impl GpioLineService for MockGpio {
    fn write_line(&mut self, line: WakeLine, level: Level) -> Result<(), GpioError> {
        if self.control.record(Call::WriteLine(line, level)) {
            return Err(GpioError::Write {
                line,
                source: io::Error::other("injected failure"),
            });
        }
        Ok(())
    }

    fn poll_falling_edge(&mut self, line: WakeLine, callback: EdgeCallback) -> Result<(), GpioError> {
        if self.control.record(Call::PollFallingEdge(line)) {
            return Err(GpioError::Poll {
                line,
                source: io::Error::other("injected failure"),
            });
        }
        self.control.shared.lock().unwrap().edge_callback = Some(callback);
        Ok(())
    }

    fn cancel_falling_edge(&mut self, line: WakeLine) {
        if line == WakeLine::HostWake {
            self.control.shared.lock().unwrap().edge_callback = None;
        }
    }
}

/// Mock controller and active-low wake lines sharing one call log
pub(crate) fn mocks() -> (MockController, WakeLines<MockGpio>, MockControl) {
    let control = MockControl::new();
    let ble = MockController {
        control: control.clone(),
    };
    let gpio = MockGpio {
        control: control.clone(),
    };
    (
        ble,
        WakeLines::new(gpio, Polarity::ActiveLow, Polarity::ActiveLow),
        control,
    )
}
