//! BLE command service over an HCI socket
//!
//! A reader thread owns the receive side of the socket. Command completions
//! go back to the caller waiting in `send_and_wait`, except the completion of
//! an asynchronous sleep mode request, which goes to its callback.

use super::{BleCommandService, SleepCompleteCallback, SleepModeParams};
use crate::apcf::{FilterAction, FilterIndex, FilterParams, FilterUuid, ManufacturerData};
use crate::error::HciError;
use crate::hci::constants::*;
use crate::hci::{vendor, CommandCompletion, HciChannel, HciCommand, HciEvent, HciSocket, LeAdvertisingReport};
use crate::scan::{describe_report, ScanMode, ScanStatus};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Status returned when the controller refuses a command in its current state
const HCI_COMMAND_DISALLOWED: u8 = 0x0C;

const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

type PendingSleep = Arc<Mutex<Option<SleepCompleteCallback>>>;

/// BLE controller reached through an HCI socket
pub struct HciController {
    socket: Arc<HciSocket>,
    completions: Receiver<CommandCompletion>,
    pending_sleep: PendingSleep,
    running: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    timeout: Duration,
}

impl HciController {
    /// Open HCI device `dev_id` and start reading its events
    pub fn open(dev_id: u16, channel: HciChannel, timeout: Duration) -> Result<Self, HciError> {
        let socket = Arc::new(HciSocket::open(dev_id, channel)?);
        info!("Opened hci{} ({:?} channel)", dev_id, channel);

        let (tx, completions) = mpsc::channel();
        let pending_sleep: PendingSleep = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));

        let reader = {
            let socket = Arc::clone(&socket);
            let pending_sleep = Arc::clone(&pending_sleep);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name(format!("hci{}-events", dev_id))
                .spawn(move || Self::read_events(&socket, &tx, &pending_sleep, &running))?
        };

        Ok(Self {
            socket,
            completions,
            pending_sleep,
            running,
            reader: Some(reader),
            timeout,
        })
    }

    fn read_events(
        socket: &HciSocket,
        completions: &Sender<CommandCompletion>,
        pending_sleep: &PendingSleep,
        running: &AtomicBool,
    ) {
        debug!("HCI event reader started");

        while running.load(Ordering::Relaxed) {
            let event = match socket.read_event_timeout(READ_POLL_INTERVAL) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(HciError::InvalidPacketFormat) => continue,
                Err(e) => {
                    error!("Reading HCI event failed: {}", e);
                    thread::sleep(READ_POLL_INTERVAL);
                    continue;
                }
            };

            if !Self::dispatch_event(&event, completions, pending_sleep) {
                break;
            }
        }

        debug!("HCI event reader stopped");
    }

    /// Route one event; returns false once nobody listens for completions
    fn dispatch_event(
        event: &HciEvent,
        completions: &Sender<CommandCompletion>,
        pending_sleep: &PendingSleep,
    ) -> bool {
        if let Some(report) = LeAdvertisingReport::parse_from_meta_event(event) {
            info!("Got ADV from {}", describe_report(&report));
            return true;
        }

        let completion = match CommandCompletion::parse(event) {
            Some(completion) => completion,
            None => {
                debug!("Ignoring HCI event 0x{:02X}", event.event_code);
                return true;
            }
        };

        if completion.opcode == OPCODE_VS_WRITE_SLEEP_MODE {
            // A successful Command Status only means the request is running
            let finished = !(completion.pending && completion.is_success());
            if finished {
                let callback = pending_sleep
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(callback) = callback {
                    debug!("Sleep mode request completed, status 0x{:02X}", completion.status);
                    callback(completion.status);
                    return true;
                }
            }
        }

        completions.send(completion).is_ok()
    }

    /// Send `command` and wait for its completion
    fn send_and_wait(&mut self, command: HciCommand) -> Result<CommandCompletion, HciError> {
        let opcode = command.opcode();

        // Drop completions nobody waited for
        while self.completions.try_recv().is_ok() {}

        debug!("Sending command 0x{:04X}", opcode);
        self.socket.send_command(&command)?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completions.recv_timeout(remaining) {
                Ok(completion) if completion.opcode == opcode => {
                    if completion.pending && completion.is_success() {
                        continue;
                    }
                    return Ok(completion);
                }
                Ok(completion) => {
                    debug!("Ignoring completion for 0x{:04X}", completion.opcode);
                }
                Err(RecvTimeoutError::Timeout) => return Err(HciError::Timeout(opcode)),
                Err(RecvTimeoutError::Disconnected) => return Err(HciError::Disconnected),
            }
        }
    }

    /// Send `command` and require a success status
    fn execute(&mut self, command: HciCommand) -> Result<(), HciError> {
        let completion = self.send_and_wait(command)?;
        if completion.is_success() {
            Ok(())
        } else {
            Err(HciError::CommandFailed {
                opcode: completion.opcode,
                status: completion.status,
            })
        }
    }

    fn scan_status(completion: &CommandCompletion) -> ScanStatus {
        match completion.status {
            HCI_SUCCESS => ScanStatus::Success,
            HCI_COMMAND_DISALLOWED => ScanStatus::Busy,
            _ => ScanStatus::Error,
        }
    }
}

impl BleCommandService for HciController {
    fn set_sleep_mode(
        &mut self,
        params: &SleepModeParams,
        on_complete: Option<SleepCompleteCallback>,
    ) -> Result<(), HciError> {
        let command = vendor::write_sleep_mode(params);

        let Some(callback) = on_complete else {
            return self.execute(command);
        };

        {
            let mut pending = self
                .pending_sleep
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if pending.is_some() {
                warn!("Replacing an unfinished sleep mode request");
            }
            *pending = Some(callback);
        }

        debug!("Sending command 0x{:04X}", command.opcode());
        if let Err(e) = self.socket.send_command(&command) {
            self.pending_sleep
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            return Err(e);
        }
        Ok(())
    }

    fn set_filter_enabled(&mut self, enable: bool) -> Result<(), HciError> {
        self.execute(vendor::apcf_enable(enable))
    }

    fn set_filter_data_uuid(
        &mut self,
        uuid: FilterUuid,
        action: FilterAction,
        index: FilterIndex,
    ) -> Result<(), HciError> {
        self.execute(vendor::apcf_service_uuid(uuid, action, index))
    }

    fn set_filter_data_manufacturer(
        &mut self,
        data: &ManufacturerData,
        action: FilterAction,
        index: FilterIndex,
    ) -> Result<(), HciError> {
        self.execute(vendor::apcf_manufacturer_data(data, action, index))
    }

    fn set_filter_param(&mut self, params: &FilterParams) -> Result<(), HciError> {
        self.execute(vendor::apcf_filter_param(params))
    }

    fn start_stop_scan(&mut self, mode: ScanMode, filter_duplicates: bool) -> Result<ScanStatus, HciError> {
        if mode == ScanMode::LowDuty {
            self.execute(HciCommand::LeSetScanParameters {
                scan_type: 0x00, // passive
                scan_interval: LOW_DUTY_SCAN_INTERVAL,
                scan_window: LOW_DUTY_SCAN_WINDOW,
                own_address_type: 0x00,
                filter_policy: 0x00,
            })?;
        }

        let completion = self.send_and_wait(HciCommand::LeSetScanEnable {
            enable: mode == ScanMode::LowDuty,
            filter_duplicates,
        })?;
        Ok(Self::scan_status(&completion))
    }
}

impl Drop for HciController {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                error!("HCI event reader panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_complete(opcode: u16, status: u8) -> HciEvent {
        let [lo, hi] = opcode.to_le_bytes();
        HciEvent {
            event_code: EVT_CMD_COMPLETE,
            parameter_total_length: 4,
            parameters: vec![1, lo, hi, status],
        }
    }

    fn command_status(opcode: u16, status: u8) -> HciEvent {
        let [lo, hi] = opcode.to_le_bytes();
        HciEvent {
            event_code: EVT_CMD_STATUS,
            parameter_total_length: 4,
            parameters: vec![status, 1, lo, hi],
        }
    }

    fn pending_sleep_recording() -> (PendingSleep, Receiver<u8>) {
        let (tx, rx) = mpsc::channel();
        let callback: SleepCompleteCallback = Box::new(move |status| {
            let _ = tx.send(status);
        });
        (Arc::new(Mutex::new(Some(callback))), rx)
    }

    #[test]
    fn test_completion_routed_to_waiter() {
        let (tx, rx) = mpsc::channel();
        let (pending, statuses) = pending_sleep_recording();

        assert!(HciController::dispatch_event(
            &command_complete(OPCODE_VS_LE_APCF, 0x00),
            &tx,
            &pending
        ));

        assert_eq!(rx.try_recv().unwrap().opcode, OPCODE_VS_LE_APCF);
        assert!(statuses.try_recv().is_err());
        assert!(pending.lock().unwrap().is_some());
    }

    #[test]
    fn test_sleep_completion_routed_to_callback() {
        let (tx, rx) = mpsc::channel();
        let (pending, statuses) = pending_sleep_recording();

        // Accepted and still running
        HciController::dispatch_event(&command_status(OPCODE_VS_WRITE_SLEEP_MODE, 0x00), &tx, &pending);
        assert!(statuses.try_recv().is_err());

        HciController::dispatch_event(&command_complete(OPCODE_VS_WRITE_SLEEP_MODE, 0x00), &tx, &pending);
        assert_eq!(statuses.try_recv().unwrap(), 0x00);
        assert!(pending.lock().unwrap().is_none());

        // Only the pending status reached the channel
        assert!(rx.try_recv().unwrap().pending);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_sleep_rejected_by_status() {
        let (tx, _rx) = mpsc::channel();
        let (pending, statuses) = pending_sleep_recording();

        HciController::dispatch_event(&command_status(OPCODE_VS_WRITE_SLEEP_MODE, 0x01), &tx, &pending);
        assert_eq!(statuses.try_recv().unwrap(), 0x01);
    }

    #[test]
    fn test_dispatch_stops_without_listener() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let pending: PendingSleep = Arc::new(Mutex::new(None));

        assert!(!HciController::dispatch_event(
            &command_complete(OPCODE_LE_SET_SCAN_ENABLE, 0x00),
            &tx,
            &pending
        ));
    }

    #[test]
    fn test_scan_status_mapping() {
        let completion = |status| CommandCompletion {
            opcode: OPCODE_LE_SET_SCAN_ENABLE,
            status,
            pending: false,
            return_parameters: Vec::new(),
        };
        assert_eq!(HciController::scan_status(&completion(0x00)), ScanStatus::Success);
        assert_eq!(HciController::scan_status(&completion(0x0C)), ScanStatus::Busy);
        assert_eq!(HciController::scan_status(&completion(0x12)), ScanStatus::Error);
    }
}
