//! Wake/sleep handshake coordinator
//!
//! Owns the handshake state together with the controller and wake line
//! services. Commands and asynchronous notifications all pass through
//! [`Coordinator::handle_event`], one at a time. Callbacks handed to the
//! services never touch the state themselves; they post an [`Event`] on the
//! coordinator's queue.
//!
//! Device-wake is always asserted before any scan or filter command, since
//! the controller only accepts commands while awake.

mod handle;
mod state;


pub use handle::CoordinatorHandle;
pub use state::{Event, HandshakeState, SleepFailurePolicy};

use crate::apcf::{FilterConfigManager, FilterSpec};
use crate::config::WakeConfig;
use crate::controller::{BleCommandService, SleepCompleteCallback, SleepModeParams};
use crate::error::{GpioError, HciError, WakeError, WakeResult};
use crate::gpio::{EdgeCallback, GpioLineService, WakeLines};
use crate::hci::constants::{HCI_SUCCESS, OPCODE_VS_WRITE_SLEEP_MODE};
use crate::scan::{ScanMode, ScanStatus};
use log::{debug, error, info, warn};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

pub(crate) type Reply<T> = Sender<T>;

/// Work item on the coordinator queue
pub(crate) enum Message {
    Event(Event, Option<Reply<WakeResult<HandshakeState>>>),
    State(Reply<HandshakeState>),
    Shutdown,
}

/// The wake-on-LE state machine
pub struct Coordinator<B, G> {
    state: HandshakeState,
    filter: FilterConfigManager,
    ble: B,
    lines: WakeLines<G>,
    combine_low_power: bool,
    sleep_failure: SleepFailurePolicy,
    tx: Sender<Message>,
    rx: Receiver<Message>,
}

impl<B: BleCommandService, G: GpioLineService> Coordinator<B, G> {
    pub fn new(ble: B, lines: WakeLines<G>, config: &WakeConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            state: HandshakeState::Idle,
            filter: FilterConfigManager::new(config.filter_index),
            ble,
            lines,
            combine_low_power: config.combine_low_power,
            sleep_failure: config.sleep_failure,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Handle for posting work from other threads
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle::new(self.tx.clone())
    }

    pub fn enable(&mut self, spec: FilterSpec) -> WakeResult<HandshakeState> {
        self.handle_event(Event::Enable(spec))
    }

    pub fn disable(&mut self) -> WakeResult<HandshakeState> {
        self.handle_event(Event::Disable)
    }

    /// Apply one event and return the resulting state
    pub fn handle_event(&mut self, event: Event) -> WakeResult<HandshakeState> {
        debug!("Handling {} in state {}", event, self.state);
        let from = self.state;

        let result = match event {
            Event::Enable(spec) => self.on_enable(spec),
            Event::Disable => self.on_disable(),
            Event::SleepModeComplete { status } => self.on_sleep_complete(status),
            Event::HostWake => self.on_host_wake(),
        };

        if self.state != from {
            info!("State {} -> {}", from, self.state);
        }
        result.map(|()| self.state)
    }

    /// Handle everything already queued without blocking
    ///
    /// Returns the number of queued items processed.
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(message) = self.rx.try_recv() {
            processed += 1;
            if !self.dispatch(message) {
                break;
            }
        }
        processed
    }

    /// Handle queued work until a shutdown request arrives
    pub fn run(mut self) {
        info!("Coordinator running");
        while let Ok(message) = self.rx.recv() {
            if !self.dispatch(message) {
                break;
            }
        }
        info!("Coordinator stopped in state {}", self.state);
    }

    /// Run the coordinator on its own thread
    pub fn spawn(self) -> std::io::Result<(CoordinatorHandle, JoinHandle<()>)>
    where
        B: Send + 'static,
        G: Send + 'static,
    {
        let handle = self.handle();
        let thread = thread::Builder::new()
            .name("wake-coordinator".into())
            .spawn(move || self.run())?;
        Ok((handle, thread))
    }

    fn dispatch(&mut self, message: Message) -> bool {
        match message {
            Message::Event(event, reply) => {
                let description = event.to_string();
                let result = self.handle_event(event);
                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            error!("{} failed: {}", description, e);
                        }
                    }
                }
                true
            }
            Message::State(reply) => {
                let _ = reply.send(self.state);
                true
            }
            Message::Shutdown => false,
        }
    }

    fn on_enable(&mut self, spec: FilterSpec) -> WakeResult<()> {
        if self.state != HandshakeState::Idle {
            warn!("Enable rejected: {}", self.state);
            return Err(WakeError::AlreadyInState(self.state));
        }

        info!("Enabling wake on LE for uuid {}", spec.uuid);
        if let Err(e) = self.arm_session(&spec) {
            self.state = HandshakeState::Idle;
            return Err(e);
        }
        self.state = HandshakeState::SleepPending;
        Ok(())
    }

    fn arm_session(&mut self, spec: &FilterSpec) -> WakeResult<()> {
        self.lines.assert_device_wake()?;

        self.filter.clear_filter(&mut self.ble)?;
        self.filter.apply(&mut self.ble, spec)?;
        self.state = HandshakeState::FilterArmed;

        self.start_scan()?;
        self.state = HandshakeState::Scanning;

        self.request_sleep()
    }

    fn on_disable(&mut self) -> WakeResult<()> {
        if self.state != HandshakeState::Asleep {
            info!("Disable ignored: not asleep ({})", self.state);
            return Err(WakeError::AlreadyInState(self.state));
        }

        self.lines.assert_device_wake()?;
        self.stop_scan()?;
        self.lines.disarm_host_wake();
        self.state = HandshakeState::Idle;
        Ok(())
    }

    fn on_sleep_complete(&mut self, status: u8) -> WakeResult<()> {
        if self.state != HandshakeState::SleepPending {
            warn!(
                "Ignoring sleep mode completion (0x{:02X}) in state {}",
                status, self.state
            );
            return Ok(());
        }

        if status != HCI_SUCCESS {
            error!("Controller refused sleep mode, status 0x{:02X}", status);
            if self.sleep_failure == SleepFailurePolicy::Teardown {
                self.teardown_session();
                self.state = HandshakeState::Idle;
            }
            return Err(WakeError::rejected(
                "set sleep mode",
                HciError::CommandFailed {
                    opcode: OPCODE_VS_WRITE_SLEEP_MODE,
                    status,
                },
            ));
        }

        info!("Sleep mode accepted, releasing device-wake");
        if let Err(e) = self.enter_sleep() {
            error!("Wake lines failed after sleep mode was accepted: {}", e);
            self.abandon_sleep();
            self.state = HandshakeState::Idle;
            return Err(e.into());
        }

        self.state = HandshakeState::Asleep;
        Ok(())
    }

    fn enter_sleep(&mut self) -> Result<(), GpioError> {
        self.lines.deassert_device_wake()?;

        let tx = self.tx.clone();
        let on_edge: EdgeCallback = Box::new(move || {
            let _ = tx.send(Message::Event(Event::HostWake, None));
        });
        self.lines.arm_host_wake(on_edge)
    }

    /// Wake the controller and undo the session once sleep mode is on
    ///
    /// Best effort; every step runs even if an earlier one failed.
    fn abandon_sleep(&mut self) {
        if let Err(e) = self.lines.assert_device_wake() {
            warn!("Teardown: {}", e);
        }
        self.lines.disarm_host_wake();
        self.teardown_session();

        let params = self.sleep_params_disabled();
        if let Err(e) = self.ble.set_sleep_mode(&params, None) {
            warn!("Teardown: cancel sleep mode: {}", e);
        }
    }

    fn on_host_wake(&mut self) -> WakeResult<()> {
        if self.state != HandshakeState::Asleep {
            warn!("Ignoring host wake in state {}", self.state);
            return Ok(());
        }

        info!("Host wake asserted, ending wake on LE session");
        self.lines.assert_device_wake()?;
        self.stop_scan()?;
        self.filter.clear_filter(&mut self.ble)?;
        let params = self.sleep_params_disabled();
        self.ble
            .set_sleep_mode(&params, None)
            .map_err(|e| WakeError::rejected("cancel sleep mode", e))?;

        self.state = HandshakeState::Idle;
        Ok(())
    }

    /// Stop the scan and clear the filter, logging failures
    fn teardown_session(&mut self) {
        if let Err(e) = self.stop_scan() {
            warn!("Teardown: {}", e);
        }
        if let Err(e) = self.filter.clear_filter(&mut self.ble) {
            warn!("Teardown: {}", e);
        }
    }

    fn start_scan(&mut self) -> WakeResult<()> {
        let status = self
            .ble
            .start_stop_scan(ScanMode::LowDuty, true)
            .map_err(|e| WakeError::rejected("start scan", e))?;
        debug!("Low duty scan start: {}", status);
        if status.is_started() {
            Ok(())
        } else {
            Err(WakeError::rejected("start scan", HciError::ScanStatus(status)))
        }
    }

    fn stop_scan(&mut self) -> WakeResult<()> {
        let status = self
            .ble
            .start_stop_scan(ScanMode::None, true)
            .map_err(|e| WakeError::rejected("stop scan", e))?;
        debug!("Scan stop: {}", status);
        match status {
            ScanStatus::Success => Ok(()),
            other => Err(WakeError::rejected("stop scan", HciError::ScanStatus(other))),
        }
    }

    fn request_sleep(&mut self) -> WakeResult<()> {
        let tx = self.tx.clone();
        let on_complete: SleepCompleteCallback = Box::new(move |status| {
            let _ = tx.send(Message::Event(Event::SleepModeComplete { status }, None));
        });

        let params = SleepModeParams::uart(
            self.lines.device_wake_polarity(),
            self.lines.host_wake_polarity(),
            self.combine_low_power,
        );
        self.ble
            .set_sleep_mode(&params, Some(on_complete))
            .map_err(|e| WakeError::rejected("set sleep mode", e))
    }

    fn sleep_params_disabled(&self) -> SleepModeParams {
        SleepModeParams::disabled(
            self.lines.device_wake_polarity(),
            self.lines.host_wake_polarity(),
        )
    }
}
