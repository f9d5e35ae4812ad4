//! Thread-safe front end of a running coordinator
use super::{Event, HandshakeState, Message};
use crate::apcf::FilterSpec;
use crate::error::{WakeError, WakeResult};
use std::sync::mpsc::{self, Sender};

/// Posts operator commands to a coordinator and waits for the outcome
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: Sender<Message>,
}

impl CoordinatorHandle {
    pub(crate) fn new(tx: Sender<Message>) -> Self {
        Self { tx }
    }

    /// Arm `spec` and request sleep mode
    ///
    /// Returns once the request is sent; the controller's answer arrives
    /// later as its own event.
    pub fn enable(&self, spec: FilterSpec) -> WakeResult<HandshakeState> {
        self.request(Event::Enable(spec))
    }

    /// Wake the controller and stop scanning
    pub fn disable(&self) -> WakeResult<HandshakeState> {
        self.request(Event::Disable)
    }

    pub fn state(&self) -> WakeResult<HandshakeState> {
        let (reply, response) = mpsc::channel();
        self.tx
            .send(Message::State(reply))
            .map_err(|_| WakeError::Stopped)?;
        response.recv().map_err(|_| WakeError::Stopped)
    }

    /// Stop the coordinator once the work queued ahead of this is done
    pub fn shutdown(&self) {
        let _ = self.tx.send(Message::Shutdown);
    }

    fn request(&self, event: Event) -> WakeResult<HandshakeState> {
        let (reply, response) = mpsc::channel();
        self.tx
            .send(Message::Event(event, Some(reply)))
            .map_err(|_| WakeError::Stopped)?;
        response.recv().map_err(|_| WakeError::Stopped)?
    }
}
