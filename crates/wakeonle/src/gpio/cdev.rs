//! Linux GPIO character device backend
//!
//! Uses the v1 line handle / line event ioctls on `/dev/gpiochipN`. The
//! device-wake line is requested once as an output, initialised asserted so
//! the controller is awake from the start. The host-wake line is requested
//! once as a falling edge event source.

use super::{EdgeCallback, GpioLineService, Level, LineConfig, WakeLine};
use crate::error::GpioError;
use log::{debug, error, warn};
use std::fs::File;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

// ioctl numbers from <linux/gpio.h>
const GPIO_GET_LINEHANDLE_IOCTL: u32 = 0xC16C_B403;
const GPIO_GET_LINEEVENT_IOCTL: u32 = 0xC030_B404;
const GPIOHANDLE_SET_LINE_VALUES_IOCTL: u32 = 0xC040_B409;

const GPIOHANDLES_MAX: usize = 64;
const GPIO_CONSUMER_LEN: usize = 32;
const GPIOHANDLE_REQUEST_INPUT: u32 = 1 << 0;
const GPIOHANDLE_REQUEST_OUTPUT: u32 = 1 << 1;
const GPIOEVENT_REQUEST_FALLING_EDGE: u32 = 1 << 1;
const GPIOEVENT_EVENT_FALLING_EDGE: u32 = 0x02;

#[repr(C)]
struct GpioHandleRequest {
    line_offsets: [u32; GPIOHANDLES_MAX],
    flags: u32,
    default_values: [u8; GPIOHANDLES_MAX],
    consumer_label: [libc::c_char; GPIO_CONSUMER_LEN],
    lines: u32,
    fd: libc::c_int,
}

#[repr(C)]
struct GpioHandleData {
    values: [u8; GPIOHANDLES_MAX],
}

#[repr(C)]
struct GpioEventRequest {
    line_offset: u32,
    handle_flags: u32,
    event_flags: u32,
    consumer_label: [libc::c_char; GPIO_CONSUMER_LEN],
    fd: libc::c_int,
}

#[repr(C)]
#[derive(Default)]
struct GpioEventData {
    timestamp: u64,
    id: u32,
}

fn consumer_label(name: &str) -> [libc::c_char; GPIO_CONSUMER_LEN] {
    let mut label = [0 as libc::c_char; GPIO_CONSUMER_LEN];
    for (dst, src) in label
        .iter_mut()
        .zip(name.bytes().take(GPIO_CONSUMER_LEN - 1))
    {
        *dst = src as libc::c_char;
    }
    label
}

/// Pending host-wake subscription
#[derive(Default)]
struct EdgeWatch {
    callback: Option<EdgeCallback>,
    waiting: bool,
}

/// Wake lines on a Linux GPIO chip
pub struct CdevGpio {
    _chip: File,
    device_wake: OwnedFd,
    host_wake: Arc<OwnedFd>,
    watch: Arc<Mutex<EdgeWatch>>,
}

impl CdevGpio {
    /// Open `path` and request both wake lines
    pub fn open(
        path: impl AsRef<Path>,
        device_wake: LineConfig,
        host_wake: LineConfig,
    ) -> Result<Self, GpioError> {
        let path = path.as_ref();
        let chip = File::open(path).map_err(|source| GpioError::Open {
            path: path.display().to_string(),
            source,
        })?;

        let mut handle_request = GpioHandleRequest {
            line_offsets: [0; GPIOHANDLES_MAX],
            flags: GPIOHANDLE_REQUEST_OUTPUT,
            default_values: [0; GPIOHANDLES_MAX],
            consumer_label: consumer_label("wakeonle-dev-wake"),
            lines: 1,
            fd: -1,
        };
        handle_request.line_offsets[0] = device_wake.offset;
        handle_request.default_values[0] = device_wake.polarity.asserted().as_u8();

        let result = unsafe {
            libc::ioctl(
                chip.as_raw_fd(),
                GPIO_GET_LINEHANDLE_IOCTL as _,
                &mut handle_request as *mut GpioHandleRequest,
            )
        };
        if result < 0 {
            return Err(GpioError::Request {
                offset: device_wake.offset,
                source: std::io::Error::last_os_error(),
            });
        }
        let device_wake_fd = unsafe { OwnedFd::from_raw_fd(handle_request.fd) };
        debug!(
            "Requested {} on line {} (asserted at startup)",
            WakeLine::DeviceWake,
            device_wake.offset
        );

        let mut event_request = GpioEventRequest {
            line_offset: host_wake.offset,
            handle_flags: GPIOHANDLE_REQUEST_INPUT,
            event_flags: GPIOEVENT_REQUEST_FALLING_EDGE,
            consumer_label: consumer_label("wakeonle-host-wake"),
            fd: -1,
        };
        let result = unsafe {
            libc::ioctl(
                chip.as_raw_fd(),
                GPIO_GET_LINEEVENT_IOCTL as _,
                &mut event_request as *mut GpioEventRequest,
            )
        };
        if result < 0 {
            return Err(GpioError::Request {
                offset: host_wake.offset,
                source: std::io::Error::last_os_error(),
            });
        }
        let host_wake_fd = unsafe { OwnedFd::from_raw_fd(event_request.fd) };
        debug!("Requested {} on line {}", WakeLine::HostWake, host_wake.offset);

        Ok(Self {
            _chip: chip,
            device_wake: device_wake_fd,
            host_wake: Arc::new(host_wake_fd),
            watch: Arc::new(Mutex::new(EdgeWatch::default())),
        })
    }

    /// Discard edges that happened before the current subscription
    fn drain_events(fd: RawFd) {
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        while unsafe { libc::poll(&mut pfd, 1, 0) } > 0 && pfd.revents & libc::POLLIN != 0 {
            if Self::read_event(fd).is_err() {
                break;
            }
        }
    }

    fn read_event(fd: RawFd) -> std::io::Result<GpioEventData> {
        let mut event = GpioEventData::default();
        let size = std::mem::size_of::<GpioEventData>();
        let bytes_read = unsafe {
            libc::read(
                fd,
                &mut event as *mut GpioEventData as *mut libc::c_void,
                size,
            )
        };
        if bytes_read < 0 {
            return Err(std::io::Error::last_os_error());
        }
        if bytes_read as usize != size {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "short GPIO event read",
            ));
        }
        Ok(event)
    }

    fn spawn_waiter(&self) -> Result<(), GpioError> {
        let fd = Arc::clone(&self.host_wake);
        let watch = Arc::clone(&self.watch);

        thread::Builder::new()
            .name("host-wake".into())
            .spawn(move || loop {
                let event = match Self::read_event(fd.as_raw_fd()) {
                    Ok(event) => event,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        error!("Reading {} event failed: {}", WakeLine::HostWake, e);
                        watch
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .waiting = false;
                        return;
                    }
                };
                if event.id != GPIOEVENT_EVENT_FALLING_EDGE {
                    continue;
                }

                let callback = {
                    let mut watch = watch.lock().unwrap_or_else(PoisonError::into_inner);
                    watch.waiting = false;
                    watch.callback.take()
                };
                match callback {
                    Some(callback) => {
                        debug!("{} falling edge at {}ns", WakeLine::HostWake, event.timestamp);
                        callback();
                    }
                    None => warn!("{} edge with no subscriber", WakeLine::HostWake),
                }
                return;
            })
            .map(|_| ())
            .map_err(|source| GpioError::Poll {
                line: WakeLine::HostWake,
                source,
            })
    }
}

impl GpioLineService for CdevGpio {
    fn write_line(&mut self, line: WakeLine, level: Level) -> Result<(), GpioError> {
        if line != WakeLine::DeviceWake {
            return Err(GpioError::Unsupported(line));
        }

        let mut data = GpioHandleData {
            values: [0; GPIOHANDLES_MAX],
        };
        data.values[0] = level.as_u8();

        let result = unsafe {
            libc::ioctl(
                self.device_wake.as_raw_fd(),
                GPIOHANDLE_SET_LINE_VALUES_IOCTL as _,
                &mut data as *mut GpioHandleData,
            )
        };
        if result < 0 {
            return Err(GpioError::Write {
                line,
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    fn poll_falling_edge(&mut self, line: WakeLine, callback: EdgeCallback) -> Result<(), GpioError> {
        if line != WakeLine::HostWake {
            return Err(GpioError::Unsupported(line));
        }

        let mut watch = self.watch.lock().unwrap_or_else(PoisonError::into_inner);
        watch.callback = Some(callback);
        if watch.waiting {
            return Ok(());
        }

        Self::drain_events(self.host_wake.as_raw_fd());
        watch.waiting = true;
        if let Err(e) = self.spawn_waiter() {
            watch.waiting = false;
            watch.callback = None;
            return Err(e);
        }
        Ok(())
    }

    fn cancel_falling_edge(&mut self, line: WakeLine) {
        if line != WakeLine::HostWake {
            return;
        }
        // A waiter still blocked on the event fd finds no callback and exits
        self.watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callback = None;
    }
}
