//! Incremental receive path.
//!
//! Frames are assembled byte by byte into a fixed 255-byte buffer. The state
//! machine itself only touches its buffer and the status cell; [`RxHandle`]
//! pairs it with the callback and is what a transport drives from its receive
//! context.

use log::{debug, warn};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::frame::{opcode, BUF_SIZE, HEADER, RESPONSE_OVERHEAD};
use crate::transport::RxFifo;

/// First byte the module sends instead of a frame when a command timed out internally.
pub const RESPONSE_TIMEOUT_SENTINEL: u8 = 0x01;

const RX_CHUNK: usize = 32;

/// Status shared between the receive path and the command executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DriverStatus {
    /// No frame in progress
    Clear = 0,
    /// Waiting for the power-up announcement
    Startup = 1,
    /// A frame is being assembled
    Pending = 2,
    /// A complete frame is in the response buffer
    Success = 3,
    /// The receive buffer overflowed
    Fail = 4,
    /// The module sent its in-band timeout marker
    ResponseTimeout = 5,
}

impl DriverStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Clear,
            1 => Self::Startup,
            2 => Self::Pending,
            3 => Self::Success,
            4 => Self::Fail,
            _ => Self::ResponseTimeout,
        }
    }
}

/// Word-sized status cell.
///
/// Stores are `Release` and loads `Acquire`, so a reader that observes
/// `Success` also observes the frame bytes written before it.
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) const fn new(status: DriverStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    pub(crate) fn get(&self) -> DriverStatus {
        DriverStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, status: DriverStatus) {
        self.0.store(status as u8, Ordering::Release);
    }

    /// Replace `current` with `new`; returns whether the swap happened.
    pub(crate) fn replace(&self, current: DriverStatus, new: DriverStatus) -> bool {
        self.0
            .compare_exchange(current as u8, new as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// What a single byte did to the receive state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    /// Byte arrived outside a frame and was dropped
    Discarded,
    /// Byte was stored; the frame is not complete yet
    Accepted,
    /// Byte completed a frame
    Complete,
    /// Byte completed the power-up announcement, which is swallowed
    StartupAbsorbed,
    /// The announced length does not fit the buffer
    Overflow,
    /// The module's timeout marker was seen at the start of a frame
    TimeoutSentinel,
}

/// Fixed-capacity holder for the frame being received.
pub(crate) struct ResponseBuffer {
    data: [u8; BUF_SIZE],
    /// Write cursor
    len: usize,
    /// Expected total length of the frame in progress
    msg_len: usize,
    /// Length of the last completed frame
    frame_len: usize,
}

impl ResponseBuffer {
    const fn new() -> Self {
        Self {
            data: [0; BUF_SIZE],
            len: 0,
            msg_len: BUF_SIZE,
            frame_len: 0,
        }
    }

    /// The last completed frame. Only meaningful after a `Complete` event.
    pub(crate) fn frame(&self) -> &[u8] {
        &self.data[..self.frame_len]
    }

    fn reset(&mut self) {
        self.len = 0;
        self.msg_len = BUF_SIZE;
    }

    fn clear(&mut self) {
        self.reset();
        self.frame_len = 0;
        self.data.fill(0);
    }
}

/// Byte-fed frame assembler.
pub(crate) struct Receiver {
    buffer: ResponseBuffer,
    absorbing_startup: bool,
}

impl Receiver {
    pub(crate) const fn new() -> Self {
        Self {
            buffer: ResponseBuffer::new(),
            absorbing_startup: false,
        }
    }

    pub(crate) fn buffer(&self) -> &ResponseBuffer {
        &self.buffer
    }

    /// Feed one byte, updating `status` as the frame progresses.
    pub(crate) fn push(&mut self, byte: u8, status: &StatusCell) -> RxEvent {
        let offset = self.buffer.len;

        match offset {
            0 => {
                if byte == RESPONSE_TIMEOUT_SENTINEL {
                    warn!("Command response timeout reported by module");
                    self.buffer.reset();
                    status.set(DriverStatus::ResponseTimeout);
                    return RxEvent::TimeoutSentinel;
                }
                if byte != HEADER {
                    return RxEvent::Discarded;
                }
                // The opcode decides whether this is the announcement.
                if status.get() != DriverStatus::Startup {
                    status.set(DriverStatus::Pending);
                }
                self.absorbing_startup = false;
                self.buffer.msg_len = BUF_SIZE;
            }
            1 => {
                let msg_len = byte as usize + RESPONSE_OVERHEAD;
                if msg_len > BUF_SIZE {
                    warn!("Response too long, {} bytes.", msg_len);
                    self.buffer.clear();
                    status.set(DriverStatus::Fail);
                    return RxEvent::Overflow;
                }
                debug!("Msg Total Len: {}", msg_len);
                self.buffer.msg_len = msg_len;
            }
            2 => {
                debug!("Msg Opcode: {:02X}", byte);
                if byte == opcode::VERSION_STARTUP {
                    self.absorbing_startup = true;
                    status.set(DriverStatus::Clear);
                } else if status.get() == DriverStatus::Startup {
                    status.set(DriverStatus::Pending);
                }
            }
            _ => {}
        }

        self.buffer.data[offset] = byte;
        self.buffer.len = offset + 1;

        if self.buffer.len < self.buffer.msg_len {
            return RxEvent::Accepted;
        }

        self.buffer.frame_len = self.buffer.len;
        self.buffer.len = 0;

        if self.absorbing_startup {
            self.absorbing_startup = false;
            debug!("Startup announcement absorbed");
            return RxEvent::StartupAbsorbed;
        }

        status.set(DriverStatus::Success);
        RxEvent::Complete
    }
}

/// Callback invoked with every completed frame.
pub type Callback = Box<dyn FnMut(&[u8]) + Send>;

pub(crate) struct Shared {
    pub(crate) status: StatusCell,
    receiver: Mutex<Receiver>,
    callback: Mutex<Option<Callback>>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            status: StatusCell::new(DriverStatus::Startup),
            receiver: Mutex::new(Receiver::new()),
            callback: Mutex::new(None),
        }
    }

    pub(crate) fn receiver(&self) -> MutexGuard<'_, Receiver> {
        self.receiver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_callback(&self, callback: Option<Callback>) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = callback;
    }

    /// Run `f` over the last completed frame.
    pub(crate) fn with_frame<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.receiver().buffer().frame())
    }
}

/// Receive-side handle a transport keeps and drives from its receive context.
#[derive(Clone)]
pub struct RxHandle {
    shared: Arc<Shared>,
}

impl RxHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Drain `fifo` through the state machine.
    ///
    /// Stops early on overflow or on the timeout marker, after flushing the FIFO.
    pub fn on_rx_ready<F: RxFifo + ?Sized>(&self, fifo: &mut F) {
        let mut chunk = [0u8; RX_CHUNK];

        while fifo.rx_ready() {
            let n = fifo.fifo_read(&mut chunk);
            if n == 0 {
                break;
            }

            for &byte in &chunk[..n] {
                if let RxEvent::Overflow | RxEvent::TimeoutSentinel = self.push(byte) {
                    fifo.flush();
                    debug!("UART RX buffer flushed.");
                    return;
                }
            }
        }
    }

    /// Feed a single byte, firing the callback when it completes a frame.
    pub fn push(&self, byte: u8) -> RxEvent {
        let mut frame = [0u8; BUF_SIZE];
        let mut frame_len = 0;

        let event = {
            let mut receiver = self.shared.receiver();
            let event = receiver.push(byte, &self.shared.status);
            if event == RxEvent::Complete {
                let completed = receiver.buffer().frame();
                frame_len = completed.len();
                frame[..frame_len].copy_from_slice(completed);
            }
            event
        };

        if event == RxEvent::Complete {
            debug!("Response received.");
            let mut callback = self.shared.callback.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(callback) = callback.as_mut() {
                callback(&frame[..frame_len]);
            }
        }

        event
    }

    /// Current driver status as seen by the receive path.
    pub fn status(&self) -> DriverStatus {
        self.shared.status.get()
    }
}
