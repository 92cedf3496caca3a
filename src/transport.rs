use crate::receiver::RxHandle;

/// Trait for M6e Nano communication backends.
/// Implement this trait for different transports (UART, serial port, etc.)
///
/// The transmit side is driven by the reader, one byte at a time. The receive
/// side is event driven: after [`attach_receiver`](Self::attach_receiver) the
/// backend calls [`RxHandle::on_rx_ready`] from its receive context (interrupt
/// handler, reader thread) whenever bytes are waiting.
pub trait RfidTransport {
    /// Error type for transport operations
    type Error: std::fmt::Debug;

    /// Whether the underlying byte channel can be used
    fn is_ready(&self) -> bool {
        true
    }

    /// Install the receive handler. Called once, when the reader is created.
    fn attach_receiver(&mut self, rx: RxHandle) -> Result<(), Self::Error>;

    /// Write a single byte, blocking until the transmitter accepts it
    fn poll_out(&mut self, byte: u8) -> Result<(), Self::Error>;
}

/// Receive FIFO of a transport, as seen from its receive context.
pub trait RxFifo {
    /// Whether at least one byte is waiting
    fn rx_ready(&mut self) -> bool;

    /// Move up to `buf.len()` waiting bytes into `buf`, returning the count
    fn fifo_read(&mut self, buf: &mut [u8]) -> usize;

    /// Discard everything waiting in the FIFO
    fn flush(&mut self) {
        let mut scratch = [0u8; 16];
        while self.fifo_read(&mut scratch) > 0 {}
    }
}
