//! Serial port transport for desktop using serialport crate
//!
//! A background thread stands in for the receive interrupt: it watches the
//! port and hands waiting bytes to the reader's receive handler.

use crate::receiver::RxHandle;
use crate::transport::{RfidTransport, RxFifo};
use log::error;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const RX_IDLE: Duration = Duration::from_millis(1);

pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    stop: Arc<AtomicBool>,
    rx_thread: Option<JoinHandle<()>>,
}

impl SerialTransport {
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_secs(1))
            .open()?;
        port.clear(serialport::ClearBuffer::Input)?;

        Ok(Self {
            port,
            stop: Arc::new(AtomicBool::new(false)),
            rx_thread: None,
        })
    }
}

impl RfidTransport for SerialTransport {
    type Error = std::io::Error;

    fn attach_receiver(&mut self, rx: RxHandle) -> Result<(), Self::Error> {
        let port = self.port.try_clone().map_err(std::io::Error::other)?;
        let stop = Arc::clone(&self.stop);

        let handle = thread::Builder::new()
            .name("m6e-nano-rx".into())
            .spawn(move || {
                let mut fifo = SerialFifo { port };
                while !stop.load(Ordering::Relaxed) {
                    match fifo.port.bytes_to_read() {
                        Ok(0) => thread::sleep(RX_IDLE),
                        Ok(_) => rx.on_rx_ready(&mut fifo),
                        Err(e) => {
                            error!("Serial receive failed: {:?}", e);
                            break;
                        }
                    }
                }
            })?;

        self.rx_thread = Some(handle);
        Ok(())
    }

    fn poll_out(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.port.write_all(&[byte])
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.rx_thread.take() {
            let _ = handle.join();
        }
    }
}

pub(crate) struct SerialFifo {
    pub(crate) port: Box<dyn serialport::SerialPort>,
}

impl RxFifo for SerialFifo {
    fn rx_ready(&mut self) -> bool {
        match self.port.bytes_to_read() {
            Ok(n) => n > 0,
            Err(e) => {
                error!("Failed to poll serial input: {:?}", e);
                false
            }
        }
    }

    fn fifo_read(&mut self, buf: &mut [u8]) -> usize {
        let available = match self.port.bytes_to_read() {
            Ok(n) => n as usize,
            Err(e) => {
                error!("Failed to poll serial input: {:?}", e);
                return 0;
            }
        };
        let len = available.min(buf.len());
        if len == 0 {
            return 0;
        }
        match self.port.read(&mut buf[..len]) {
            Ok(n) => n,
            Err(e) => {
                error!("Serial read failed: {:?}", e);
                0
            }
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.port.clear(serialport::ClearBuffer::Input) {
            error!("Failed to flush serial input: {:?}", e);
        }
    }
}
