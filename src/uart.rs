//! UART transport for ESP32 using esp-idf-svc

use crate::receiver::RxHandle;
use crate::transport::{RfidTransport, RxFifo};
use esp_idf_svc::hal::delay::{BLOCK, NON_BLOCK};
use esp_idf_svc::hal::gpio::{self, InputPin, OutputPin};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{self, UartDriver, UartRxDriver, UartTxDriver};
use esp_idf_svc::sys::{EspError, ESP_ERR_INVALID_STATE, ESP_FAIL};
use log::error;
use std::time::Duration;

const RX_STACK_SIZE: usize = 4096;

pub struct UartTransport {
    tx: UartTxDriver<'static>,
    rx: Option<UartRxDriver<'static>>,
}

impl UartTransport {
    pub fn new(
        uart: impl Peripheral<P = impl uart::Uart> + 'static,
        tx: impl Peripheral<P = impl OutputPin> + 'static,
        rx: impl Peripheral<P = impl InputPin> + 'static,
        baud_rate: u32,
    ) -> Result<Self, EspError> {
        // 8-N-1, the module's default framing
        let config = uart::config::Config::default().baudrate(baud_rate.into());
        let uart = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<gpio::Gpio0>::None,
            Option::<gpio::Gpio0>::None,
            &config,
        )?;

        std::thread::sleep(Duration::from_millis(500));
        uart.clear_rx()?;

        let (tx, rx) = uart.into_split();
        Ok(Self { tx, rx: Some(rx) })
    }
}

impl RfidTransport for UartTransport {
    type Error = EspError;

    fn is_ready(&self) -> bool {
        self.rx.is_some()
    }

    fn attach_receiver(&mut self, handle: RxHandle) -> Result<(), Self::Error> {
        let rx = self
            .rx
            .take()
            .ok_or_else(EspError::from_infallible::<{ ESP_ERR_INVALID_STATE as i32 }>)?;

        std::thread::Builder::new()
            .stack_size(RX_STACK_SIZE)
            .spawn(move || {
                let mut fifo = UartFifo { rx, pending: None };
                let mut first = [0u8; 1];
                loop {
                    match fifo.rx.read(&mut first, BLOCK) {
                        Ok(1) => {
                            fifo.pending = Some(first[0]);
                            handle.on_rx_ready(&mut fifo);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("UART receive failed: {:?}", e);
                            break;
                        }
                    }
                }
            })
            .map_err(|_| EspError::from_infallible::<ESP_FAIL>())?;

        Ok(())
    }

    fn poll_out(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.tx.write(&[byte]).map(|_| ())
    }
}

struct UartFifo {
    rx: UartRxDriver<'static>,
    /// Byte the blocking wait already pulled out of the driver
    pending: Option<u8>,
}

impl RxFifo for UartFifo {
    fn rx_ready(&mut self) -> bool {
        self.pending.is_some() || self.rx.remaining_read().map(|n| n > 0).unwrap_or(false)
    }

    fn fifo_read(&mut self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        if let Some(byte) = self.pending.take() {
            buf[0] = byte;
            return 1;
        }
        self.rx.read(buf, NON_BLOCK).unwrap_or(0)
    }

    fn flush(&mut self) {
        self.pending = None;
        if let Err(e) = self.rx.clear() {
            error!("Failed to flush UART input: {:?}", e);
        }
    }
}
