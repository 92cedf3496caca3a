//! ThingMagic M6e Nano UHF RFID reader driver with support for multiple transport backends.
//!
//! Commands are framed as `FF LEN OPCODE PAYLOAD CRC` and written byte by byte.
//! Replies are assembled incrementally as the transport delivers bytes, so the
//! same receive path serves command replies and the unsolicited frames of
//! continuous reading (tag records, keep-alives, temperature reports).
//!
//! # Features
//!
//! - `uart-esp32` - UART transport for ESP32 using esp-idf-svc
//! - `serial` - Serial port transport for desktop using serialport crate
//!
//! # Example
//!
//! ```ignore
//! use m6e_nano::{M6eNano, Region, ResponseKind, SerialTransport, TagProtocol};
//!
//! let transport = SerialTransport::new("/dev/ttyUSB0", 115200)?;
//! let mut rfid = M6eNano::new(transport)?;
//!
//! rfid.set_tag_protocol(TagProtocol::Gen2)?;
//! rfid.set_antenna_port()?;
//! rfid.set_region(Region::Europe)?;
//! rfid.set_read_power(500)?;
//!
//! rfid.set_callback(|frame| log::info!("frame: {:02X?}", frame));
//! rfid.start_reading()?;
//!
//! loop {
//!     if let Ok(ResponseKind::TagFound) = rfid.parse_response() {
//!         println!("Found tag: {:?}", rfid.get_tag_info());
//!     }
//! }
//! ```

mod config;
mod crc;
mod frame;
mod reader;
mod receiver;
mod response;
mod transport;
mod types;

#[cfg(feature = "uart-esp32")]
mod uart;

#[cfg(feature = "serial")]
mod serial;

// Re-exports
pub use config::Config;
pub use crc::crc;
pub use frame::{build_frame, opcode, CommandBuffer, BUF_SIZE, HEADER, MAX_PAYLOAD};
pub use reader::M6eNano;
pub use receiver::{Callback, DriverStatus, RxEvent, RxHandle, RESPONSE_TIMEOUT_SENTINEL};
pub use response::{Response, ResponseKind};
pub use transport::{RfidTransport, RxFifo};
pub use types::{PowerMode, Region, TagInfo, TagProtocol, UhfError, VersionInfo};

#[cfg(feature = "uart-esp32")]
pub use uart::UartTransport;

#[cfg(feature = "serial")]
pub use serial::SerialTransport;
