//! Types for M6e Nano operations

use thiserror::Error;

/// Operating region, which fixes the hopping table the module transmits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Region {
    India = 0x04,
    Japan = 0x05,
    China = 0x06,
    Europe = 0x08,
    Korea = 0x09,
    Australia = 0x0B,
    NewZealand = 0x0C,
    NorthAmerica = 0x0D,
    Open = 0xFF,
}

/// Air protocol used for tag operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TagProtocol {
    None = 0x00,
    Iso180006B = 0x03,
    Gen2 = 0x05,
    Iso180006BUcode = 0x06,
    Ipx64 = 0x07,
    Ipx256 = 0x08,
    Ata = 0x1D,
}

/// Module power-saving mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PowerMode {
    Full = 0x00,
    MinSave = 0x01,
    MedSave = 0x02,
    MaxSave = 0x03,
}

/// Information about a tag reported during continuous reading
#[derive(Debug, Clone)]
pub struct TagInfo {
    pub epc: String,
    /// Signal strength in dBm
    pub rssi: i16,
    /// Carrier frequency the tag answered on, in kHz
    pub frequency_khz: u32,
    /// Milliseconds since the last keep-alive
    pub timestamp_ms: u32,
}

impl PartialEq for TagInfo {
    fn eq(&self, other: &Self) -> bool {
        self.epc == other.epc
    }
}

/// Decoded reply to the version command.
///
/// Each field is four raw bytes as reported by the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub bootloader: [u8; 4],
    pub hardware: [u8; 4],
    pub firmware_date: [u8; 4],
    pub firmware: [u8; 4],
    pub supported_protocols: [u8; 4],
}

/// Errors that can occur during M6e Nano operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UhfError {
    /// Transport layer error (UART, serial, etc.)
    #[error("transport error: {0}")]
    Transport(String),
    /// The byte channel was not ready when the driver was created
    #[error("transport unavailable")]
    TransportUnavailable,
    /// Payload longer than a frame can carry
    #[error("invalid payload length: {0} bytes (maximum 250)")]
    InvalidLength(usize),
    /// No complete reply arrived before the response timeout
    #[error("timed out waiting for a response")]
    Timeout,
    /// The module answered with its in-band timeout marker
    #[error("module reported a command response timeout")]
    CommandResponseTimeout,
    /// The receive buffer overflowed while waiting for a reply
    #[error("response overflowed the receive buffer")]
    ResponseFail,
    /// CRC mismatch on a received frame
    #[error("corrupt response: CRC mismatch")]
    CorruptResponse,
    /// Frame with an opcode the classifier does not interpret
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    /// Reply opcode differs from the command that was sent
    #[error("wrong opcode in response: expected {expected:#04x}, got {actual:#04x}")]
    WrongOpcodeResponse { expected: u8, actual: u8 },
    /// Reply carried a non-zero status word
    #[error("module returned status {0:#06x}")]
    ModuleStatus(u16),
    /// Invalid response received from the reader
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Convert bytes to uppercase hex string
pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}
