//! Classification and field decoding of received frames.
//!
//! Continuous reading produces a stream of `READ_TAG_ID_MULTIPLE` frames. A
//! tag record looks like this (example from a Gen2 tag with a 96-bit EPC):
//!
//! ```text
//! FF 28 22 00 00 10 00 1B 01 FF 01 01 C4 11 0E 16
//! 40 00 00 01 27 00 00 05 00 00 0F 00 80 30 00 00
//! 00 00 00 00 00 00 00 00 00 15 45 E9 4A 56 1D
//!
//! [0]        FF           header
//! [1]        28           length
//! [2]        22           opcode
//! [3, 4]     00 00        status
//! [5..=11]   10 .. 01     reserved
//! [12]       C4           RSSI
//! [13]       11           antenna (TX in high nibble, RX in low)
//! [14..=16]  0E 16 40     frequency, kHz
//! [17..=20]  00 00 01 27  ms since last keep-alive
//! [21, 22]   00 00        phase
//! [23]       05           protocol
//! [24, 25]   00 00        embedded data length in bits (M bytes follow)
//! [26 + M]   0F           reserved
//! [27, 28]+M 00 80        EPC length in bits, PC and EPC CRC included
//! [29, 30]+M 30 00        PC word
//! [31..]+M   ..           EPC
//! then 2 bytes EPC CRC and 2 bytes frame CRC
//! ```

use crate::crc::frame_crc_ok;
use crate::frame::opcode;
use crate::types::{bytes_to_hex, TagInfo, UhfError, VersionInfo};

const STATUS_KEEP_ALIVE: u16 = 0x0400;
const STATUS_TEMP_THROTTLE: u16 = 0x0504;

const LEN_READ_CYCLE_STATUS: u8 = 0x00;
const LEN_UNKNOWN: u8 = 0x08;
const LEN_TEMPERATURE: u8 = 0x0A;

const RSSI_OFFSET: usize = 12;
const FREQUENCY_OFFSET: usize = 14;
const TIMESTAMP_OFFSET: usize = 17;
const TAG_DATA_LEN_OFFSET: usize = 24;
const EPC_LEN_OFFSET: usize = 27;
const EPC_OFFSET: usize = 31;
/// PC word and EPC CRC, counted in the EPC bit length
const EPC_FRAMING_BYTES: usize = 4;

/// What a continuous-read frame carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Read cycle is alive; sent about once a second
    KeepAlive,
    /// Module is reducing duty cycle because it is too hot
    TempThrottle,
    /// Temperature report
    Temperature,
    /// A tag record
    TagFound,
    /// Recognized frame without a known meaning
    Unknown,
}

/// Read-only view of one received frame.
#[derive(Debug, Clone, Copy)]
pub struct Response<'a> {
    frame: &'a [u8],
}

impl<'a> Response<'a> {
    pub fn new(frame: &'a [u8]) -> Self {
        Self { frame }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.frame
    }

    /// The `LEN` field
    pub fn len_field(&self) -> u8 {
        self.byte(1)
    }

    pub fn opcode(&self) -> u8 {
        self.byte(2)
    }

    /// Status word at bytes 3..=4
    pub fn status_word(&self) -> u16 {
        self.be(3, 2) as u16
    }

    pub fn crc_ok(&self) -> bool {
        frame_crc_ok(self.frame)
    }

    /// Sort a frame into one of the continuous-read categories.
    pub fn classify(&self) -> Result<ResponseKind, UhfError> {
        if !self.crc_ok() {
            return Err(UhfError::CorruptResponse);
        }

        if self.opcode() != opcode::READ_TAG_ID_MULTIPLE {
            return Err(UhfError::UnknownOpcode(self.opcode()));
        }

        Ok(match self.len_field() {
            LEN_READ_CYCLE_STATUS => match self.status_word() {
                STATUS_KEEP_ALIVE => ResponseKind::KeepAlive,
                STATUS_TEMP_THROTTLE => ResponseKind::TempThrottle,
                _ => ResponseKind::Unknown,
            },
            LEN_UNKNOWN => ResponseKind::Unknown,
            LEN_TEMPERATURE => ResponseKind::Temperature,
            _ => ResponseKind::TagFound,
        })
    }

    /// Tag RSSI in dBm
    pub fn tag_rssi(&self) -> i16 {
        self.byte(RSSI_OFFSET) as i8 as i16
    }

    /// Carrier frequency in kHz
    pub fn tag_freq(&self) -> u32 {
        self.be(FREQUENCY_OFFSET, 3)
    }

    /// Milliseconds since the last keep-alive
    pub fn tag_timestamp(&self) -> u32 {
        self.be(TIMESTAMP_OFFSET, 4)
    }

    /// Length of the embedded tag data, rounded up to whole bytes
    pub fn tag_data_bytes(&self) -> usize {
        (self.be(TAG_DATA_LEN_OFFSET, 2) as usize).div_ceil(8)
    }

    /// Number of EPC bytes, without the PC word and EPC CRC
    pub fn tag_epc_bytes(&self) -> usize {
        let epc_bits = self.be(EPC_LEN_OFFSET + self.tag_data_bytes(), 2) as usize;
        (epc_bits / 8).saturating_sub(EPC_FRAMING_BYTES)
    }

    /// The EPC, or `None` if the frame is too short to hold it
    pub fn tag_epc(&self) -> Option<&'a [u8]> {
        let start = EPC_OFFSET + self.tag_data_bytes();
        self.frame.get(start..start + self.tag_epc_bytes())
    }

    /// Everything the frame says about the tag, if it is a tag record
    pub fn tag_info(&self) -> Option<TagInfo> {
        if self.classify().ok()? != ResponseKind::TagFound {
            return None;
        }

        Some(TagInfo {
            epc: bytes_to_hex(self.tag_epc()?),
            rssi: self.tag_rssi(),
            frequency_khz: self.tag_freq(),
            timestamp_ms: self.tag_timestamp(),
        })
    }

    /// Decode a reply to the version command
    pub fn version(&self) -> Result<VersionInfo, UhfError> {
        const FIELDS_OFFSET: usize = 5;

        let fields = self
            .frame
            .get(FIELDS_OFFSET..FIELDS_OFFSET + 20)
            .ok_or_else(|| {
                UhfError::InvalidResponse(format!(
                    "Version response too short: {} bytes",
                    self.frame.len()
                ))
            })?;

        let field = |i: usize| -> [u8; 4] {
            let mut out = [0u8; 4];
            out.copy_from_slice(&fields[i * 4..i * 4 + 4]);
            out
        };

        Ok(VersionInfo {
            bootloader: field(0),
            hardware: field(1),
            firmware_date: field(2),
            firmware: field(3),
            supported_protocols: field(4),
        })
    }

    /// Decode a reply to the get-write-power command, in centi-dBm
    pub fn write_power(&self) -> Result<u16, UhfError> {
        // status, option byte, then the power word
        match self.frame.get(6..8) {
            Some(&[hi, lo]) if self.frame.len() >= 10 => Ok(u16::from_be_bytes([hi, lo])),
            _ => Err(UhfError::InvalidResponse(format!(
                "Write power response too short: {} bytes",
                self.frame.len()
            ))),
        }
    }

    fn byte(&self, offset: usize) -> u8 {
        self.frame.get(offset).copied().unwrap_or(0)
    }

    fn be(&self, offset: usize, width: usize) -> u32 {
        (offset..offset + width).fold(0u32, |acc, i| (acc << 8) | self.byte(i) as u32)
    }
}
