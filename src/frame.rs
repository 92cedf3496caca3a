//! Outbound frame construction.

use crate::crc::crc;
use crate::types::UhfError;

/// Start-of-frame byte shared by commands and responses.
pub const HEADER: u8 = 0xFF;

/// Capacity of the command and response buffers.
pub const BUF_SIZE: usize = 255;

/// Largest payload a command may carry.
pub const MAX_PAYLOAD: usize = 250;

/// Bytes a command adds around its payload: header, length, opcode, CRC.
pub const COMMAND_OVERHEAD: usize = 5;

/// Bytes a response adds to its `LEN` field: header, length, opcode, status, CRC.
pub const RESPONSE_OVERHEAD: usize = 7;

/// Opcodes understood by the M6e Nano serial reader.
pub mod opcode {
    pub const VERSION: u8 = 0x03;
    /// Sent once, unsolicited, when the module powers up.
    pub const VERSION_STARTUP: u8 = 0x04;
    pub const SET_BAUD_RATE: u8 = 0x06;
    pub const READ_TAG_ID_SINGLE: u8 = 0x21;
    pub const READ_TAG_ID_MULTIPLE: u8 = 0x22;
    pub const WRITE_TAG_ID: u8 = 0x23;
    pub const WRITE_TAG_DATA: u8 = 0x24;
    pub const KILL_TAG: u8 = 0x26;
    pub const READ_TAG_DATA: u8 = 0x28;
    pub const CLEAR_TAG_ID_BUFFER: u8 = 0x2A;
    pub const MULTI_PROTOCOL_TAG_OP: u8 = 0x2F;
    pub const GET_READ_TX_POWER: u8 = 0x62;
    pub const GET_WRITE_TX_POWER: u8 = 0x64;
    pub const GET_USER_GPIO_INPUTS: u8 = 0x66;
    pub const GET_POWER_MODE: u8 = 0x68;
    pub const GET_READER_OPTIONAL_PARAMS: u8 = 0x6A;
    pub const GET_PROTOCOL_PARAM: u8 = 0x6B;
    pub const SET_ANTENNA_PORT: u8 = 0x91;
    pub const SET_READ_TX_POWER: u8 = 0x92;
    pub const SET_TAG_PROTOCOL: u8 = 0x93;
    pub const SET_WRITE_TX_POWER: u8 = 0x94;
    pub const SET_USER_GPIO_OUTPUTS: u8 = 0x96;
    pub const SET_REGION: u8 = 0x97;
    pub const SET_POWER_MODE: u8 = 0x98;
    pub const SET_READER_OPTIONAL_PARAMS: u8 = 0x9A;
    pub const SET_PROTOCOL_PARAM: u8 = 0x9B;
}

/// Fixed-capacity holder for the frame currently being sent.
#[derive(Clone)]
pub struct CommandBuffer {
    data: [u8; BUF_SIZE],
    len: usize,
}

impl CommandBuffer {
    pub const fn new() -> Self {
        Self {
            data: [0; BUF_SIZE],
            len: 0,
        }
    }

    /// Compose `FF LEN OPCODE PAYLOAD CRC_HI CRC_LO` in place.
    ///
    /// On error the previous contents are left untouched.
    pub fn build(&mut self, opcode: u8, payload: &[u8]) -> Result<&[u8], UhfError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(UhfError::InvalidLength(payload.len()));
        }

        let n = payload.len();
        self.data[0] = HEADER;
        self.data[1] = n as u8;
        self.data[2] = opcode;
        self.data[3..3 + n].copy_from_slice(payload);

        let [hi, lo] = crc(&self.data[1..3 + n]).to_be_bytes();
        self.data[3 + n] = hi;
        self.data[4 + n] = lo;
        self.len = n + COMMAND_OVERHEAD;

        Ok(self.as_bytes())
    }

    /// The valid part of the buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn opcode(&self) -> Option<u8> {
        (self.len > 2).then(|| self.data[2])
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommandBuffer({:02X?})", self.as_bytes())
    }
}

/// Build a standalone command frame.
pub fn build_frame(opcode: u8, payload: &[u8]) -> Result<Vec<u8>, UhfError> {
    let mut buf = CommandBuffer::new();
    buf.build(opcode, payload).map(<[u8]>::to_vec)
}
