//! CRC used by the M6e Nano serial protocol.
//!
//! CCITT polynomial (0x1021), seeded with 0xFFFF, fed one nibble at a time
//! through a 16-entry table. Frames carry it big-endian in their last two bytes.

const CRC_TABLE: [u16; 16] = [
    0x0000, 0x1021, 0x2042, 0x3063, 0x4084, 0x50a5, 0x60c6, 0x70e7, 0x8108, 0x9129, 0xa14a,
    0xb16b, 0xc18c, 0xd1ad, 0xe1ce, 0xf1ef,
];

const CRC_SEED: u16 = 0xFFFF;

/// Compute the frame CRC over `bytes`.
///
/// Callers pass the frame without its `0xFF` header and without the two CRC bytes.
pub fn crc(bytes: &[u8]) -> u16 {
    bytes.iter().fold(CRC_SEED, |crc, &b| {
        let crc = ((crc << 4) | (b >> 4) as u16) ^ CRC_TABLE[(crc >> 12) as usize];
        ((crc << 4) | (b & 0x0F) as u16) ^ CRC_TABLE[(crc >> 12) as usize]
    })
}

/// Check the trailing big-endian CRC of a complete frame (header included).
pub(crate) fn frame_crc_ok(frame: &[u8]) -> bool {
    if frame.len() < 3 {
        return false;
    }
    let body_end = frame.len() - 2;
    let expected = u16::from_be_bytes([frame[body_end], frame[body_end + 1]]);
    crc(&frame[1..body_end]) == expected
}
