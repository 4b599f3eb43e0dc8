use crate::error::{FrameError, Result};

/// Data packet header: sequence (4) + byte counter (6) = 10 bytes.
pub const HEADER_SIZE: usize = 10;

/// Largest datagram accepted on the data link.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// Nominal ADC payload carried by one data packet, in bytes.
pub const NOMINAL_PAYLOAD_BYTES: usize = 1456;

/// One datagram from the data link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacket {
    /// Board-side packet sequence number, starting at 1.
    pub sequence: i32,
    /// ADC bytes sent by the board up to and including this packet.
    pub byte_count: u64,
    /// Interleaved ADC samples.
    pub payload: Vec<u16>,
}

impl DataPacket {
    /// Create a new packet.
    pub fn new(sequence: i32, byte_count: u64, payload: Vec<u16>) -> Self {
        Self {
            sequence,
            byte_count,
            payload,
        }
    }
}

/// Rebuild the 48-bit byte counter from its wire bytes.
///
/// The six bytes are reversed, prefixed with two zero bytes and read as a
/// big-endian `u64`.
pub fn byte_count_from_wire(raw: [u8; 6]) -> u64 {
    let mut be = [0u8; 8];
    for (dst, src) in be[2..].iter_mut().zip(raw.iter().rev()) {
        *dst = *src;
    }
    u64::from_be_bytes(be)
}

/// Inverse of [`byte_count_from_wire`]; the upper 16 bits are discarded.
pub fn byte_count_to_wire(count: u64) -> [u8; 6] {
    let be = count.to_be_bytes();
    let mut raw = [0u8; 6];
    for (dst, src) in raw.iter_mut().zip(be[2..].iter().rev()) {
        *dst = *src;
    }
    raw
}

/// Decode a data datagram.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────┬──────────────────────────┐
/// │ Sequence     │ Byte counter     │ Samples                  │
/// │ (4B LE i32)  │ (6B, reversed)   │ (LE u16 words)           │
/// └──────────────┴──────────────────┴──────────────────────────┘
/// ```
///
/// A trailing odd byte cannot form a sample and is ignored.
pub fn decode_packet(src: &[u8]) -> Result<DataPacket> {
    if src.len() < HEADER_SIZE {
        return Err(FrameError::MalformedPacket {
            len: src.len(),
            header: HEADER_SIZE,
        });
    }

    let sequence = i32::from_le_bytes([src[0], src[1], src[2], src[3]]);
    let byte_count = byte_count_from_wire([src[4], src[5], src[6], src[7], src[8], src[9]]);
    let payload = src[HEADER_SIZE..]
        .chunks_exact(2)
        .map(|word| u16::from_le_bytes([word[0], word[1]]))
        .collect();

    Ok(DataPacket {
        sequence,
        byte_count,
        payload,
    })
}

/// Encode a data packet, as the board would send it.
pub fn encode_packet(packet: &DataPacket) -> Vec<u8> {
    let mut wire = Vec::with_capacity(HEADER_SIZE + packet.payload.len() * 2);
    wire.extend_from_slice(&packet.sequence.to_le_bytes());
    wire.extend_from_slice(&byte_count_to_wire(packet.byte_count));
    for word in &packet.payload {
        wire.extend_from_slice(&word.to_le_bytes());
    }
    wire
}
