//! Wire formats and frame reassembly for radar capture boards.
//!
//! Two formats travel over the board's UDP links:
//! - Command messages on the control link: `5A A5 | code | length | params | AA EE`
//! - Data packets on the data link: a 10-byte header (sequence number and
//!   cumulative byte counter) followed by little-endian ADC samples
//!
//! [`FrameAssembler`] turns the lossy, possibly reordered packet stream into
//! fixed-size frames and reports how many packets each frame is missing.

pub mod assembler;
pub mod command;
pub mod error;
pub mod geometry;
pub mod packet;
pub mod reader;

pub use assembler::{AssemblerEvent, AssemblerStats, Frame, FrameAssembler, OverflowPolicy};
pub use command::{
    decode_command, decode_reply, encode_command, encode_raw, CommandCode, CommandMessage,
    CommandReply, FPGA_CONFIG_PARAMS, PACKET_DATA_PARAMS,
};
pub use error::{FrameError, Result};
pub use geometry::{AdcConfig, FrameGeometry};
pub use packet::{
    byte_count_from_wire, decode_packet, encode_packet, DataPacket, HEADER_SIZE,
    MAX_DATAGRAM_SIZE, NOMINAL_PAYLOAD_BYTES,
};
pub use reader::DataChannel;
