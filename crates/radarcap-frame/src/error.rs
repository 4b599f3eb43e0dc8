use std::time::Duration;

/// Errors from command encoding, packet decoding and frame geometry.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Command parameters do not fit the 2-byte length field.
    #[error("command params too large ({size} bytes, max {max})")]
    ParamsTooLarge { size: usize, max: usize },

    /// A raw command was not valid hex text.
    #[error("invalid hex command: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// A command message is shorter than its framing requires.
    #[error("command message truncated ({len} bytes, need {need})")]
    Truncated { len: usize, need: usize },

    /// The command message does not start with 0x5AA5.
    #[error("invalid command header (expected 0x5AA5)")]
    InvalidHeader,

    /// The command message does not end with 0xAAEE.
    #[error("invalid command footer (expected 0xAAEE)")]
    InvalidFooter,

    /// The command code is not part of the protocol.
    #[error("unknown command code 0x{0:04x}")]
    UnknownCommand(u16),

    /// A command name did not match any protocol command.
    #[error("unknown command name: {0}")]
    UnknownCommandName(String),

    /// The declared parameter length disagrees with the message size.
    #[error("param length mismatch (declared {declared}, actual {actual})")]
    LengthMismatch { declared: usize, actual: usize },

    /// The ADC configuration cannot produce a frame geometry.
    #[error("invalid capture config: {0}")]
    InvalidConfig(String),

    /// No data packet arrived before the timeout.
    #[error("data packet receive timed out after {0:?}")]
    Timeout(Duration),

    /// A data datagram was shorter than the packet header.
    #[error("malformed data packet ({len} bytes, header is {header})")]
    MalformedPacket { len: usize, header: usize },

    /// Socket-level failure on the data link.
    #[error("data transport error: {0}")]
    Transport(radarcap_transport::TransportError),
}

impl From<radarcap_transport::TransportError> for FrameError {
    fn from(err: radarcap_transport::TransportError) -> Self {
        match err {
            radarcap_transport::TransportError::Timeout(after) => FrameError::Timeout(after),
            other => FrameError::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
