use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Command header: 0x5A 0xA5.
pub const HEADER: [u8; 2] = [0x5A, 0xA5];

/// Command footer: 0xAA 0xEE.
pub const FOOTER: [u8; 2] = [0xAA, 0xEE];

/// Framing overhead: header (2) + code (2) + length (2) + footer (2) = 8 bytes.
pub const FRAMING_SIZE: usize = 8;

/// Largest parameter block the 2-byte length field can describe.
pub const MAX_PARAMS: usize = u16::MAX as usize;

/// Parameters for [`CommandCode::ConfigFpgaGen`]: raw capture mode, LVDS
/// capture, ethernet streaming, 12-bit ADC, sample swap, 30 s timer.
pub const FPGA_CONFIG_PARAMS: [u8; 6] = [0x01, 0x02, 0x01, 0x02, 0x03, 0x1E];

/// Parameters for [`CommandCode::ConfigPacketData`]: 1470-byte packets,
/// inter-packet delay 0x0C35.
pub const PACKET_DATA_PARAMS: [u8; 6] = [0xBE, 0x05, 0x35, 0x0C, 0x00, 0x00];

/// Every command the capture board understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCode {
    ResetFpga,
    ResetArDevice,
    ConfigFpgaGen,
    ConfigEeprom,
    RecordStart,
    RecordStop,
    PlaybackStart,
    PlaybackStop,
    SystemConnect,
    SystemError,
    ConfigPacketData,
    ConfigDataModeArDevice,
    InitFpgaPlayback,
    ReadFpgaVersion,
}

impl CommandCode {
    /// All commands in protocol order.
    pub const ALL: [CommandCode; 14] = [
        CommandCode::ResetFpga,
        CommandCode::ResetArDevice,
        CommandCode::ConfigFpgaGen,
        CommandCode::ConfigEeprom,
        CommandCode::RecordStart,
        CommandCode::RecordStop,
        CommandCode::PlaybackStart,
        CommandCode::PlaybackStop,
        CommandCode::SystemConnect,
        CommandCode::SystemError,
        CommandCode::ConfigPacketData,
        CommandCode::ConfigDataModeArDevice,
        CommandCode::InitFpgaPlayback,
        CommandCode::ReadFpgaVersion,
    ];

    /// Wire value, sent little-endian.
    pub fn as_u16(self) -> u16 {
        match self {
            CommandCode::ResetFpga => 0x01,
            CommandCode::ResetArDevice => 0x02,
            CommandCode::ConfigFpgaGen => 0x03,
            CommandCode::ConfigEeprom => 0x04,
            CommandCode::RecordStart => 0x05,
            CommandCode::RecordStop => 0x06,
            CommandCode::PlaybackStart => 0x07,
            CommandCode::PlaybackStop => 0x08,
            CommandCode::SystemConnect => 0x09,
            CommandCode::SystemError => 0x0A,
            CommandCode::ConfigPacketData => 0x0B,
            CommandCode::ConfigDataModeArDevice => 0x0C,
            CommandCode::InitFpgaPlayback => 0x0D,
            CommandCode::ReadFpgaVersion => 0x0E,
        }
    }

    /// Command-line name, e.g. `record-start`.
    pub fn name(self) -> &'static str {
        match self {
            CommandCode::ResetFpga => "reset-fpga",
            CommandCode::ResetArDevice => "reset-ar-device",
            CommandCode::ConfigFpgaGen => "config-fpga-gen",
            CommandCode::ConfigEeprom => "config-eeprom",
            CommandCode::RecordStart => "record-start",
            CommandCode::RecordStop => "record-stop",
            CommandCode::PlaybackStart => "playback-start",
            CommandCode::PlaybackStop => "playback-stop",
            CommandCode::SystemConnect => "system-connect",
            CommandCode::SystemError => "system-error",
            CommandCode::ConfigPacketData => "config-packet-data",
            CommandCode::ConfigDataModeArDevice => "config-data-mode-ar-device",
            CommandCode::InitFpgaPlayback => "init-fpga-playback",
            CommandCode::ReadFpgaVersion => "read-fpga-version",
        }
    }
}

impl TryFrom<u16> for CommandCode {
    type Error = FrameError;

    fn try_from(value: u16) -> Result<Self> {
        CommandCode::ALL
            .into_iter()
            .find(|code| code.as_u16() == value)
            .ok_or(FrameError::UnknownCommand(value))
    }
}

impl FromStr for CommandCode {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        CommandCode::ALL
            .into_iter()
            .find(|code| code.name() == wanted)
            .ok_or_else(|| FrameError::UnknownCommandName(s.to_string()))
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded command message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMessage {
    pub code: CommandCode,
    pub params: Bytes,
}

impl CommandMessage {
    /// Create a new command message.
    pub fn new(code: CommandCode, params: impl Into<Bytes>) -> Self {
        Self {
            code,
            params: params.into(),
        }
    }

    /// Encode this message into its wire form.
    pub fn encode(&self) -> Result<Bytes> {
        encode_command(self.code, &self.params)
    }

    /// The total wire size of this message.
    pub fn wire_size(&self) -> usize {
        FRAMING_SIZE + self.params.len()
    }
}

/// A board reply: `header | code | status | footer`.
///
/// The status word is carried through untouched; the protocol does not
/// define a universal meaning for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandReply {
    pub code: CommandCode,
    pub status: u16,
}

/// Encode a command into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬───────────┬───────────┬──────────────┬────────────┐
/// │ Header     │ Code      │ Length    │ Params       │ Footer     │
/// │ 0x5A 0xA5  │ (2B LE)   │ (2B LE)   │ (Length B)   │ 0xAA 0xEE  │
/// └────────────┴───────────┴───────────┴──────────────┴────────────┘
/// ```
pub fn encode_command(code: CommandCode, params: &[u8]) -> Result<Bytes> {
    if params.len() > MAX_PARAMS {
        return Err(FrameError::ParamsTooLarge {
            size: params.len(),
            max: MAX_PARAMS,
        });
    }
    let mut dst = BytesMut::with_capacity(FRAMING_SIZE + params.len());
    dst.put_slice(&HEADER);
    dst.put_u16_le(code.as_u16());
    dst.put_u16_le(params.len() as u16);
    dst.put_slice(params);
    dst.put_slice(&FOOTER);
    Ok(dst.freeze())
}

/// Decode hex text into a pre-built message, e.g. `"5aa506000000aaee"`.
///
/// Whitespace is ignored. Nothing beyond hex decoding is checked, so
/// undocumented commands pass through unchanged.
pub fn encode_raw(hex_text: &str) -> Result<Bytes> {
    let compact: String = hex_text.split_whitespace().collect();
    Ok(Bytes::from(hex::decode(compact)?))
}

/// Decode a complete command message.
pub fn decode_command(src: &[u8]) -> Result<CommandMessage> {
    if src.len() < FRAMING_SIZE {
        return Err(FrameError::Truncated {
            len: src.len(),
            need: FRAMING_SIZE,
        });
    }
    if src[0..2] != HEADER {
        return Err(FrameError::InvalidHeader);
    }
    if src[src.len() - 2..] != FOOTER {
        return Err(FrameError::InvalidFooter);
    }

    let code = CommandCode::try_from(u16::from_le_bytes([src[2], src[3]]))?;
    let declared = u16::from_le_bytes([src[4], src[5]]) as usize;
    let actual = src.len() - FRAMING_SIZE;
    if declared != actual {
        return Err(FrameError::LengthMismatch { declared, actual });
    }

    Ok(CommandMessage {
        code,
        params: Bytes::copy_from_slice(&src[6..6 + actual]),
    })
}

/// Decode an 8-byte board reply.
pub fn decode_reply(src: &[u8]) -> Result<CommandReply> {
    if src.len() < FRAMING_SIZE {
        return Err(FrameError::Truncated {
            len: src.len(),
            need: FRAMING_SIZE,
        });
    }
    if src[0..2] != HEADER {
        return Err(FrameError::InvalidHeader);
    }
    if src[6..8] != FOOTER {
        return Err(FrameError::InvalidFooter);
    }

    Ok(CommandReply {
        code: CommandCode::try_from(u16::from_le_bytes([src[2], src[3]]))?,
        status: u16::from_le_bytes([src[4], src[5]]),
    })
}
