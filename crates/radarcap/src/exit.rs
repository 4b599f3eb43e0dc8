use std::fmt;
use std::io;

use radarcap_device::DeviceError;
use radarcap_frame::FrameError;
use radarcap_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(&err), format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    CliError::new(frame_code(&err), format!("{context}: {err}"))
}

pub fn device_error(context: &str, err: DeviceError) -> CliError {
    let code = match &err {
        DeviceError::Transport(inner) => transport_code(inner),
        DeviceError::Frame(inner) => frame_code(inner),
        DeviceError::Timeout(_) => TIMEOUT,
        DeviceError::IncompleteRead { source, .. } => frame_code(source),
        DeviceError::Closed => FAILURE,
        DeviceError::ConfigFile { source, .. } => match source.kind() {
            io::ErrorKind::NotFound => USAGE,
            _ => io_code(source),
        },
        DeviceError::Json(_) => DATA_INVALID,
    };
    CliError::new(code, format!("{context}: {err}"))
}

fn io_code(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    }
}

fn transport_code(err: &TransportError) -> i32 {
    match err {
        TransportError::Bind { source, .. } | TransportError::Io(source) => io_code(source),
        TransportError::Timeout(_) => TIMEOUT,
        TransportError::NoPeer => TRANSPORT_ERROR,
    }
}

fn frame_code(err: &FrameError) -> i32 {
    match err {
        FrameError::Transport(inner) => transport_code(inner),
        FrameError::Timeout(_) => TIMEOUT,
        FrameError::ParamsTooLarge { .. }
        | FrameError::InvalidHex(_)
        | FrameError::UnknownCommandName(_)
        | FrameError::InvalidConfig(_) => USAGE,
        FrameError::Truncated { .. }
        | FrameError::InvalidHeader
        | FrameError::InvalidFooter
        | FrameError::UnknownCommand(_)
        | FrameError::LengthMismatch { .. }
        | FrameError::MalformedPacket { .. } => DATA_INVALID,
    }
}
