//! Session management for radar capture boards.
//!
//! A [`DeviceSession`] owns the two UDP links to one board: the control
//! link, where each command gets one reply, and the data link, where ADC
//! samples stream in and are reassembled into frames.

pub mod config;
pub mod control;
pub mod error;
pub mod session;

pub use config::{
    SessionConfig, DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONTROL_PORT, DEFAULT_DATA_PORT,
    DEFAULT_DEVICE_IP, DEFAULT_HOST_IP,
};
pub use control::{ControlChannel, StepReply, CONFIGURE_SEQUENCE};
pub use error::{DeviceError, Result};
pub use session::{Command, DeviceSession};
