//! Capture ADC frames from DCA1000-class radar capture boards.
//!
//! The board is driven over two UDP links: a control link for framed
//! commands and a data link that streams sequenced sample packets.
//!
//! # Crate Structure
//!
//! - [`transport`]: UDP endpoints with receive timeouts
//! - [`frame`]: command codec, data packet format, frame geometry and reassembly
//! - [`device`]: control channel and capture session (behind `device` feature)

/// Re-export transport types.
pub mod transport {
    pub use radarcap_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use radarcap_frame::*;
}

/// Re-export device types (requires `device` feature).
#[cfg(feature = "device")]
pub mod device {
    pub use radarcap_device::*;
}
