//! UDP datagram transport for the capture board.
//!
//! The board speaks two independent UDP links:
//! - a control link (request/response command messages)
//! - a data link (one-way stream of ADC sample packets)
//!
//! This is the lowest layer of radarcap. Everything else builds on top of
//! the [`DatagramSocket`] seam and its UDP implementation, [`UdpEndpoint`].

pub mod error;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use traits::DatagramSocket;
pub use udp::UdpEndpoint;
