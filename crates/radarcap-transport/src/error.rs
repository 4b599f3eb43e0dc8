use std::net::SocketAddr;
use std::time::Duration;

/// Errors that can occur in datagram transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified local address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// No datagram arrived before the receive timeout elapsed.
    #[error("no datagram received within {0:?}")]
    Timeout(Duration),

    /// The endpoint has no destination address for outgoing datagrams.
    #[error("endpoint has no peer address")]
    NoPeer,

    /// An I/O error occurred on the socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// True when the error is a receive timeout rather than a socket fault.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
