use std::net::SocketAddr;
use std::time::Duration;

use crate::error::Result;

/// A bound datagram socket with a default destination.
///
/// This is the seam the control and data channels are written against.
/// [`crate::UdpEndpoint`] is the production implementation; tests can
/// substitute scripted sockets.
pub trait DatagramSocket {
    /// Send one datagram to the endpoint's peer address.
    fn send_datagram(&self, payload: &[u8]) -> Result<usize>;

    /// Receive one datagram into `buf`, returning its length and sender.
    ///
    /// `None` blocks indefinitely. Elapsed timeouts surface as
    /// [`crate::TransportError::Timeout`]. Datagrams longer than `buf` are
    /// truncated by the OS.
    fn recv_datagram(
        &self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<(usize, SocketAddr)>;

    /// The local address this socket is bound to.
    fn local_addr(&self) -> Result<SocketAddr>;

    /// Destination for outgoing datagrams, if one is set.
    fn peer(&self) -> Option<SocketAddr> {
        None
    }
}

impl<T: DatagramSocket + ?Sized> DatagramSocket for Box<T> {
    fn send_datagram(&self, payload: &[u8]) -> Result<usize> {
        (**self).send_datagram(payload)
    }

    fn recv_datagram(
        &self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<(usize, SocketAddr)> {
        (**self).recv_datagram(buf, timeout)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        (**self).local_addr()
    }

    fn peer(&self) -> Option<SocketAddr> {
        (**self).peer()
    }
}
