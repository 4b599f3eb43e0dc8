use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::DatagramSocket;

/// UDP endpoint bound to a local address, optionally paired with a peer.
///
/// The socket is not `connect`ed: the board answers from its own address
/// and port, and the data link never sends at all. Outgoing datagrams go
/// to `peer` via `send_to`.
#[derive(Debug)]
pub struct UdpEndpoint {
    socket: UdpSocket,
    local: SocketAddr,
    peer: Option<SocketAddr>,
}

impl UdpEndpoint {
    /// Smallest timeout handed to the OS; a zero timeout means "block" there.
    const MIN_TIMEOUT: Duration = Duration::from_millis(1);

    /// Bind a receive-only endpoint.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).map_err(|e| TransportError::Bind { addr, source: e })?;
        let local = socket.local_addr()?;
        info!(%local, "bound udp endpoint");
        Ok(Self {
            socket,
            local,
            peer: None,
        })
    }

    /// Bind an endpoint that sends to `peer`.
    pub fn bind_with_peer(addr: SocketAddr, peer: SocketAddr) -> Result<Self> {
        let mut endpoint = Self::bind(addr)?;
        endpoint.peer = Some(peer);
        debug!(local = %endpoint.local, %peer, "udp endpoint peer set");
        Ok(endpoint)
    }

    fn apply_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.map(|t| t.max(Self::MIN_TIMEOUT));
        self.socket.set_read_timeout(timeout)?;
        Ok(())
    }
}

impl DatagramSocket for UdpEndpoint {
    fn send_datagram(&self, payload: &[u8]) -> Result<usize> {
        let peer = self.peer.ok_or(TransportError::NoPeer)?;
        loop {
            match self.socket.send_to(payload, peer) {
                Ok(n) => {
                    trace!(%peer, len = n, "sent datagram");
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn recv_datagram(
        &self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<(usize, SocketAddr)> {
        self.apply_read_timeout(timeout)?;
        loop {
            match self.socket.recv_from(buf) {
                Ok((n, from)) => {
                    trace!(%from, len = n, "received datagram");
                    return Ok((n, from));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(TransportError::Timeout(timeout.unwrap_or_default()));
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local)
    }

    fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}
