use std::time::Duration;

use radarcap_transport::DatagramSocket;
use tracing::{debug, trace};

use crate::error::Result;
use crate::packet::{decode_packet, DataPacket, MAX_DATAGRAM_SIZE};

/// Receives and decodes packets from the data link.
pub struct DataChannel<T> {
    inner: T,
    buf: Vec<u8>,
    packets_received: u64,
    malformed_packets: u64,
}

impl<T: DatagramSocket> DataChannel<T> {
    /// Create a data channel over a bound socket.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
            packets_received: 0,
            malformed_packets: 0,
        }
    }

    /// Receive the next packet (blocking up to `timeout`).
    ///
    /// Returns `Err(FrameError::Timeout)` when nothing arrives and
    /// `Err(FrameError::MalformedPacket)` for datagrams shorter than the
    /// packet header.
    pub fn receive(&mut self, timeout: Duration) -> Result<DataPacket> {
        let (len, _) = self.inner.recv_datagram(&mut self.buf, Some(timeout))?;
        match decode_packet(&self.buf[..len]) {
            Ok(packet) => {
                self.packets_received += 1;
                trace!(
                    sequence = packet.sequence,
                    byte_count = packet.byte_count,
                    words = packet.payload.len(),
                    "data packet"
                );
                Ok(packet)
            }
            Err(err) => {
                self.malformed_packets += 1;
                debug!(len, "malformed data packet");
                Err(err)
            }
        }
    }

    /// Well-formed packets received so far.
    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    /// Datagrams rejected as too short.
    pub fn malformed_packets(&self) -> u64 {
        self.malformed_packets
    }

    /// Borrow the underlying socket.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the channel and return the inner socket.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> std::fmt::Debug for DataChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataChannel")
            .field("packets_received", &self.packets_received)
            .field("malformed_packets", &self.malformed_packets)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::net::SocketAddr;

    use radarcap_transport::{TransportError, UdpEndpoint};

    use super::*;
    use crate::error::FrameError;
    use crate::packet::{encode_packet, HEADER_SIZE};

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn receive_over_udp() {
        let endpoint = UdpEndpoint::bind(loopback()).unwrap();
        let board =
            UdpEndpoint::bind_with_peer(loopback(), endpoint.local_addr().unwrap()).unwrap();
        let mut channel = DataChannel::new(endpoint);

        let sent = DataPacket::new(12, 17_472, vec![0xBEEF; 728]);
        board.send_datagram(&encode_packet(&sent)).unwrap();

        let received = channel.receive(Duration::from_secs(1)).unwrap();
        assert_eq!(received, sent);
        assert_eq!(channel.packets_received(), 1);
    }

    #[test]
    fn receive_timeout() {
        let mut channel = DataChannel::new(UdpEndpoint::bind(loopback()).unwrap());
        let err = channel.receive(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, FrameError::Timeout(_)));
    }

    #[test]
    fn short_datagram_is_malformed() {
        let endpoint = UdpEndpoint::bind(loopback()).unwrap();
        let board =
            UdpEndpoint::bind_with_peer(loopback(), endpoint.local_addr().unwrap()).unwrap();
        let mut channel = DataChannel::new(endpoint);

        board.send_datagram(&[0u8; HEADER_SIZE - 1]).unwrap();
        let err = channel.receive(Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, FrameError::MalformedPacket { len: 9, .. }));
        assert_eq!(channel.malformed_packets(), 1);
    }

    #[test]
    fn header_only_datagram_is_valid() {
        let mut channel = DataChannel::new(ScriptedSocket::new(vec![Ok(vec![0u8; HEADER_SIZE])]));
        let packet = channel.receive(Duration::from_millis(10)).unwrap();
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn socket_fault_is_transport_error() {
        let mut channel = DataChannel::new(ScriptedSocket::new(vec![Err(
            std::io::ErrorKind::ConnectionReset,
        )]));
        let err = channel.receive(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transport(TransportError::Io(ref io)) if io.kind() == std::io::ErrorKind::ConnectionReset
        ));
    }

    /// Replays a fixed list of datagrams, then times out.
    struct ScriptedSocket {
        script: RefCell<VecDeque<std::result::Result<Vec<u8>, std::io::ErrorKind>>>,
    }

    impl ScriptedSocket {
        fn new(script: Vec<std::result::Result<Vec<u8>, std::io::ErrorKind>>) -> Self {
            Self {
                script: RefCell::new(script.into()),
            }
        }
    }

    impl DatagramSocket for ScriptedSocket {
        fn send_datagram(&self, payload: &[u8]) -> radarcap_transport::Result<usize> {
            Ok(payload.len())
        }

        fn recv_datagram(
            &self,
            buf: &mut [u8],
            timeout: Option<Duration>,
        ) -> radarcap_transport::Result<(usize, SocketAddr)> {
            match self.script.borrow_mut().pop_front() {
                Some(Ok(datagram)) => {
                    let n = datagram.len().min(buf.len());
                    buf[..n].copy_from_slice(&datagram[..n]);
                    Ok((n, loopback()))
                }
                Some(Err(kind)) => Err(TransportError::Io(std::io::Error::from(kind))),
                None => Err(TransportError::Timeout(timeout.unwrap_or_default())),
            }
        }

        fn local_addr(&self) -> radarcap_transport::Result<SocketAddr> {
            Ok(loopback())
        }
    }
}
