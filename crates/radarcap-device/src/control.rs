use std::time::{Duration, Instant};

use bytes::Bytes;
use radarcap_frame::{
    decode_reply, encode_command, CommandCode, CommandReply, FPGA_CONFIG_PARAMS,
    MAX_DATAGRAM_SIZE, PACKET_DATA_PARAMS,
};
use radarcap_transport::DatagramSocket;
use tracing::{debug, info, warn};

use crate::error::{DeviceError, Result};

/// Commands sent by [`ControlChannel::configure`], in order.
pub const CONFIGURE_SEQUENCE: [(CommandCode, &[u8]); 5] = [
    (CommandCode::SystemConnect, &[]),
    (CommandCode::ReadFpgaVersion, &[]),
    (CommandCode::ConfigFpgaGen, &FPGA_CONFIG_PARAMS),
    (CommandCode::ConfigPacketData, &PACKET_DATA_PARAMS),
    (CommandCode::RecordStart, &[]),
];

/// The board's reply to one step of the configure sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReply {
    pub code: CommandCode,
    pub reply: Bytes,
}

/// Request/response command link to the board.
///
/// Every request waits for exactly one reply datagram. Replies are returned
/// as raw bytes; their content is not checked. When the socket has a peer,
/// datagrams from any other sender are dropped while waiting.
pub struct ControlChannel<T> {
    inner: T,
    buf: Vec<u8>,
    timeout: Duration,
}

impl<T: DatagramSocket> ControlChannel<T> {
    /// Create a control channel with a default per-command timeout.
    pub fn new(inner: T, timeout: Duration) -> Self {
        Self {
            inner,
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
            timeout,
        }
    }

    /// Send a pre-encoded message and wait for one reply.
    pub fn send(&mut self, message: &[u8], timeout: Duration) -> Result<Bytes> {
        debug!(message = %hex::encode(message), "sending command");
        self.inner.send_datagram(message)?;
        let len = self.recv_from_peer(Some(timeout))?;
        let reply = Bytes::copy_from_slice(&self.buf[..len]);
        debug!(reply = %hex::encode(&reply), "command reply");
        Ok(reply)
    }

    /// Encode and send a typed command.
    pub fn send_command(
        &mut self,
        code: CommandCode,
        params: &[u8],
        timeout: Duration,
    ) -> Result<Bytes> {
        let message = encode_command(code, params)?;
        self.send(&message, timeout)
    }

    /// Connect, read the FPGA version, configure the FPGA and packet
    /// format, then start recording.
    ///
    /// Stops at the first step that fails.
    pub fn configure(&mut self) -> Result<Vec<StepReply>> {
        let mut replies = Vec::with_capacity(CONFIGURE_SEQUENCE.len());
        for (code, params) in CONFIGURE_SEQUENCE {
            let reply = match self.send_command(code, params, self.timeout) {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(command = %code, error = %err, "configure step failed");
                    return Err(err);
                }
            };
            info!(command = %code, reply = %hex::encode(&reply), "configure step done");
            replies.push(StepReply { code, reply });
        }
        Ok(replies)
    }

    /// Stop recording.
    pub fn stop_record(&mut self) -> Result<Bytes> {
        self.send_command(CommandCode::RecordStop, &[], self.timeout)
    }

    /// Wait for one unsolicited datagram and report it if it is a system
    /// error notification. `None` blocks indefinitely.
    pub fn listen_for_error(&mut self, timeout: Option<Duration>) -> Result<Option<CommandReply>> {
        let len = self.recv_from_peer(timeout)?;
        match decode_reply(&self.buf[..len]) {
            Ok(reply) if reply.code == CommandCode::SystemError => {
                warn!(status = reply.status, "board reported system error");
                Ok(Some(reply))
            }
            Ok(reply) => {
                debug!(command = %reply.code, "ignoring non-error control message");
                Ok(None)
            }
            Err(err) => {
                debug!(error = %err, len, "ignoring undecodable control message");
                Ok(None)
            }
        }
    }

    /// Receive the next datagram sent by the peer into `buf`.
    fn recv_from_peer(&mut self, timeout: Option<Duration>) -> Result<usize> {
        let peer = self.inner.peer();
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        loop {
            let wait = match (timeout, deadline) {
                (Some(t), Some(deadline)) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(DeviceError::Timeout(t));
                    }
                    Some(remaining)
                }
                (timeout, _) => timeout,
            };
            let (len, from) = self.inner.recv_datagram(&mut self.buf, wait)?;
            match peer {
                Some(peer) if from != peer => {
                    debug!(%from, %peer, len, "dropping datagram from unexpected sender");
                }
                _ => return Ok(len),
            }
        }
    }

    /// Default per-command timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
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

impl<T> std::fmt::Debug for ControlChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlChannel")
            .field("timeout", &self.timeout)
            .finish()
    }
}
