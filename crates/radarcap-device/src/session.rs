use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use radarcap_frame::{
    encode_command, encode_raw, AssemblerEvent, AssemblerStats, CommandCode, CommandReply,
    DataChannel, Frame, FrameAssembler, FrameError, FrameGeometry,
};
use radarcap_transport::{DatagramSocket, UdpEndpoint};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::control::{ControlChannel, StepReply};
use crate::error::{DeviceError, Result};

/// A command for [`DeviceSession::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A protocol command, framed by the codec.
    Typed { code: CommandCode, params: Bytes },
    /// A complete message as hex text, sent as-is.
    Raw(String),
}

impl Command {
    /// A typed command without parameters.
    pub fn code(code: CommandCode) -> Self {
        Command::Typed {
            code,
            params: Bytes::new(),
        }
    }

    /// Wire bytes for this command.
    pub fn encode(&self) -> Result<Bytes> {
        match self {
            Command::Typed { code, params } => Ok(encode_command(*code, params)?),
            Command::Raw(hex_text) => Ok(encode_raw(hex_text)?),
        }
    }
}

struct Links {
    control: ControlChannel<UdpEndpoint>,
    data: DataChannel<UdpEndpoint>,
}

/// An open connection to one capture board.
///
/// Both UDP links are bound by [`DeviceSession::open`] and released by
/// [`DeviceSession::close`] or on drop. Frame reads own the assembler
/// exclusively through `&mut self`.
pub struct DeviceSession {
    config: SessionConfig,
    geometry: FrameGeometry,
    assembler: FrameAssembler,
    links: Option<Links>,
}

impl DeviceSession {
    /// Compute the frame geometry and bind both links.
    pub fn open(config: SessionConfig) -> Result<Self> {
        let geometry = FrameGeometry::compute(&config.adc)?;

        let control_socket =
            UdpEndpoint::bind_with_peer(config.control_bind_addr(), config.device_addr())?;
        let data_socket = UdpEndpoint::bind(config.data_bind_addr())?;

        info!(
            control = %config.control_bind_addr(),
            data = %config.data_bind_addr(),
            device = %config.device_addr(),
            packets_per_frame = geometry.packets_per_clipped_frame,
            "device session open"
        );

        Ok(Self {
            assembler: FrameAssembler::with_policy(geometry, config.overflow_policy),
            links: Some(Links {
                control: ControlChannel::new(control_socket, config.command_timeout()),
                data: DataChannel::new(data_socket),
            }),
            config,
            geometry,
        })
    }

    /// Run the board's configure sequence.
    pub fn configure(&mut self) -> Result<Vec<StepReply>> {
        self.links_mut()?.control.configure()
    }

    /// Send one command and wait for its reply.
    pub fn send(&mut self, command: &Command, timeout: Duration) -> Result<Bytes> {
        let message = command.encode()?;
        self.links_mut()?.control.send(&message, timeout)
    }

    /// Stop recording.
    pub fn stop_record(&mut self) -> Result<Bytes> {
        self.links_mut()?.control.stop_record()
    }

    /// Wait for an unsolicited system error message on the control link.
    pub fn listen_for_error(&mut self, timeout: Option<Duration>) -> Result<Option<CommandReply>> {
        self.links_mut()?.control.listen_for_error(timeout)
    }

    /// Read the next complete frame.
    ///
    /// `timeout` bounds the whole call. If the data link stalls, errors or
    /// the deadline passes first, the partial frame is discarded and
    /// [`DeviceError::IncompleteRead`] is returned; the session stays usable.
    /// A timeout too large to form a deadline bounds each packet instead.
    pub fn read(&mut self, timeout: Duration) -> Result<Frame> {
        let links = self.links.as_mut().ok_or(DeviceError::Closed)?;
        let deadline = Instant::now().checked_add(timeout);
        let mut packets = 0u64;

        loop {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => timeout,
            };
            let received = if remaining.is_zero() {
                Err(FrameError::Timeout(timeout))
            } else {
                links.data.receive(remaining)
            };

            let packet = match received {
                Ok(packet) => packet,
                Err(source) => {
                    self.assembler.reset();
                    warn!(packets, error = %source, "frame read aborted");
                    return Err(DeviceError::IncompleteRead { packets, source });
                }
            };
            packets += 1;

            if let AssemblerEvent::FrameReady(frame) = self.assembler.ingest(&packet) {
                debug!(
                    packets,
                    lost_packets = frame.lost_packets,
                    "frame read complete"
                );
                return Ok(frame);
            }
        }
    }

    /// Release both links. Safe to call more than once.
    pub fn close(&mut self) {
        if self.links.take().is_some() {
            self.assembler.reset();
            info!("device session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.links.is_none()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    pub fn stats(&self) -> AssemblerStats {
        self.assembler.stats()
    }

    /// Bound address of the control link.
    pub fn control_local_addr(&self) -> Result<SocketAddr> {
        let links = self.links.as_ref().ok_or(DeviceError::Closed)?;
        Ok(links.control.get_ref().local_addr()?)
    }

    /// Bound address of the data link.
    pub fn data_local_addr(&self) -> Result<SocketAddr> {
        let links = self.links.as_ref().ok_or(DeviceError::Closed)?;
        Ok(links.data.get_ref().local_addr()?)
    }

    fn links_mut(&mut self) -> Result<&mut Links> {
        self.links.as_mut().ok_or(DeviceError::Closed)
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("device", &self.config.device_addr())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, UdpSocket};
    use std::thread;

    use radarcap_frame::{encode_packet, AdcConfig, DataPacket};

    use super::*;

    /// Four 8-byte packets per frame.
    fn tiny_adc() -> AdcConfig {
        AdcConfig {
            chirps: 1,
            rx: 1,
            tx: 1,
            iq: 1,
            samples_per_chirp: 8,
            bytes_per_sample: 4,
            packet_bytes: 8,
        }
    }

    fn loopback_config(device: SocketAddr) -> SessionConfig {
        SessionConfig {
            host_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            control_port: 0,
            data_port: 0,
            device_ip: device.ip(),
            device_port: device.port(),
            command_timeout_ms: 500,
            adc: tiny_adc(),
            ..SessionConfig::default()
        }
    }

    fn unused_device() -> SocketAddr {
        "127.0.0.1:9".parse().unwrap()
    }

    fn send_packets(to: SocketAddr, packets: &[DataPacket]) {
        let board = UdpSocket::bind("127.0.0.1:0").unwrap();
        for packet in packets {
            board.send_to(&encode_packet(packet), to).unwrap();
        }
    }

    fn frame_packets(base: u64) -> Vec<DataPacket> {
        (1..=4)
            .map(|seq| {
                let byte_count = if seq == 1 { base } else { base + 8 * seq as u64 };
                DataPacket::new(seq, byte_count, vec![seq as u16; 4])
            })
            .collect()
    }

    #[test]
    fn read_assembles_frame() {
        let mut session = DeviceSession::open(loopback_config(unused_device())).unwrap();
        let data = session.data_local_addr().unwrap();

        send_packets(data, &frame_packets(0));
        let frame = session.read(Duration::from_secs(2)).unwrap();

        assert_eq!(
            frame.words,
            vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4]
        );
        assert_eq!(frame.lost_packets, 0);
        assert_eq!(session.stats().frames_emitted, 1);
    }

    #[test]
    fn read_skips_packets_before_boundary() {
        let mut session = DeviceSession::open(loopback_config(unused_device())).unwrap();
        let data = session.data_local_addr().unwrap();

        let mut packets = vec![
            DataPacket::new(3, 24, vec![9; 4]),
            DataPacket::new(4, 28, vec![9; 4]),
        ];
        packets.extend(frame_packets(32));
        send_packets(data, &packets);

        let frame = session.read(Duration::from_secs(2)).unwrap();
        assert_eq!(&frame.words[0..4], &[1, 1, 1, 1]);
        assert_eq!(session.stats().packets_discarded, 2);
    }

    #[test]
    fn silent_stream_is_incomplete_read() {
        let mut session = DeviceSession::open(loopback_config(unused_device())).unwrap();
        let err = session.read(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::IncompleteRead {
                packets: 0,
                source: FrameError::Timeout(_)
            }
        ));
        assert!(err.is_timeout());
    }

    #[test]
    fn stream_without_boundary_never_returns_partial_frame() {
        let mut session = DeviceSession::open(loopback_config(unused_device())).unwrap();
        let data = session.data_local_addr().unwrap();

        let mut packets = frame_packets(0);
        packets.pop();
        send_packets(data, &packets);

        let err = session.read(Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, DeviceError::IncompleteRead { packets: 3, .. }));

        // The aborted frame is gone; the next read needs a fresh boundary.
        send_packets(data, &frame_packets(64));
        let frame = session.read(Duration::from_secs(2)).unwrap();
        assert_eq!(frame.lost_packets, 0);
        assert_eq!(session.stats().frames_abandoned, 1);
    }

    #[test]
    fn malformed_packet_aborts_read_only() {
        let mut session = DeviceSession::open(loopback_config(unused_device())).unwrap();
        let data = session.data_local_addr().unwrap();

        let board = UdpSocket::bind("127.0.0.1:0").unwrap();
        board.send_to(&[1, 2, 3], data).unwrap();
        let err = session.read(Duration::from_secs(2)).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::IncompleteRead {
                source: FrameError::MalformedPacket { .. },
                ..
            }
        ));

        send_packets(data, &frame_packets(0));
        assert!(session.read(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn read_accepts_timeout_beyond_clock_range() {
        let mut session = DeviceSession::open(loopback_config(unused_device())).unwrap();
        let data = session.data_local_addr().unwrap();

        send_packets(data, &frame_packets(0));
        let frame = session.read(Duration::MAX).unwrap();
        assert_eq!(frame.lost_packets, 0);

        let board = UdpSocket::bind("127.0.0.1:0").unwrap();
        board.send_to(&[1, 2, 3], data).unwrap();
        let err = session.read(Duration::MAX).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::IncompleteRead {
                packets: 0,
                source: FrameError::MalformedPacket { .. }
            }
        ));
    }

    #[test]
    fn configure_and_send_against_board() {
        let board = UdpSocket::bind("127.0.0.1:0").unwrap();
        let board_addr = board.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 256];
            let mut seen = Vec::new();
            for _ in 0..7 {
                let (n, from) = board.recv_from(&mut buf).unwrap();
                seen.push(buf[..n].to_vec());
                board
                    .send_to(&[0x5A, 0xA5, buf[2], buf[3], 0x00, 0x00, 0xAA, 0xEE], from)
                    .unwrap();
            }
            seen
        });

        let mut session = DeviceSession::open(loopback_config(board_addr)).unwrap();
        let steps = session.configure().unwrap();
        assert_eq!(steps.len(), 5);
        assert_eq!(steps[4].code, CommandCode::RecordStart);

        let reply = session
            .send(
                &Command::Raw("5aa506000000aaee".to_string()),
                Duration::from_secs(1),
            )
            .unwrap();
        assert_eq!(reply[2], 0x06);

        let reply = session
            .send(
                &Command::Typed {
                    code: CommandCode::ConfigFpgaGen,
                    params: Bytes::from_static(&radarcap_frame::FPGA_CONFIG_PARAMS),
                },
                Duration::from_secs(1),
            )
            .unwrap();
        assert_eq!(reply[2], 0x03);

        let seen = handle.join().unwrap();
        assert_eq!(hex::encode(&seen[0]), "5aa509000000aaee");
        assert_eq!(hex::encode(&seen[5]), "5aa506000000aaee");
        assert_eq!(hex::encode(&seen[6]), "5aa50300060001020102031eaaee");
    }

    #[test]
    fn stop_record_sends_record_stop() {
        let board = UdpSocket::bind("127.0.0.1:0").unwrap();
        let board_addr = board.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 64];
            let (n, from) = board.recv_from(&mut buf).unwrap();
            board
                .send_to(&[0x5A, 0xA5, 0x06, 0x00, 0x00, 0x00, 0xAA, 0xEE], from)
                .unwrap();
            buf[..n].to_vec()
        });

        let mut session = DeviceSession::open(loopback_config(board_addr)).unwrap();
        let reply = session.stop_record().unwrap();
        assert_eq!(hex::encode(&reply), "5aa506000000aaee");
        assert_eq!(hex::encode(handle.join().unwrap()), "5aa506000000aaee");

        session.close();
        assert!(matches!(session.stop_record(), Err(DeviceError::Closed)));
    }

    #[test]
    fn listen_for_error_reports_board_error() {
        let board = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut session =
            DeviceSession::open(loopback_config(board.local_addr().unwrap())).unwrap();
        let control = session.control_local_addr().unwrap();

        board
            .send_to(&[0x5A, 0xA5, 0x0A, 0x00, 0x03, 0x00, 0xAA, 0xEE], control)
            .unwrap();
        let reply = session
            .listen_for_error(Some(Duration::from_secs(1)))
            .unwrap();
        assert_eq!(
            reply,
            Some(CommandReply {
                code: CommandCode::SystemError,
                status: 3
            })
        );

        let err = session
            .listen_for_error(Some(Duration::from_millis(20)))
            .unwrap_err();
        assert!(err.is_timeout());

        session.close();
        assert!(matches!(
            session.listen_for_error(Some(Duration::from_millis(20))),
            Err(DeviceError::Closed)
        ));
    }

    #[test]
    fn close_is_idempotent_and_blocks_further_use() {
        let mut session = DeviceSession::open(loopback_config(unused_device())).unwrap();
        let data = session.data_local_addr().unwrap();

        session.close();
        session.close();
        assert!(session.is_closed());
        assert!(matches!(
            session.read(Duration::from_millis(10)),
            Err(DeviceError::Closed)
        ));
        assert!(matches!(session.configure(), Err(DeviceError::Closed)));
        assert!(matches!(session.data_local_addr(), Err(DeviceError::Closed)));

        // The port is free again once the session is closed.
        UdpSocket::bind(data).unwrap();
    }

    #[test]
    fn invalid_geometry_fails_before_binding() {
        let config = SessionConfig {
            adc: AdcConfig {
                packet_bytes: 0,
                ..AdcConfig::default()
            },
            ..loopback_config(unused_device())
        };
        let err = DeviceSession::open(config).unwrap_err();
        assert!(matches!(err, DeviceError::Frame(FrameError::InvalidConfig(_))));
    }

    #[test]
    fn bad_raw_command_is_rejected() {
        let mut session = DeviceSession::open(loopback_config(unused_device())).unwrap();
        let err = session
            .send(&Command::Raw("not hex".to_string()), Duration::from_millis(10))
            .unwrap_err();
        assert!(matches!(err, DeviceError::Frame(FrameError::InvalidHex(_))));
    }
}
