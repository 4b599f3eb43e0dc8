use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};
use crate::packet::NOMINAL_PAYLOAD_BYTES;

/// ADC capture parameters that size a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcConfig {
    /// Chirps per frame.
    pub chirps: u32,
    /// Receive antennas.
    pub rx: u32,
    /// Transmit antennas.
    pub tx: u32,
    /// 2 for complex (I/Q) samples, 1 for real.
    pub iq: u32,
    /// ADC samples per chirp.
    pub samples_per_chirp: u32,
    /// Bytes per ADC sample.
    pub bytes_per_sample: u32,
    /// ADC payload bytes per data packet.
    pub packet_bytes: u32,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            chirps: 128,
            rx: 4,
            tx: 3,
            iq: 2,
            samples_per_chirp: 128,
            bytes_per_sample: 2,
            packet_bytes: NOMINAL_PAYLOAD_BYTES as u32,
        }
    }
}

/// Frame and packet sizes derived from an [`AdcConfig`].
///
/// Frames are clipped down to a whole number of packets; bytes past
/// `clipped_frame_bytes` are never represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameGeometry {
    pub frame_bytes: u64,
    pub packet_bytes: u64,
    pub clipped_frame_bytes: u64,
    pub packets_per_clipped_frame: usize,
    pub words_per_packet: usize,
    pub words_per_clipped_frame: usize,
}

impl FrameGeometry {
    /// Derive the geometry for `config`.
    pub fn compute(config: &AdcConfig) -> Result<Self> {
        if config.packet_bytes == 0 {
            return Err(FrameError::InvalidConfig(
                "packet_bytes must be non-zero".to_string(),
            ));
        }
        if config.packet_bytes % 2 != 0 {
            return Err(FrameError::InvalidConfig(format!(
                "packet_bytes must hold whole 16-bit samples (got {})",
                config.packet_bytes
            )));
        }

        let factors = [
            config.chirps,
            config.rx,
            config.tx,
            config.iq,
            config.samples_per_chirp,
            config.bytes_per_sample,
        ];
        let frame_bytes = factors
            .iter()
            .try_fold(1u64, |acc, &f| acc.checked_mul(u64::from(f)))
            .ok_or_else(|| FrameError::InvalidConfig("frame size overflows".to_string()))?;

        let packet_bytes = u64::from(config.packet_bytes);
        let packets = frame_bytes / packet_bytes;
        if packets == 0 {
            return Err(FrameError::InvalidConfig(format!(
                "frame of {frame_bytes} bytes is smaller than one {packet_bytes}-byte packet"
            )));
        }
        let clipped_frame_bytes = packets * packet_bytes;

        let packets_per_clipped_frame = usize::try_from(packets)
            .map_err(|_| FrameError::InvalidConfig("too many packets per frame".to_string()))?;
        let words_per_clipped_frame = usize::try_from(clipped_frame_bytes / 2)
            .map_err(|_| FrameError::InvalidConfig("frame too large for memory".to_string()))?;

        Ok(Self {
            frame_bytes,
            packet_bytes,
            clipped_frame_bytes,
            packets_per_clipped_frame,
            words_per_packet: (packet_bytes / 2) as usize,
            words_per_clipped_frame,
        })
    }

    /// Bytes of each frame lost to clipping.
    pub fn residual_bytes(&self) -> u64 {
        self.frame_bytes - self.clipped_frame_bytes
    }

    /// True when `byte_count` lands exactly on a clipped-frame boundary.
    pub fn is_boundary(&self, byte_count: u64) -> bool {
        byte_count % self.clipped_frame_bytes == 0
    }
}
