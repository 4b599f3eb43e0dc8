use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::geometry::FrameGeometry;
use crate::packet::DataPacket;

/// What to do when more packets arrive than a frame holds without a
/// boundary showing up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Reset the packet counter to zero and keep filling the same buffer.
    ///
    /// This can leave the assembler out of step with the board until the
    /// next boundary packet; it is kept as the default for compatibility
    /// with existing capture setups.
    #[default]
    WrapCounter,
    /// Discard the stalled buffer and wait for the next frame boundary.
    Resync,
}

/// A completed frame of ADC samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// `words_per_clipped_frame` samples; slots of lost packets stay zero.
    pub words: Vec<u16>,
    /// Expected minus received packets. Negative when the board sent more
    /// packets than a frame holds.
    pub lost_packets: i64,
    /// Packets whose payload could not be placed in the buffer.
    pub dropped_writes: u64,
}

impl Frame {
    /// Append the samples to `dst` as little-endian bytes.
    pub fn write_le(&self, dst: &mut BytesMut) {
        dst.reserve(self.words.len() * 2);
        for word in &self.words {
            dst.put_u16_le(*word);
        }
    }

    /// Size of the sample data in bytes.
    pub fn byte_len(&self) -> usize {
        self.words.len() * 2
    }
}

/// Outcome of feeding one packet to the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblerEvent {
    NeedMore,
    FrameReady(Frame),
}

/// Running totals across all frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblerStats {
    pub frames_emitted: u64,
    /// Packets seen while waiting for a frame boundary.
    pub packets_discarded: u64,
    pub dropped_writes: u64,
    pub counter_wraps: u64,
    /// Partial frames thrown away by [`FrameAssembler::reset`] or a resync.
    pub frames_abandoned: u64,
}

#[derive(Debug)]
struct PartialFrame {
    buffer: Vec<u16>,
    packets_read: usize,
    dropped_writes: u64,
}

#[derive(Debug)]
enum State {
    SeekingStart,
    Accumulating(PartialFrame),
}

/// Reassembles data packets into frames.
///
/// Packets are placed by sequence number, so reordering inside a frame is
/// harmless and lost packets leave zeroed slots. A frame starts and ends on
/// packets whose byte counter is a multiple of the clipped frame size.
#[derive(Debug)]
pub struct FrameAssembler {
    geometry: FrameGeometry,
    policy: OverflowPolicy,
    state: State,
    spare: Option<Vec<u16>>,
    stats: AssemblerStats,
}

impl FrameAssembler {
    /// Create an assembler with the default overflow policy.
    pub fn new(geometry: FrameGeometry) -> Self {
        Self::with_policy(geometry, OverflowPolicy::default())
    }

    /// Create an assembler with an explicit overflow policy.
    pub fn with_policy(geometry: FrameGeometry, policy: OverflowPolicy) -> Self {
        Self {
            geometry,
            policy,
            state: State::SeekingStart,
            spare: None,
            stats: AssemblerStats::default(),
        }
    }

    /// Feed one packet.
    pub fn ingest(&mut self, packet: &DataPacket) -> AssemblerEvent {
        let state = std::mem::replace(&mut self.state, State::SeekingStart);
        let (next, event) = match state {
            State::SeekingStart => (self.seek(packet), AssemblerEvent::NeedMore),
            State::Accumulating(partial) => self.accumulate(partial, packet),
        };
        self.state = next;
        event
    }

    /// Abandon any partial frame and wait for the next boundary.
    pub fn reset(&mut self) {
        if let State::Accumulating(partial) =
            std::mem::replace(&mut self.state, State::SeekingStart)
        {
            debug!(
                packets_read = partial.packets_read,
                "abandoning partial frame"
            );
            self.stats.frames_abandoned += 1;
            self.spare = Some(partial.buffer);
        }
    }

    /// Packets counted toward the current frame, or `None` while seeking.
    pub fn packets_read(&self) -> Option<usize> {
        match &self.state {
            State::SeekingStart => None,
            State::Accumulating(partial) => Some(partial.packets_read),
        }
    }

    /// True while waiting for a frame boundary.
    pub fn is_seeking(&self) -> bool {
        matches!(self.state, State::SeekingStart)
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    fn seek(&mut self, packet: &DataPacket) -> State {
        if !self.geometry.is_boundary(packet.byte_count) {
            self.stats.packets_discarded += 1;
            trace!(
                sequence = packet.sequence,
                byte_count = packet.byte_count,
                "waiting for frame start"
            );
            return State::SeekingStart;
        }

        debug!(
            sequence = packet.sequence,
            byte_count = packet.byte_count,
            "frame start"
        );
        let mut partial = PartialFrame {
            buffer: self.fresh_buffer(),
            packets_read: 1,
            dropped_writes: 0,
        };
        if !write_slot(
            &mut partial.buffer,
            0,
            self.geometry.words_per_packet,
            &packet.payload,
        ) {
            self.note_dropped(&mut partial, packet, 0);
        }
        State::Accumulating(partial)
    }

    fn accumulate(
        &mut self,
        mut partial: PartialFrame,
        packet: &DataPacket,
    ) -> (State, AssemblerEvent) {
        let per_frame = self.geometry.packets_per_clipped_frame;

        let slot = slot_for(packet.sequence, per_frame);
        if !write_slot(
            &mut partial.buffer,
            slot,
            self.geometry.words_per_packet,
            &packet.payload,
        ) {
            self.note_dropped(&mut partial, packet, slot);
        }
        partial.packets_read += 1;

        if self.geometry.is_boundary(packet.byte_count) {
            let lost_packets = per_frame as i64 - partial.packets_read as i64;
            self.stats.frames_emitted += 1;
            debug!(
                sequence = packet.sequence,
                packets_read = partial.packets_read,
                lost_packets,
                "frame complete"
            );
            let frame = Frame {
                words: partial.buffer,
                lost_packets,
                dropped_writes: partial.dropped_writes,
            };
            return (State::SeekingStart, AssemblerEvent::FrameReady(frame));
        }

        if partial.packets_read > per_frame {
            self.stats.counter_wraps += 1;
            match self.policy {
                OverflowPolicy::WrapCounter => {
                    warn!(
                        packets_read = partial.packets_read,
                        per_frame, "no frame boundary seen; wrapping packet counter"
                    );
                    partial.packets_read = 0;
                }
                OverflowPolicy::Resync => {
                    warn!(
                        packets_read = partial.packets_read,
                        per_frame, "no frame boundary seen; resynchronising"
                    );
                    self.stats.frames_abandoned += 1;
                    self.spare = Some(partial.buffer);
                    return (State::SeekingStart, AssemblerEvent::NeedMore);
                }
            }
        }

        (State::Accumulating(partial), AssemblerEvent::NeedMore)
    }

    fn note_dropped(&mut self, partial: &mut PartialFrame, packet: &DataPacket, slot: usize) {
        partial.dropped_writes += 1;
        self.stats.dropped_writes += 1;
        warn!(
            sequence = packet.sequence,
            slot,
            words = packet.payload.len(),
            expected = self.geometry.words_per_packet,
            "dropping packet payload that does not fit the frame"
        );
    }

    fn fresh_buffer(&mut self) -> Vec<u16> {
        match self.spare.take() {
            Some(mut buffer) => {
                buffer.fill(0);
                buffer
            }
            None => vec![0; self.geometry.words_per_clipped_frame],
        }
    }
}

/// Frame slot for a 1-based sequence number.
fn slot_for(sequence: i32, packets_per_frame: usize) -> usize {
    (i64::from(sequence) - 1).rem_euclid(packets_per_frame as i64) as usize
}

/// Copy `payload` into `slot`; false when it does not fit exactly.
fn write_slot(buffer: &mut [u16], slot: usize, words_per_packet: usize, payload: &[u16]) -> bool {
    if payload.len() != words_per_packet {
        return false;
    }
    let start = slot * words_per_packet;
    match buffer.get_mut(start..start + words_per_packet) {
        Some(dst) => {
            dst.copy_from_slice(payload);
            true
        }
        None => false,
    }
}
