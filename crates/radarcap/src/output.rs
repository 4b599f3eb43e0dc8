use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::BytesMut;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use radarcap_device::StepReply;
use radarcap_frame::{AssemblerStats, Frame, FrameGeometry};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// Unframed bytes: reply datagrams, or little-endian samples for captures.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    command: &'a str,
    reply: String,
    reply_size: usize,
}

pub fn print_reply(command: &str, reply: &[u8], format: OutputFormat) {
    print_replies(&[(command, reply)], format);
}

pub fn print_steps(steps: &[StepReply], format: OutputFormat) {
    let rows: Vec<(&str, &[u8])> = steps
        .iter()
        .map(|step| (step.code.name(), step.reply.as_ref()))
        .collect();
    print_replies(&rows, format);
}

fn print_replies(rows: &[(&str, &[u8])], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for &(command, reply) in rows {
                let out = ReplyOutput {
                    command,
                    reply: hex::encode(reply),
                    reply_size: reply.len(),
                };
                print_json(&out);
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["COMMAND", "SIZE", "REPLY"]);
            for &(command, reply) in rows {
                table.add_row(vec![
                    command.to_string(),
                    reply.len().to_string(),
                    hex::encode(reply),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for &(command, reply) in rows {
                println!("{command}: {}", hex::encode(reply));
            }
        }
        OutputFormat::Raw => {
            for &(_, reply) in rows {
                print_raw(reply);
            }
        }
    }
}

#[derive(Serialize)]
struct FrameOutput {
    frame: u64,
    samples: usize,
    bytes: usize,
    lost_packets: i64,
    dropped_writes: u64,
    timestamp: String,
}

/// Print one captured frame. `Raw` writes the samples themselves.
pub fn print_frame(index: u64, frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                frame: index,
                samples: frame.words.len(),
                bytes: frame.byte_len(),
                lost_packets: frame.lost_packets,
                dropped_writes: frame.dropped_writes,
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["FRAME", "BYTES", "LOST", "DROPPED"]);
            table.add_row(vec![
                index.to_string(),
                frame.byte_len().to_string(),
                frame.lost_packets.to_string(),
                frame.dropped_writes.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frame={} bytes={} lost_packets={} dropped_writes={}",
                index,
                frame.byte_len(),
                frame.lost_packets,
                frame.dropped_writes
            );
        }
        OutputFormat::Raw => {
            let mut samples = BytesMut::new();
            frame.write_le(&mut samples);
            print_raw(&samples);
        }
    }
}

#[derive(Serialize)]
struct SummaryOutput {
    frames: u64,
    #[serde(flatten)]
    stats: AssemblerStats,
}

/// Totals after a capture. Nothing is printed for `Raw`.
pub fn print_capture_summary(frames: u64, stats: &AssemblerStats, format: OutputFormat) {
    let rows = [
        ("frames", frames),
        ("frames_emitted", stats.frames_emitted),
        ("packets_discarded", stats.packets_discarded),
        ("dropped_writes", stats.dropped_writes),
        ("counter_wraps", stats.counter_wraps),
        ("frames_abandoned", stats.frames_abandoned),
    ];
    match format {
        OutputFormat::Json => print_json(&SummaryOutput {
            frames,
            stats: *stats,
        }),
        OutputFormat::Table => print_table(&rows),
        OutputFormat::Pretty => print_pairs(&rows),
        OutputFormat::Raw => {}
    }
}

#[derive(Serialize)]
struct GeometryOutput<'a> {
    #[serde(flatten)]
    geometry: &'a FrameGeometry,
    residual_bytes: u64,
}

pub fn print_geometry(geometry: &FrameGeometry, format: OutputFormat) {
    let rows = [
        ("frame_bytes", geometry.frame_bytes),
        ("packet_bytes", geometry.packet_bytes),
        ("clipped_frame_bytes", geometry.clipped_frame_bytes),
        ("residual_bytes", geometry.residual_bytes()),
        (
            "packets_per_clipped_frame",
            geometry.packets_per_clipped_frame as u64,
        ),
        ("words_per_packet", geometry.words_per_packet as u64),
        (
            "words_per_clipped_frame",
            geometry.words_per_clipped_frame as u64,
        ),
    ];
    match format {
        OutputFormat::Json => print_json(&GeometryOutput {
            geometry,
            residual_bytes: geometry.residual_bytes(),
        }),
        OutputFormat::Table => print_table(&rows),
        OutputFormat::Pretty | OutputFormat::Raw => print_pairs(&rows),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(rows: &[(&str, u64)]) {
    let mut table = new_table(vec!["FIELD", "VALUE"]);
    for (field, value) in rows {
        table.add_row(vec![field.to_string(), value.to_string()]);
    }
    println!("{table}");
}

fn print_pairs(rows: &[(&str, u64)]) {
    for (field, value) in rows {
        println!("{field}: {value}");
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
