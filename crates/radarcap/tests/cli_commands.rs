#![cfg(all(unix, feature = "cli"))]

use std::io::{BufRead, BufReader};
use std::net::{SocketAddr, UdpSocket};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use radarcap::frame::{encode_packet, DataPacket};

fn radarcap() -> Command {
    radarcap_logging_at("error")
}

fn radarcap_logging_at(level: &str) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_radarcap"));
    command
        .env_remove("RADARCAP_HOST_IP")
        .env_remove("RADARCAP_DEVICE_IP")
        .arg("--log-level")
        .arg(level);
    command
}

fn loopback_args(command: &mut Command, board: SocketAddr) {
    loopback_args_with_data_port(command, board, 0);
}

fn loopback_args_with_data_port(command: &mut Command, board: SocketAddr, data_port: u16) {
    command
        .arg("--host-ip")
        .arg("127.0.0.1")
        .arg("--control-port")
        .arg("0")
        .arg("--data-port")
        .arg(data_port.to_string())
        .arg("--device-ip")
        .arg("127.0.0.1")
        .arg("--device-port")
        .arg(board.port().to_string());
}

/// Answers `replies` commands with a zero status, echoing the command code.
fn spawn_board(replies: usize) -> (SocketAddr, thread::JoinHandle<Vec<Vec<u8>>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("board should bind");
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("timeout should set");
    let addr = socket.local_addr().expect("board addr");
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        let mut buf = [0u8; 256];
        for _ in 0..replies {
            let Ok((n, from)) = socket.recv_from(&mut buf) else {
                break;
            };
            seen.push(buf[..n].to_vec());
            let reply = [0x5A, 0xA5, buf[2], buf[3], 0x00, 0x00, 0xAA, 0xEE];
            let _ = socket.send_to(&reply, from);
        }
        seen
    });
    (addr, handle)
}

fn free_udp_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0")
        .and_then(|socket| socket.local_addr())
        .expect("free port")
        .port()
}

fn unique_temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "radarcap-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ))
}

#[test]
fn geometry_json_reports_default_frame() {
    let output = radarcap()
        .arg("--format")
        .arg("json")
        .arg("geometry")
        .output()
        .expect("geometry should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json output");
    assert_eq!(value["frame_bytes"], 786_432);
    assert_eq!(value["clipped_frame_bytes"], 786_240);
    assert_eq!(value["packets_per_clipped_frame"], 540);
    assert_eq!(value["residual_bytes"], 192);
}

#[test]
fn geometry_rejects_odd_packet_size() {
    let output = radarcap()
        .arg("geometry")
        .arg("--packet-bytes")
        .arg("1455")
        .output()
        .expect("geometry should run");

    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid geometry"));
}

#[test]
fn configure_runs_against_board() {
    let (board, handle) = spawn_board(5);

    let mut command = radarcap();
    command.arg("--format").arg("json").arg("configure");
    loopback_args(&mut command, board);
    let output = command.output().expect("configure should run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let commands: Vec<String> = stdout
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).expect("json line");
            value["command"].as_str().unwrap_or_default().to_string()
        })
        .collect();
    assert_eq!(
        commands,
        [
            "system-connect",
            "read-fpga-version",
            "config-fpga-gen",
            "config-packet-data",
            "record-start"
        ]
    );

    let seen = handle.join().expect("board thread");
    assert_eq!(hex::encode(&seen[2]), "5aa50300060001020102031eaaee");
    assert_eq!(hex::encode(&seen[3]), "5aa50b000600be05350c0000aaee");
}

#[test]
fn send_raw_prints_reply() {
    let (board, handle) = spawn_board(1);

    let mut command = radarcap();
    command
        .arg("--format")
        .arg("pretty")
        .arg("send")
        .arg("--raw")
        .arg("5aa5 0600 0000 aaee");
    loopback_args(&mut command, board);
    let output = command.output().expect("send should run");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "raw: 5aa506000000aaee"
    );
    assert_eq!(
        handle.join().expect("board thread")[0],
        [0x5A, 0xA5, 0x06, 0x00, 0x00, 0x00, 0xAA, 0xEE]
    );
}

#[test]
fn send_unknown_code_is_usage_error() {
    let output = radarcap()
        .arg("send")
        .arg("--code")
        .arg("warp-drive")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn stop_without_reply_returns_124() {
    let board = UdpSocket::bind("127.0.0.1:0").expect("board should bind");

    let mut command = radarcap();
    command.arg("stop").arg("--timeout").arg("100ms");
    loopback_args(&mut command, board.local_addr().expect("board addr"));
    let output = command.output().expect("stop should run");

    assert_eq!(output.status.code(), Some(124));
}

#[test]
fn capture_silent_board_returns_124() {
    let board = UdpSocket::bind("127.0.0.1:0").expect("board should bind");

    let mut command = radarcap();
    command
        .arg("capture")
        .arg("--frames")
        .arg("1")
        .arg("--read-timeout")
        .arg("200ms");
    loopback_args(&mut command, board.local_addr().expect("board addr"));
    let output = command.output().expect("capture should run");

    assert_eq!(output.status.code(), Some(124));
    assert!(String::from_utf8_lossy(&output.stderr).contains("capture failed"));
}

#[test]
fn capture_writes_frame_samples() {
    let data_port = free_udp_port();
    let sink = unique_temp_path("capture");
    let board = UdpSocket::bind("127.0.0.1:0").expect("board should bind");

    let mut command = radarcap_logging_at("info");
    command
        .arg("--format")
        .arg("json")
        .arg("capture")
        .arg("--frames")
        .arg("2")
        .arg("--read-timeout")
        .arg("5s")
        .arg("--output")
        .arg(&sink)
        .args(["--chirps", "1", "--rx", "1", "--tx", "1", "--iq", "1"])
        .args(["--samples", "8", "--bytes-per-sample", "4", "--packet-bytes", "8"]);
    loopback_args_with_data_port(
        &mut command,
        board.local_addr().expect("board addr"),
        data_port,
    );
    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("capture should start");

    // Stream only once the data link is bound, so the first packet seen
    // opens a frame.
    let mut stderr = BufReader::new(child.stderr.take().expect("stderr")).lines();
    loop {
        match stderr.next() {
            Some(Ok(line)) if line.contains("device session open") => break,
            Some(_) => continue,
            None => panic!("capture exited before binding"),
        }
    }
    let drain = thread::spawn(move || stderr.map_while(Result::ok).collect::<Vec<_>>());

    let streaming = Arc::new(AtomicBool::new(true));
    let streamer = {
        let streaming = streaming.clone();
        thread::spawn(move || {
            let socket = UdpSocket::bind("127.0.0.1:0").expect("streamer should bind");
            let target: SocketAddr = format!("127.0.0.1:{data_port}").parse().expect("addr");
            // Four 8-byte packets per frame; the first and last sit on frame boundaries.
            let mut base = 0u64;
            while streaming.load(Ordering::SeqCst) {
                for seq in 1..=4i32 {
                    let byte_count = if seq == 1 { base } else { base + 8 * seq as u64 };
                    let packet = DataPacket::new(seq, byte_count, vec![seq as u16; 4]);
                    let _ = socket.send_to(&encode_packet(&packet), target);
                }
                base += 32;
                thread::sleep(Duration::from_millis(20));
            }
        })
    };

    let output = child.wait_with_output().expect("capture should finish");
    streaming.store(false, Ordering::SeqCst);
    streamer.join().expect("streamer thread");
    let log = drain.join().expect("stderr drain");

    assert!(output.status.success(), "stderr: {}", log.join("\n"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["frame"], 1);
    assert_eq!(lines[0]["bytes"], 32);
    assert_eq!(lines[0]["lost_packets"], 0);
    assert_eq!(lines[2]["frames"], 2);

    let samples = std::fs::read(&sink).expect("sample file");
    assert_eq!(samples.len(), 64);
    assert_eq!(&samples[..8], &[1, 0, 1, 0, 1, 0, 1, 0]);
    assert_eq!(&samples[24..32], &[4, 0, 4, 0, 4, 0, 4, 0]);
    let _ = std::fs::remove_file(&sink);
}

#[test]
fn version_prints_package_version() {
    let output = radarcap()
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("radarcap {}", env!("CARGO_PKG_VERSION"))
    );
}
