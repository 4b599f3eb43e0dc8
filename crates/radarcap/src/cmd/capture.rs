use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use radarcap_device::{DeviceError, DeviceSession};
use radarcap_frame::FrameError;
use tracing::{info, warn};

use crate::cmd::{parse_duration, CaptureArgs};
use crate::exit::{device_error, io_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_capture_summary, print_frame, print_steps, OutputFormat};

pub fn run(args: CaptureArgs, format: OutputFormat) -> CliResult<i32> {
    let read_timeout = parse_duration(&args.read_timeout)?;
    let config = args.device.session_config()?;
    let mut sink = args.output.as_deref().map(open_sink).transpose()?;

    let mut session = DeviceSession::open(config).map_err(|err| device_error("open failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    if args.start {
        let steps = session
            .configure()
            .map_err(|err| device_error("configure failed", err))?;
        if !matches!(format, OutputFormat::Raw) {
            print_steps(&steps, format);
        }
    }

    let result = capture_loop(&mut session, &args, &running, sink.as_mut(), read_timeout, format);

    if args.start {
        if let Err(err) = session.stop_record() {
            warn!(error = %err, "record stop failed");
        }
    }

    let captured = result?;
    let stats = session.stats();
    info!(
        frames = captured,
        packets_discarded = stats.packets_discarded,
        frames_abandoned = stats.frames_abandoned,
        "capture finished"
    );
    print_capture_summary(captured, &stats, format);

    Ok(SUCCESS)
}

fn capture_loop(
    session: &mut DeviceSession,
    args: &CaptureArgs,
    running: &AtomicBool,
    mut sink: Option<&mut File>,
    read_timeout: std::time::Duration,
    format: OutputFormat,
) -> CliResult<u64> {
    let mut captured = 0u64;
    let mut samples = BytesMut::new();

    while running.load(Ordering::SeqCst) {
        if args.frames.is_some_and(|limit| captured >= limit) {
            break;
        }

        let frame = match session.read(read_timeout) {
            Ok(frame) => frame,
            Err(_) if !running.load(Ordering::SeqCst) => break,
            Err(err) if is_recoverable(&err) => {
                warn!(error = %err, "frame dropped");
                continue;
            }
            Err(err) => return Err(device_error("capture failed", err)),
        };
        captured += 1;

        if let Some(file) = sink.as_deref_mut() {
            samples.clear();
            frame.write_le(&mut samples);
            file.write_all(&samples)
                .map_err(|err| io_error("failed writing samples", err))?;
        }
        if frame.lost_packets != 0 {
            warn!(
                frame = captured,
                lost_packets = frame.lost_packets,
                "frame incomplete"
            );
        }
        print_frame(captured, &frame, format);
    }

    Ok(captured)
}

/// A malformed datagram costs one frame; anything else ends the capture.
fn is_recoverable(err: &DeviceError) -> bool {
    matches!(
        err,
        DeviceError::IncompleteRead {
            source: FrameError::MalformedPacket { .. },
            ..
        }
    )
}

fn open_sink(path: &Path) -> CliResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
