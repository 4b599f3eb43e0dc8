mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "radarcap", version, about = "Radar capture board CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_with_code_and_params() {
        let cli = Cli::try_parse_from([
            "radarcap",
            "send",
            "--code",
            "config-fpga-gen",
            "--params",
            "01020102031e",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.code.as_deref(), Some("config-fpga-gen"));
                assert!(args.raw.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_code_with_raw() {
        let err = Cli::try_parse_from([
            "radarcap",
            "send",
            "--code",
            "record-start",
            "--raw",
            "5aa505000000aaee",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn send_requires_code_or_raw() {
        let err = Cli::try_parse_from(["radarcap", "send"]).expect_err("missing command");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_capture_with_device_flags() {
        let cli = Cli::try_parse_from([
            "radarcap",
            "--format",
            "json",
            "capture",
            "--host-ip",
            "127.0.0.1",
            "--frames",
            "10",
            "--chirps",
            "64",
            "--overflow-policy",
            "resync",
        ])
        .expect("capture args should parse");

        match cli.command {
            Command::Capture(args) => {
                assert_eq!(args.frames, Some(10));
                assert_eq!(args.device.adc.chirps, Some(64));
                assert_eq!(args.read_timeout, "1s");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
