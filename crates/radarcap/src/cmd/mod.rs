use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use radarcap_device::SessionConfig;
use radarcap_frame::{AdcConfig, OverflowPolicy};

use crate::exit::{device_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod capture;
pub mod configure;
pub mod geometry;
pub mod send;
pub mod stop;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to the board, configure it and start recording.
    Configure(ConfigureArgs),
    /// Send a single command and print the reply.
    Send(SendArgs),
    /// Stop recording.
    Stop(StopArgs),
    /// Read frames from the data link.
    Capture(CaptureArgs),
    /// Print the frame geometry for an ADC configuration.
    Geometry(GeometryArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Configure(args) => configure::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Stop(args) => stop::run(args, format),
        Command::Capture(args) => capture::run(args, format),
        Command::Geometry(args) => geometry::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Board addressing and capture settings shared by every device command.
///
/// Flags override values from `--config`, which override built-in defaults.
#[derive(Args, Debug, Default)]
pub struct DeviceArgs {
    /// JSON session config file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Local address to bind both links to.
    #[arg(long, env = "RADARCAP_HOST_IP")]
    pub host_ip: Option<IpAddr>,
    /// Capture board address.
    #[arg(long, env = "RADARCAP_DEVICE_IP")]
    pub device_ip: Option<IpAddr>,
    /// Local control port (0 picks a free port).
    #[arg(long)]
    pub control_port: Option<u16>,
    /// Local data port (0 picks a free port).
    #[arg(long)]
    pub data_port: Option<u16>,
    /// Board control port.
    #[arg(long)]
    pub device_port: Option<u16>,
    /// Command reply timeout (e.g. 1s, 500ms).
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,
    /// Behaviour when a frame overruns without a boundary packet.
    #[arg(long, value_enum)]
    pub overflow_policy: Option<PolicyArg>,
    #[command(flatten)]
    pub adc: AdcArgs,
}

/// ADC parameters that size a frame.
#[derive(Args, Debug, Default)]
pub struct AdcArgs {
    /// Chirps per frame.
    #[arg(long)]
    pub chirps: Option<u32>,
    /// Receive antennas.
    #[arg(long)]
    pub rx: Option<u32>,
    /// Transmit antennas.
    #[arg(long)]
    pub tx: Option<u32>,
    /// 2 for complex samples, 1 for real.
    #[arg(long)]
    pub iq: Option<u32>,
    /// ADC samples per chirp.
    #[arg(long)]
    pub samples: Option<u32>,
    /// Bytes per ADC sample.
    #[arg(long)]
    pub bytes_per_sample: Option<u32>,
    /// ADC payload bytes per data packet.
    #[arg(long)]
    pub packet_bytes: Option<u32>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum PolicyArg {
    WrapCounter,
    Resync,
}

impl From<PolicyArg> for OverflowPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::WrapCounter => OverflowPolicy::WrapCounter,
            PolicyArg::Resync => OverflowPolicy::Resync,
        }
    }
}

impl DeviceArgs {
    /// Resolve the effective session config.
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_json_file(path)
                .map_err(|err| device_error("config load failed", err))?,
            None => SessionConfig::default(),
        };

        if let Some(ip) = self.host_ip {
            config.host_ip = ip;
        }
        if let Some(ip) = self.device_ip {
            config.device_ip = ip;
        }
        if let Some(port) = self.control_port {
            config.control_port = port;
        }
        if let Some(port) = self.data_port {
            config.data_port = port;
        }
        if let Some(port) = self.device_port {
            config.device_port = port;
        }
        if let Some(timeout) = &self.timeout {
            config.command_timeout_ms = u64::try_from(parse_duration(timeout)?.as_millis())
                .map_err(|_| CliError::new(USAGE, format!("timeout out of range: {timeout}")))?;
        }
        if let Some(policy) = self.overflow_policy {
            config.overflow_policy = policy.into();
        }
        self.adc.apply(&mut config.adc);

        Ok(config)
    }
}

impl AdcArgs {
    pub fn apply(&self, adc: &mut AdcConfig) {
        let overrides = [
            (self.chirps, &mut adc.chirps),
            (self.rx, &mut adc.rx),
            (self.tx, &mut adc.tx),
            (self.iq, &mut adc.iq),
            (self.samples, &mut adc.samples_per_chirp),
            (self.bytes_per_sample, &mut adc.bytes_per_sample),
            (self.packet_bytes, &mut adc.packet_bytes),
        ];
        for (value, field) in overrides {
            if let Some(value) = value {
                *field = value;
            }
        }
    }
}

#[derive(Args, Debug)]
pub struct ConfigureArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Command name (e.g. record-start, read-fpga-version).
    #[arg(long, required_unless_present = "raw", conflicts_with = "raw")]
    pub code: Option<String>,
    /// Command parameters as hex.
    #[arg(long, value_name = "HEX", requires = "code")]
    pub params: Option<String>,
    /// Complete message as hex, sent unchanged.
    #[arg(long, value_name = "HEX")]
    pub raw: Option<String>,
}

#[derive(Args, Debug)]
pub struct StopArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct CaptureArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Stop after N frames. Default: until interrupted.
    #[arg(long)]
    pub frames: Option<u64>,
    /// Append raw little-endian samples to this file.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Run the configure sequence first and stop recording on exit.
    #[arg(long)]
    pub start: bool,
    /// Maximum time to wait for each frame (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s", value_name = "DURATION")]
    pub read_timeout: String,
}

#[derive(Args, Debug)]
pub struct GeometryArgs {
    /// JSON session config file; only its `adc` section is used.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub adc: AdcArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
