use bytes::Bytes;
use radarcap_device::{Command, DeviceSession};
use radarcap_frame::{CommandCode, FrameError};

use crate::cmd::SendArgs;
use crate::exit::{device_error, frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let command = resolve_command(&args)?;
    let label = match &command {
        Command::Typed { code, .. } => code.name(),
        Command::Raw(_) => "raw",
    };

    let config = args.device.session_config()?;
    let timeout = config.command_timeout();
    let mut session = DeviceSession::open(config).map_err(|err| device_error("open failed", err))?;

    let reply = session
        .send(&command, timeout)
        .map_err(|err| device_error("send failed", err))?;
    print_reply(label, &reply, format);

    Ok(SUCCESS)
}

fn resolve_command(args: &SendArgs) -> CliResult<Command> {
    if let Some(raw) = &args.raw {
        let command = Command::Raw(raw.clone());
        // Reject bad hex before touching the network.
        command
            .encode()
            .map_err(|err| device_error("invalid --raw", err))?;
        return Ok(command);
    }

    let name = args
        .code
        .as_deref()
        .ok_or_else(|| CliError::new(USAGE, "one of --code or --raw is required"))?;
    let code: CommandCode = name
        .parse()
        .map_err(|err: FrameError| frame_error("invalid --code", err))?;
    let params = match &args.params {
        Some(text) => {
            let cleaned: String = text.split_whitespace().collect();
            hex::decode(cleaned)
                .map_err(|err| frame_error("invalid --params", FrameError::InvalidHex(err)))?
        }
        None => Vec::new(),
    };

    Ok(Command::Typed {
        code,
        params: Bytes::from(params),
    })
}
