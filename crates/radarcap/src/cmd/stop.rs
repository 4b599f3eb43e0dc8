use radarcap_device::DeviceSession;
use radarcap_frame::CommandCode;

use crate::cmd::StopArgs;
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: StopArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.device.session_config()?;
    let mut session = DeviceSession::open(config).map_err(|err| device_error("open failed", err))?;

    let reply = session
        .stop_record()
        .map_err(|err| device_error("stop failed", err))?;
    print_reply(CommandCode::RecordStop.name(), &reply, format);

    Ok(SUCCESS)
}
