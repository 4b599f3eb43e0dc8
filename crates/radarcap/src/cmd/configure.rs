use radarcap_device::DeviceSession;

use crate::cmd::ConfigureArgs;
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_steps, OutputFormat};

pub fn run(args: ConfigureArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.device.session_config()?;
    let mut session = DeviceSession::open(config).map_err(|err| device_error("open failed", err))?;

    let steps = session
        .configure()
        .map_err(|err| device_error("configure failed", err))?;
    print_steps(&steps, format);

    Ok(SUCCESS)
}
