use radarcap_device::SessionConfig;
use radarcap_frame::{AdcConfig, FrameGeometry};

use crate::cmd::GeometryArgs;
use crate::exit::{device_error, frame_error, CliResult, SUCCESS};
use crate::output::{print_geometry, OutputFormat};

pub fn run(args: GeometryArgs, format: OutputFormat) -> CliResult<i32> {
    let mut adc = match &args.config {
        Some(path) => {
            SessionConfig::from_json_file(path)
                .map_err(|err| device_error("config load failed", err))?
                .adc
        }
        None => AdcConfig::default(),
    };
    args.adc.apply(&mut adc);

    let geometry =
        FrameGeometry::compute(&adc).map_err(|err| frame_error("invalid geometry", err))?;
    print_geometry(&geometry, format);

    Ok(SUCCESS)
}
