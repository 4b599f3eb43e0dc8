use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use radarcap_frame::{AdcConfig, OverflowPolicy};
use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, Result};

/// Host address on the capture board's subnet.
pub const DEFAULT_HOST_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 33, 30));
/// Factory address of the capture board.
pub const DEFAULT_DEVICE_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 33, 180));
/// Control link port, on both host and board.
pub const DEFAULT_CONTROL_PORT: u16 = 4096;
/// Data link port on the host.
pub const DEFAULT_DATA_PORT: u16 = 4098;
/// Reply timeout for control commands.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

/// Network and capture settings for a [`crate::DeviceSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Local address both links bind to.
    pub host_ip: IpAddr,
    /// Local control link port.
    pub control_port: u16,
    /// Local data link port.
    pub data_port: u16,
    /// Board address.
    pub device_ip: IpAddr,
    /// Board control port.
    pub device_port: u16,
    /// Reply timeout for control commands, in milliseconds.
    pub command_timeout_ms: u64,
    pub adc: AdcConfig,
    pub overflow_policy: OverflowPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host_ip: DEFAULT_HOST_IP,
            control_port: DEFAULT_CONTROL_PORT,
            data_port: DEFAULT_DATA_PORT,
            device_ip: DEFAULT_DEVICE_IP,
            device_port: DEFAULT_CONTROL_PORT,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT.as_millis() as u64,
            adc: AdcConfig::default(),
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Load a JSON config file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DeviceError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn control_bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host_ip, self.control_port)
    }

    pub fn data_bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host_ip, self.data_port)
    }

    pub fn device_addr(&self) -> SocketAddr {
        SocketAddr::new(self.device_ip, self.device_port)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}
