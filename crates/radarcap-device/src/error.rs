use std::path::PathBuf;
use std::time::Duration;

use radarcap_frame::FrameError;
use radarcap_transport::TransportError;

/// Errors that can occur in device operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Socket-level failure on the control link, or while binding.
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// Command encoding or geometry error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The board did not reply to a command in time.
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    /// A frame read stopped before the frame was complete.
    #[error("incomplete frame read after {packets} packets: {source}")]
    IncompleteRead {
        packets: u64,
        #[source]
        source: FrameError,
    },

    /// The session has been closed.
    #[error("session closed")]
    Closed,

    /// A configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TransportError> for DeviceError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(after) => DeviceError::Timeout(after),
            other => DeviceError::Transport(other),
        }
    }
}

impl DeviceError {
    /// True when the error came from a timeout on either link.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            DeviceError::Timeout(_)
                | DeviceError::IncompleteRead {
                    source: FrameError::Timeout(_),
                    ..
                }
        )
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
