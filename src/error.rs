use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum IosError {
    #[error("Failed to decode device record '{key}': {source}")]
    DeviceDecode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid iOS configuration file {path:?}: {reason}")]
    InvalidConfigFile { path: PathBuf, reason: String },

    #[error("Entity setup failed for {unique_id}: {reason}")]
    EntitySetup { unique_id: String, reason: String },

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IosError>;
