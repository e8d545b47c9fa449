use candles_core::{ErrorKind, ServiceError};
use candles_warehouse::WarehouseError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("failed to open warehouse: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Service(error) => match error.kind() {
                ErrorKind::InvalidArgument => 2,
                ErrorKind::NotFound => 3,
                ErrorKind::Internal => 1,
            },
            Self::Warehouse(_) => 1,
            Self::Command(_) => 2,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
