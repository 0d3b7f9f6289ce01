use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("No serial devices detected")]
    NoPortsFound,
}

pub type Result<T> = std::result::Result<T, DeviceError>;
