use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("serial port error: {0}")]
    Serial(String),
    #[error("device disconnected: {0}")]
    Disconnected(String),
    #[error("end of stream")]
    EndOfStream,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "hardware")]
impl From<serialport::Error> for HwError {
    fn from(e: serialport::Error) -> Self {
        match e.kind() {
            serialport::ErrorKind::NoDevice => HwError::Disconnected(e.description),
            serialport::ErrorKind::Io(kind) => HwError::Io(std::io::Error::new(kind, e.description)),
            _ => HwError::Serial(e.description),
        }
    }
}

pub type Result<T> = std::result::Result<T, HwError>;
