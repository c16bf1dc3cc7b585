use thiserror::Error;

/// Errors that can arise while configuring or running the serial tap.
#[derive(Debug, Error)]
pub enum SerialDumpError {
    /// Requested line speed is not one the device layer can program.
    #[error("unknown baudrate {0}")]
    UnsupportedBaudRate(u32),

    /// Inter-byte write delay given as a negative number of microseconds.
    #[error("delay must not be negative (got {0})")]
    InvalidDelay(i64),

    /// Timestamp format string contains an unknown or malformed specifier.
    #[error("invalid time format '{0}'")]
    InvalidTimeFormat(String),

    /// The serial device could not be opened or configured.
    #[error("{device}: {reason}")]
    Open { device: String, reason: String },

    /// Wrapper around IO errors on the keyboard, device or output streams.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The device reader stopped delivering data (device unplugged, EOF).
    #[error("serial device closed")]
    DeviceClosed,
}

pub type Result<T> = std::result::Result<T, SerialDumpError>;
