//! # Serial Device Module
//!
//! Opens the serial device in raw 8N1 mode and turns its blocking read side into
//! a stream of byte chunks the terminal loop can wait on alongside the keyboard.
//!
//! ## Features
//!
//! - **Speed validation**: only the line speeds the tool has always supported
//! - **Raw framing**: 8 data bits, no parity, one stop bit, no flow control
//! - **Reader task**: blocking reads on a dedicated task, forwarded over a channel
//! - **SLIP decoding**: see [`slip`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! # #[cfg(feature = "serial")]
//! # {
//! use serialdump::config::SerialConfig;
//! use serialdump::serial::{open_device, spawn_device_reader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let port = open_device(&SerialConfig::default())?;
//!     let mut chunks = spawn_device_reader(port.try_clone()?);
//!     while let Some(chunk) = chunks.recv().await {
//!         println!("{:?}", chunk?);
//!     }
//!     Ok(())
//! }
//! # }
//! ```

pub mod slip;

use std::io::{ErrorKind, Read};
use std::time::Duration;

use log::{debug, trace};
use tokio::sync::mpsc;

use crate::config::SerialConfig;
use crate::errors::{Result, SerialDumpError};
use crate::logutil::escape_bytes;

/// Line speeds accepted by `-B` / `serial.baud_rate`.
pub const SUPPORTED_BAUD_RATES: [u32; 8] = [
    9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600,
];

/// Bytes requested per device read.
pub const READ_CHUNK: usize = 40;

/// Read timeout used so the reader task can notice the loop has gone away.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Chunks buffered between the reader task and the terminal loop.
const CHANNEL_DEPTH: usize = 64;

/// Reject speeds outside [`SUPPORTED_BAUD_RATES`].
pub fn check_baud_rate(baud_rate: u32) -> Result<()> {
    if SUPPORTED_BAUD_RATES.contains(&baud_rate) {
        Ok(())
    } else {
        Err(SerialDumpError::UnsupportedBaudRate(baud_rate))
    }
}

/// Open the configured device in raw mode.
///
/// Prints the classic `connecting to DEVICE (BAUD) [OK]` status line on stderr.
#[cfg(feature = "serial")]
pub fn open_device(cfg: &SerialConfig) -> Result<Box<dyn serialport::SerialPort>> {
    check_baud_rate(cfg.baud_rate)?;
    eprint!("connecting to {} ({})", cfg.device, cfg.baud_rate);

    let port = serialport::new(&cfg.device, cfg.baud_rate)
        .timeout(READ_TIMEOUT)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .open()
        .map_err(|e| {
            eprintln!();
            SerialDumpError::Open {
                device: cfg.device.clone(),
                reason: e.to_string(),
            }
        })?;
    eprintln!(" [OK]");
    debug!("Serial port {} opened at {} baud", cfg.device, cfg.baud_rate);
    Ok(port)
}

#[cfg(not(feature = "serial"))]
pub fn open_device(cfg: &SerialConfig) -> Result<std::fs::File> {
    check_baud_rate(cfg.baud_rate)?;
    Err(SerialDumpError::Open {
        device: cfg.device.clone(),
        reason: "serial support not compiled in".to_string(),
    })
}

/// Move a blocking reader onto its own task and forward what it reads.
///
/// Timeouts and interrupted reads are retried. End of stream closes the channel;
/// any other error is forwarded once and then the channel closes.
pub fn spawn_device_reader<R>(mut reader: R) -> mpsc::Receiver<std::io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    tokio::task::spawn_blocking(move || {
        let mut buffer = [0u8; READ_CHUNK];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => {
                    debug!("Serial reader reached end of stream");
                    break;
                }
                Ok(n) => {
                    trace!("RAW {} bytes: {}", n, escape_bytes(&buffer[..n]));
                    if tx.blocking_send(Ok(buffer[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(ref e)
                    if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted =>
                {
                    if tx.is_closed() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    break;
                }
            }
        }
        debug!("Serial reader task exiting");
    });
    rx
}
