//! Keyboard → device relay with per-byte pacing.

use std::io::Write;
use std::time::Duration;

use tokio::time::sleep;

use crate::display::DisplayMode;
use crate::errors::Result;
use crate::serial::slip::END;

/// Default gap between two consecutive device writes.
pub const DEFAULT_DELAY: Duration = Duration::from_micros(6000);

pub struct OutboundRelay<D> {
    device: D,
    delay: Duration,
}

impl<D: Write> OutboundRelay<D> {
    pub fn new(device: D, delay: Duration) -> Self {
        Self { device, delay }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Write a keyboard chunk to the device one byte at a time.
    ///
    /// In SLIP-only mode the chunk is wrapped in END delimiters. Payload bytes are
    /// sent as typed, without byte-stuffing.
    pub async fn send(&mut self, bytes: &[u8], mode: DisplayMode) -> Result<()> {
        let framed = mode == DisplayMode::Slip;
        if framed {
            self.device.write_all(&[END])?;
        }
        for &b in bytes {
            self.device.write_all(&[b])?;
            self.device.flush()?;
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
        }
        if framed {
            self.device.write_all(&[END])?;
            self.device.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Instant;

    #[tokio::test]
    async fn plain_modes_forward_bytes_unchanged() {
        let mut relay = OutboundRelay::new(Vec::new(), Duration::ZERO);
        relay.send(b"AT\r", DisplayMode::SlipAuto).await.unwrap();
        relay.send(&[END], DisplayMode::Hex).await.unwrap();
        assert_eq!(relay.device(), &vec![b'A', b'T', b'\r', END]);
    }

    #[tokio::test]
    async fn slip_only_mode_wraps_chunk() {
        let mut relay = OutboundRelay::new(Vec::new(), Duration::ZERO);
        relay.send(b"hi", DisplayMode::Slip).await.unwrap();
        assert_eq!(relay.device(), &vec![END, b'h', b'i', END]);
    }

    #[tokio::test]
    async fn pacing_delays_every_byte() {
        let mut relay = OutboundRelay::new(Vec::new(), Duration::from_millis(5));
        let started = Instant::now();
        relay.send(b"abcd", DisplayMode::StartText).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    struct Unplugged;

    impl Write for Unplugged {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Ok(0)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn zero_length_write_is_fatal() {
        let mut relay = OutboundRelay::new(Unplugged, Duration::ZERO);
        assert!(relay.send(b"x", DisplayMode::StartText).await.is_err());
    }
}
