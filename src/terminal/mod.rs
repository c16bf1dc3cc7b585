//! # Terminal Loop
//!
//! The stream multiplexer: waits until the keyboard or the device has data,
//! services whichever is ready and goes back to waiting.
//!
//! ```text
//!  stdin ──► OutboundRelay ──► device
//!                                │
//!  stdout ◄── InboundDecoder ◄───┘ (reader task, chunk channel)
//! ```
//!
//! Everything after the wait runs synchronously on the loop's task, so the device
//! is never written while a batch is being rendered and bytes are shown in the
//! order they arrived.

pub mod relay;

use std::io::{ErrorKind, Write};

use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use crate::display::InboundDecoder;
use crate::errors::{Result, SerialDumpError};
use crate::logutil::escape_bytes;
pub use relay::{OutboundRelay, DEFAULT_DELAY};

/// Maximum keyboard bytes relayed per wake.
pub const KEYBOARD_CHUNK: usize = 40;

/// Chunks read from the device by the reader task.
pub type DeviceChunks = mpsc::Receiver<std::io::Result<Vec<u8>>>;

pub struct Terminal<K, D, O> {
    keyboard: Option<K>,
    device_rx: DeviceChunks,
    relay: OutboundRelay<D>,
    decoder: InboundDecoder,
    out: O,
}

impl<K, D, O> Terminal<K, D, O>
where
    K: AsyncRead + Unpin,
    D: Write,
    O: Write,
{
    pub fn new(
        keyboard: K,
        device_rx: DeviceChunks,
        relay: OutboundRelay<D>,
        decoder: InboundDecoder,
        out: O,
    ) -> Self {
        Self {
            keyboard: Some(keyboard),
            device_rx,
            relay,
            decoder,
            out,
        }
    }

    pub fn decoder(&self) -> &InboundDecoder {
        &self.decoder
    }

    pub fn relay(&self) -> &OutboundRelay<D> {
        &self.relay
    }

    pub fn output(&self) -> &O {
        &self.out
    }

    /// Whether stdin is still part of the wait set.
    pub fn keyboard_open(&self) -> bool {
        self.keyboard.is_some()
    }

    /// Service streams until a fatal error occurs.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.step().await?;
        }
    }

    /// Wait for one readiness event and service it.
    pub async fn step(&mut self) -> Result<()> {
        let mut kbuf = [0u8; KEYBOARD_CHUNK];
        tokio::select! {
            read = read_keyboard(self.keyboard.as_mut(), &mut kbuf) => match read {
                Ok(0) => {
                    debug!("Keyboard reached end of input; relaying device output only");
                    self.keyboard = None;
                }
                Ok(n) => {
                    trace!("SEND {} bytes: {}", n, escape_bytes(&kbuf[..n]));
                    self.relay.send(&kbuf[..n], self.decoder.mode()).await?;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {
                    debug!("Keyboard wait interrupted, retrying");
                }
                Err(e) => return Err(e.into()),
            },
            chunk = self.device_rx.recv() => match chunk {
                Some(Ok(bytes)) => {
                    self.decoder.feed(&bytes, &mut self.out)?;
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(SerialDumpError::DeviceClosed),
            },
        }
        Ok(())
    }
}

async fn read_keyboard<K: AsyncRead + Unpin>(
    keyboard: Option<&mut K>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match keyboard {
        Some(k) => k.read(buf).await,
        None => std::future::pending().await,
    }
}
