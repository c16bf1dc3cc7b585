//! Inbound byte demultiplexer.
//!
//! [`InboundDecoder`] owns the display mode and every piece of per-connection
//! reception state. The terminal loop feeds it each batch read from the device
//! and it writes the rendered form to the supplied output.

use std::io::{self, Write};

use log::debug;

use super::{
    write_hex_dump, write_hex_row, write_int, DisplayMode, Timestamper, HEX_COLUMNS,
    INT_COLUMNS, SLIP_PREFIX,
};
use crate::serial::slip::{FrameFlag, SlipDecoder, SlipEvent, SlipStats, END};

pub struct InboundDecoder {
    mode: DisplayMode,
    timestamper: Timestamper,
    column: usize,
    hex_row: Vec<u8>,
    slip: SlipDecoder,
}

impl InboundDecoder {
    pub fn new(mode: DisplayMode, timestamper: Timestamper) -> Self {
        Self {
            mode,
            timestamper,
            column: 0,
            hex_row: Vec::with_capacity(HEX_COLUMNS),
            slip: SlipDecoder::new(),
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn frame_flag(&self) -> FrameFlag {
        self.slip.flag()
    }

    pub fn slip_stats(&self) -> SlipStats {
        self.slip.stats()
    }

    /// Render one batch read from the device, then flush `out`.
    ///
    /// In hex mode a trailing partial row is shown before returning; it is
    /// redrawn in place once the row fills up.
    pub fn feed<W: Write + ?Sized>(&mut self, bytes: &[u8], out: &mut W) -> io::Result<()> {
        for &b in bytes {
            self.feed_byte(b, out)?;
        }
        if self.mode == DisplayMode::Hex && !self.hex_row.is_empty() {
            write_hex_row(out, "", &self.hex_row)?;
        }
        out.flush()
    }

    fn feed_byte<W: Write + ?Sized>(&mut self, b: u8, out: &mut W) -> io::Result<()> {
        match self.mode {
            DisplayMode::StartText | DisplayMode::Text => out.write_all(&[b]),
            DisplayMode::StartDate => {
                out.write_all(self.timestamper.prefix().as_bytes())?;
                self.mode = DisplayMode::Date;
                self.dated_text(b, out)
            }
            DisplayMode::Date => self.dated_text(b, out),
            DisplayMode::Int => {
                write_int(out, b)?;
                self.column += 1;
                if self.column >= INT_COLUMNS {
                    self.column = 0;
                    out.write_all(b"\n")?;
                }
                Ok(())
            }
            DisplayMode::Hex => {
                self.hex_row.push(b);
                if self.hex_row.len() >= HEX_COLUMNS {
                    write_hex_row(out, "", &self.hex_row)?;
                    self.hex_row.clear();
                    out.write_all(b"\n")?;
                }
                Ok(())
            }
            DisplayMode::SlipAuto | DisplayMode::SlipHide
                if self.slip.flag() == FrameFlag::Closed && b != END =>
            {
                // outside a frame: console text
                out.write_all(&[b])
            }
            DisplayMode::SlipAuto | DisplayMode::SlipHide | DisplayMode::Slip => {
                self.slip_byte(b, out)
            }
        }
    }

    fn dated_text<W: Write + ?Sized>(&mut self, b: u8, out: &mut W) -> io::Result<()> {
        out.write_all(&[b])?;
        if b == b'\n' {
            self.mode = DisplayMode::StartDate;
        }
        Ok(())
    }

    fn slip_byte<W: Write + ?Sized>(&mut self, b: u8, out: &mut W) -> io::Result<()> {
        match self.slip.push_byte(b) {
            SlipEvent::Frame(frame) => {
                if self.mode != DisplayMode::SlipHide {
                    write_hex_dump(out, SLIP_PREFIX, &frame)?;
                }
                Ok(())
            }
            SlipEvent::Discarded => {
                debug!("dropping frame end after overflow: {:?}", self.slip.stats());
                Ok(())
            }
            SlipEvent::Overflow | SlipEvent::Pending => Ok(()),
        }
    }
}
