//! # Display Module
//!
//! Formatting for the inbound byte stream: hex-dump rows, decimal columns and
//! per-line timestamp prefixes. The stateful per-byte dispatch lives in
//! [`decoder`]; everything in this file is a pure function of its inputs.
//!
//! ## Hex rows
//!
//! A row holds up to [`HEX_COLUMNS`] bytes. Bytes are grouped by four, short rows
//! are padded so the character gutter lines up, and the gutter shows every byte
//! valued 30..=126 (decimal) as itself and everything else as `.`:
//!
//! ```text
//! SLIP: 48656C6C 6F2C2077 6F726C64                       Hello, world
//! ```
//!
//! Each row starts with a carriage return so a partial row printed while the line
//! was idle is overwritten once the row completes.

pub mod decoder;

use std::io::{self, Write};
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub use decoder::InboundDecoder;

/// Bytes per hex-dump row.
pub const HEX_COLUMNS: usize = 20;
/// Values per line in decimal mode.
pub const INT_COLUMNS: usize = 18;
/// Prefix of the first row of a rendered SLIP frame.
pub const SLIP_PREFIX: &str = "SLIP:";
/// strftime format used by `-T` without an argument.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How the inbound stream is rendered.
///
/// `StartText`/`Text` and `StartDate`/`Date` are pairs of sub-states of one
/// logical mode; only the `Start*` variants are selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    #[default]
    #[serde(rename = "text")]
    StartText,
    #[serde(skip)]
    Text,
    #[serde(rename = "date")]
    StartDate,
    #[serde(skip)]
    Date,
    Int,
    Hex,
    SlipAuto,
    Slip,
    SlipHide,
}

/// Source of the per-line timestamp in date mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampKind {
    /// Unix seconds and milliseconds (`-t`).
    #[default]
    WallClock,
    /// Seconds and milliseconds since start (`-t0`).
    Elapsed,
    /// Local time through a strftime format (`-T`).
    Format,
}

/// Produces line prefixes for date mode. Captures its start instant on creation.
#[derive(Debug, Clone)]
pub struct Timestamper {
    kind: TimestampKind,
    format: String,
    start: std::time::Instant,
}

impl Timestamper {
    /// An unparsable `format` is replaced by [`DEFAULT_TIME_FORMAT`].
    pub fn new(kind: TimestampKind, format: Option<&str>) -> Self {
        let format = match format {
            Some(f) if is_valid_time_format(f) => f,
            Some(f) => {
                warn!("Invalid time format {:?}, using {:?}", f, DEFAULT_TIME_FORMAT);
                DEFAULT_TIME_FORMAT
            }
            None => DEFAULT_TIME_FORMAT,
        };
        Self {
            kind,
            format: format.to_string(),
            start: std::time::Instant::now(),
        }
    }

    /// Prefix for a line starting now.
    pub fn prefix(&self) -> String {
        self.prefix_at(Utc::now(), self.start.elapsed())
    }

    /// Prefix for a line starting at `now`, `elapsed` after start.
    pub fn prefix_at(&self, now: DateTime<Utc>, elapsed: Duration) -> String {
        match self.kind {
            TimestampKind::Elapsed => {
                format!("{:4}.{:03}: ", elapsed.as_secs(), elapsed.subsec_millis())
            }
            TimestampKind::WallClock => {
                format!("{:8}.{:03}: ", now.timestamp(), now.timestamp_subsec_millis())
            }
            TimestampKind::Format => {
                use std::fmt::Write as _;
                let local: DateTime<Local> = now.with_timezone(&Local);
                let mut out = String::new();
                if write!(out, "{}", local.format(&self.format)).is_err() {
                    debug!("time format {:?} failed to render", self.format);
                    out.clear();
                }
                out.push('|');
                out
            }
        }
    }
}

/// Check a strftime format without rendering it.
pub fn is_valid_time_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Whether a byte is shown as itself in the hex gutter.
pub fn is_displayable(b: u8) -> bool {
    (30..=126).contains(&b)
}

/// Write one hex-dump row of at most [`HEX_COLUMNS`] bytes. No line break is written.
pub fn write_hex_row<W: Write + ?Sized>(out: &mut W, prefix: &str, row: &[u8]) -> io::Result<()> {
    debug_assert!(row.len() <= HEX_COLUMNS);
    write!(out, "\r{}", prefix)?;
    for (i, b) in row.iter().enumerate() {
        if i % 4 == 0 {
            out.write_all(b" ")?;
        }
        write!(out, "{:02X}", b)?;
    }
    out.write_all(b"  ")?;
    for i in row.len()..HEX_COLUMNS {
        if i % 4 == 0 {
            out.write_all(b" ")?;
        }
        out.write_all(b"  ")?;
    }
    let gutter: Vec<u8> = row
        .iter()
        .map(|&b| if is_displayable(b) { b } else { b'.' })
        .collect();
    out.write_all(&gutter)
}

/// Write a payload as consecutive hex rows, each followed by a line break.
///
/// The first row carries `prefix`; continuation rows carry blanks of the same width.
pub fn write_hex_dump<W: Write + ?Sized>(out: &mut W, prefix: &str, payload: &[u8]) -> io::Result<()> {
    let blank = " ".repeat(prefix.len());
    for (n, row) in payload.chunks(HEX_COLUMNS).enumerate() {
        let p = if n == 0 { prefix } else { blank.as_str() };
        write_hex_row(out, p, row)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Write one byte as a zero-padded decimal column.
pub fn write_int<W: Write + ?Sized>(out: &mut W, b: u8) -> io::Result<()> {
    write!(out, "{:03} ", b)
}
