//! # serialdump - serial line terminal and tap
//!
//! serialdump relays keystrokes to a serial device and renders everything the
//! device sends back in one of several display modes, so the same tool works
//! for a plain console, a timestamped boot log, a byte-level hex view or a
//! stream of SLIP frames mixed with debug text.
//!
//! ## Features
//!
//! - **Display modes**: verbatim text, per-line timestamps (wall clock, elapsed or
//!   strftime), decimal columns, hex dump with character gutter
//! - **SLIP decoding**: byte-stuffing unescape, frame delimiting, overflow
//!   recovery; frames and console text can share one line
//! - **Paced writes**: keyboard bytes are written one at a time with a
//!   configurable gap, optionally wrapped in SLIP delimiters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serialdump::config::Config;
//! use serialdump::display::InboundDecoder;
//!
//! let config = Config::default();
//! let mut decoder = InboundDecoder::new(config.display.mode, config.display.timestamper());
//! decoder.feed(b"hello\n", &mut std::io::stdout()).unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`terminal`] - the event loop and keyboard relay
//! - [`display`] - display modes, inbound decoder and renderers
//! - [`serial`] - device access and the SLIP decoder
//! - [`config`] - configuration management and validation
//! - [`errors`] - error type shared by the library
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Terminal     │ ← waits on keyboard and device
//! └─────────────────┘
//!     │         │
//! ┌────────┐ ┌─────────────────┐
//! │ Relay  │ │ Inbound decoder │ ← display modes, SLIP
//! └────────┘ └─────────────────┘
//!     │         │
//! ┌─────────────────┐
//! │  Serial device  │
//! └─────────────────┘
//! ```

pub mod config;
pub mod display;
pub mod errors;
pub mod logutil;
pub mod serial;
pub mod terminal;
