//! SLIP framing for the serial tap
//!
//! Devices on the other end of the line emit SLIP encoded frames interleaved with
//! plain console text. We implement an incremental, byte-at-a-time decoder that
//! tracks frame boundaries, unescapes byte-stuffed payload and recovers from
//! frames larger than the reception buffer.

use log::warn;

pub const END: u8 = 0xC0; // frame delimiter
pub const ESC: u8 = 0xDB;
pub const ESC_END: u8 = 0xDC;
pub const ESC_ESC: u8 = 0xDD;

/// Reception buffer capacity for SLIP payload.
pub const MAX_FRAME: usize = 2048;

/// Whether a frame-start boundary has been seen without a matching end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFlag {
    #[default]
    Closed,
    Open,
    /// The current frame outgrew the buffer; its eventual end is not rendered.
    Overflowed,
}

/// Result of pushing a single byte into the decoder.
#[derive(Debug, PartialEq, Eq)]
pub enum SlipEvent {
    /// Byte consumed without completing anything (payload, escape marker, lone END).
    Pending,
    /// A frame ended and should be displayed.
    Frame(Vec<u8>),
    /// A frame ended but it followed an overflow, so it is dropped silently.
    Discarded,
    /// The reception buffer filled up; its contents were thrown away.
    Overflow,
}

/// Running totals, surfaced in debug logs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SlipStats {
    pub frames: u64,
    pub discarded: u64,
    pub overflows: u64,
}

#[derive(Debug)]
pub struct SlipDecoder {
    buf: Vec<u8>,
    esc: bool,
    flag: FrameFlag,
    stats: SlipStats,
}

impl Default for SlipDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SlipDecoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(MAX_FRAME),
            esc: false,
            flag: FrameFlag::Closed,
            stats: SlipStats::default(),
        }
    }

    pub fn flag(&self) -> FrameFlag {
        self.flag
    }

    #[cfg(test)]
    fn buffered(&self) -> usize {
        self.buf.len()
    }

    #[cfg(test)]
    fn escape_pending(&self) -> bool {
        self.esc
    }

    pub fn stats(&self) -> SlipStats {
        self.stats
    }

    /// Push one byte through the state machine.
    pub fn push_byte(&mut self, b: u8) -> SlipEvent {
        match b {
            ESC => {
                self.esc = true;
                SlipEvent::Pending
            }
            END => self.end_of_frame(),
            _ => {
                let b = if self.esc {
                    self.esc = false;
                    match b {
                        ESC_END => END,
                        ESC_ESC => ESC,
                        // invalid escape: keep the byte as-is
                        other => other,
                    }
                } else {
                    b
                };
                if self.buf.len() >= MAX_FRAME {
                    warn!("**** slip overflow");
                    self.buf.clear();
                    self.flag = FrameFlag::Overflowed;
                    self.stats.overflows += 1;
                    return SlipEvent::Overflow;
                }
                self.buf.push(b);
                SlipEvent::Pending
            }
        }
    }

    /// Push bytes, returning every completed, displayable frame.
    pub fn push(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        data.iter()
            .filter_map(|&b| match self.push_byte(b) {
                SlipEvent::Frame(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    fn end_of_frame(&mut self) -> SlipEvent {
        if self.buf.is_empty() {
            // A lone END opens or closes an empty frame rather than being ignored.
            self.flag = match self.flag {
                FrameFlag::Closed => FrameFlag::Open,
                FrameFlag::Open | FrameFlag::Overflowed => FrameFlag::Closed,
            };
            return SlipEvent::Pending;
        }
        let overflowed = self.flag == FrameFlag::Overflowed;
        let frame = std::mem::replace(&mut self.buf, Vec::with_capacity(MAX_FRAME));
        self.esc = false;
        self.flag = FrameFlag::Closed;
        if overflowed {
            self.stats.discarded += 1;
            SlipEvent::Discarded
        } else {
            self.stats.frames += 1;
            SlipEvent::Frame(frame)
        }
    }
}

/// Byte-stuff `payload` and wrap it in END delimiters.
pub fn slip_encode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.push(END);
    for &b in payload {
        match b {
            END => {
                out.push(ESC);
                out.push(ESC_END);
            }
            ESC => {
                out.push(ESC);
                out.push(ESC_ESC);
            }
            _ => out.push(b),
        }
    }
    out.push(END);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_stuffed_frame() {
        let mut dec = SlipDecoder::new();
        let frames = dec.push(&[END, 0x01, ESC, ESC_END, ESC, ESC_ESC, 0x02, END]);
        assert_eq!(frames, vec![vec![0x01, END, ESC, 0x02]]);
        assert_eq!(dec.flag(), FrameFlag::Closed);
        assert!(!dec.escape_pending());
    }

    #[test]
    fn invalid_escape_passes_byte_through() {
        let mut dec = SlipDecoder::new();
        let frames = dec.push(&[END, ESC, 0x41, END]);
        assert_eq!(frames, vec![vec![0x41]]);
    }

    #[test]
    fn lone_end_toggles_flag() {
        let mut dec = SlipDecoder::new();
        assert_eq!(dec.push_byte(END), SlipEvent::Pending);
        assert_eq!(dec.flag(), FrameFlag::Open);
        assert_eq!(dec.push_byte(END), SlipEvent::Pending);
        assert_eq!(dec.flag(), FrameFlag::Closed);
    }

    #[test]
    fn frame_without_leading_end_still_completes() {
        let mut dec = SlipDecoder::new();
        assert_eq!(dec.push(&[0x10, 0x11, END]), vec![vec![0x10, 0x11]]);
        assert_eq!(dec.flag(), FrameFlag::Closed);
    }

    #[test]
    fn full_buffer_is_not_an_overflow() {
        let mut dec = SlipDecoder::new();
        dec.push_byte(END);
        for _ in 0..MAX_FRAME {
            assert_eq!(dec.push_byte(0x55), SlipEvent::Pending);
        }
        assert_eq!(dec.buffered(), MAX_FRAME);
        match dec.push_byte(END) {
            SlipEvent::Frame(frame) => assert_eq!(frame.len(), MAX_FRAME),
            other => panic!("expected frame, got {:?}", other),
        }
        assert_eq!(dec.stats().overflows, 0);
    }

    #[test]
    fn overflow_discards_following_frame_end() {
        let mut dec = SlipDecoder::new();
        dec.push_byte(END);
        for _ in 0..MAX_FRAME {
            dec.push_byte(0x55);
        }
        assert_eq!(dec.push_byte(0x55), SlipEvent::Overflow);
        assert_eq!(dec.buffered(), 0);
        assert_eq!(dec.flag(), FrameFlag::Overflowed);

        dec.push_byte(0x01);
        assert_eq!(dec.push_byte(END), SlipEvent::Discarded);
        assert_eq!(dec.flag(), FrameFlag::Closed);

        let frames = dec.push(&[END, 0x02, END]);
        assert_eq!(frames, vec![vec![0x02]]);
        assert_eq!(
            dec.stats(),
            SlipStats {
                frames: 1,
                discarded: 1,
                overflows: 1
            }
        );
    }

    #[test]
    fn end_right_after_overflow_closes_flag() {
        let mut dec = SlipDecoder::new();
        for _ in 0..=MAX_FRAME {
            dec.push_byte(0x00);
        }
        assert_eq!(dec.flag(), FrameFlag::Overflowed);
        assert_eq!(dec.push_byte(END), SlipEvent::Pending);
        assert_eq!(dec.flag(), FrameFlag::Closed);
    }

    #[test]
    fn encode_escapes_reserved_bytes() {
        assert_eq!(
            slip_encode(&[0x01, END, ESC]),
            vec![END, 0x01, ESC, ESC_END, ESC, ESC_ESC, END]
        );
    }
}
