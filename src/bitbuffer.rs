// Pomace
// Copyright (c) 2024-2026 The Pomace Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A bit-addressable circular view over a borrowed byte region, used to read and write the raw
//! nibble streams of GCR-encoded disk images.
//!
//! Bit 0 within a byte is the **most significant** bit, matching the convention GCR disk
//! controllers use. The cursor wraps from `end` back to `start` so that a disk track (itself a
//! circular medium) can be scanned past its nominal end without the caller having to special-
//! case the seam.
//!
//! [`BitBuffer::latch_next_byte`] is the interesting primitive here: it models the Disk II
//! controller's shift register, which free-runs until a byte with its high bit set shifts into
//! place. Everything else in this module exists to support that one operation and its cousins,
//! [`BitBuffer::expect_latch_sequence`] and [`BitBuffer::find_next_latch_sequence`].

use std::rc::Rc;
use std::cell::Cell;

use crate::errors::{invalid_argument, Error, Result};

/// A bit-addressable circular view over a borrowed `&mut [u8]` region.
///
/// All positions are absolute bit offsets into the backing byte slice; `start <= cursor < end`
/// is maintained at all times. The buffer never owns its bytes and never frees them.
pub struct BitBuffer<'a> {
    bytes: &'a mut [u8],
    start: u32,
    end: u32,
    cursor: u32,
    read_only: bool,
    zeroed: bool,
    modified: Rc<Cell<bool>>,
}

impl<'a> BitBuffer<'a> {
    /// Constructs a buffer over `[start_bit, end_bit)` of `bytes`, sharing `modified` with any
    /// sibling buffers over the same group of tracks.
    ///
    /// Fails if `end_bit <= start_bit`, if the range is narrower than a single byte, or if
    /// `end_bit` does not fit within `bytes`.
    pub fn new(
        bytes: &'a mut [u8],
        start_bit: u32,
        end_bit: u32,
        read_only: bool,
        modified: Rc<Cell<bool>>,
    ) -> Result<Self> {
        if end_bit <= start_bit {
            return invalid_argument("bitbuffer: end offset must be greater than start offset");
        }
        if end_bit - start_bit < 8 {
            return invalid_argument("bitbuffer: range must span at least one byte");
        }
        if (end_bit as u64) > (bytes.len() as u64) * 8 {
            return invalid_argument("bitbuffer: range exceeds the backing byte slice");
        }

        Ok(BitBuffer { bytes, start: start_bit, end: end_bit, cursor: start_bit, read_only, zeroed: false, modified })
    }

    /// Re-borrows this buffer's backing bytes over the same `[start, end)` range, sharing the
    /// modified flag, with the cursor reset to `start`. This is the moral equivalent of the
    /// "copy shares backing bytes" construct used elsewhere in GCR tooling, expressed here as an
    /// ordinary mutable reborrow rather than a second owner of the same memory.
    pub fn duplicate(&mut self) -> BitBuffer<'_> {
        BitBuffer {
            bytes: self.bytes,
            start: self.start,
            end: self.end,
            cursor: self.start,
            read_only: self.read_only,
            zeroed: false,
            modified: Rc::clone(&self.modified),
        }
    }

    /// Re-borrows a narrower `[start_bit, end_bit)` sub-range of this buffer, sharing the
    /// modified flag, with the cursor reset to `start_bit`.
    pub fn sub_range(&mut self, start_bit: u32, end_bit: u32) -> Result<BitBuffer<'_>> {
        if start_bit < self.start || end_bit > self.end {
            return invalid_argument("bitbuffer: sub-range must lie within the parent buffer");
        }
        let modified = Rc::clone(&self.modified);
        let read_only = self.read_only;
        BitBuffer::new(self.bytes, start_bit, end_bit, read_only, modified)
    }

    /// The number of bits spanned by this buffer's range.
    pub fn bit_count(&self) -> u32 {
        self.end - self.start
    }

    /// The current absolute cursor position.
    pub fn position(&self) -> u32 {
        self.cursor
    }

    /// The cursor position relative to `start`.
    pub fn relative_position(&self) -> u32 {
        self.cursor - self.start
    }

    /// `true` if this buffer has latched every bit in its range as zero since the last write.
    pub fn is_zeroed(&self) -> bool {
        self.zeroed
    }

    /// `true` if any mutator has been called on any buffer sharing this group's modified flag.
    pub fn is_modified(&self) -> bool {
        self.modified.get()
    }

    /// Clears the group's shared modified flag. Typically called by whichever owner is
    /// responsible for the group once it has observed the flag.
    pub fn clear_modified(&self) {
        self.modified.set(false);
    }

    #[inline]
    fn advance(&mut self) {
        self.cursor += 1;
        if self.cursor == self.end {
            self.cursor = self.start;
        }
    }

    /// Distance in bits travelling forward from `from` to `to`, both absolute positions within
    /// this buffer's range, accounting for one possible wrap.
    fn forward_distance(&self, from: u32, to: u32) -> i64 {
        if to >= from {
            (to - from) as i64
        } else {
            (self.end - from) as i64 + (to - self.start) as i64
        }
    }

    /// Reads one bit and advances the cursor.
    pub fn read_next_bit(&mut self) -> u8 {
        let byte = self.bytes[(self.cursor >> 3) as usize];
        let bit = 7 - (self.cursor & 7);
        let v = (byte >> bit) & 1;
        self.advance();
        v
    }

    /// Sets or clears one bit and advances the cursor. Fails if this buffer is read-only.
    pub fn write_bit(&mut self, v: u8) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        let idx = (self.cursor >> 3) as usize;
        let mask = 1u8 << (7 - (self.cursor & 7));
        if v != 0 {
            self.bytes[idx] |= mask;
        } else {
            self.bytes[idx] &= !mask;
        }
        self.zeroed = false;
        self.modified.set(true);
        self.advance();
        Ok(())
    }

    /// Reads 8 bits MSB-first and advances the cursor by 8. Takes a byte-aligned or
    /// two-byte-spanning fast path whenever the read does not wrap past `end`; otherwise falls
    /// back to eight individual [`BitBuffer::read_next_bit`] calls.
    pub fn read_octet(&mut self) -> u8 {
        if self.cursor + 8 <= self.end {
            let idx = (self.cursor >> 3) as usize;
            let k = self.cursor & 7;
            let v = if k == 0 {
                self.bytes[idx]
            } else {
                let hi = self.bytes[idx] & (0xFFu8 >> k);
                let lo = self.bytes[idx + 1] >> (8 - k);
                (hi << k) | lo
            };
            self.cursor += 8;
            if self.cursor == self.end {
                self.cursor = self.start;
            }
            v
        } else {
            let mut v = 0u8;
            for _ in 0..8 {
                v = (v << 1) | self.read_next_bit();
            }
            v
        }
    }

    /// Writes the 8 bits of `v` MSB-first, then appends `width - 8` zero bits (`width` is 8, 9,
    /// or 10 — GCR self-sync bytes append one or two zero bits after the data byte). Fails if
    /// this buffer is read-only or `width` is out of range.
    pub fn write_byte(&mut self, v: u8, width: u32) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        if !(8..=10).contains(&width) {
            return invalid_argument("bitbuffer: write_byte width must be 8, 9, or 10");
        }

        if width == 8 && self.cursor & 7 == 0 && self.cursor + 8 <= self.end {
            let idx = (self.cursor >> 3) as usize;
            self.bytes[idx] = v;
            self.zeroed = false;
            self.modified.set(true);
            self.cursor += 8;
            if self.cursor == self.end {
                self.cursor = self.start;
            }
            return Ok(());
        }

        for i in (0..8).rev() {
            self.write_bit((v >> i) & 1)?;
        }
        for _ in 0..(width - 8) {
            self.write_bit(0)?;
        }
        Ok(())
    }

    /// Latches the next byte the way the Disk II controller's shift register would: reads an
    /// octet, then keeps shifting in one bit at a time from the right while the accumulated
    /// byte's high bit is zero, until either the high bit comes up set or the cursor has swept
    /// all the way back around to where this call started.
    ///
    /// If the cursor makes a full circle without the high bit ever coming up, this buffer's
    /// range is entirely zero bits; a "zeroed" flag latches that fact so that subsequent calls
    /// return `0` after a cheap 8-bit advance, until a write clears the flag.
    pub fn latch_next_byte(&mut self) -> u8 {
        if self.zeroed {
            for _ in 0..8 {
                self.advance();
            }
            return 0;
        }

        let origin = self.cursor;
        let mut value = self.read_octet();

        while value & 0x80 == 0 && self.cursor != origin {
            value = (value << 1) | self.read_next_bit();
        }

        if value & 0x80 == 0 {
            self.zeroed = true;
        }

        value
    }

    /// Latches `bytes.len()` bytes and compares each against the expected sequence, stopping at
    /// the first mismatch. An empty sequence trivially succeeds without touching the cursor.
    pub fn expect_latch_sequence(&mut self, bytes: &[u8]) -> bool {
        for &expected in bytes {
            if self.latch_next_byte() != expected {
                return false;
            }
        }
        true
    }

    /// Searches forward from the current cursor for `sequence`, latching one byte at a time.
    ///
    /// `max_bits` caps how many bits may be scanned before giving up; pass `-1` to search the
    /// whole buffer (a `max_bits` at or beyond the buffer's bit count is treated the same way).
    /// On a full match, the cursor is left just past the sequence and this returns the bit
    /// offset of the sequence's first byte, relative to this buffer's `start`. Returns `Ok(None)`
    /// if the scan limit is reached with no match in progress.
    ///
    /// A partial match that breaks restarts the scan from just after the byte that began it, so
    /// overlapping candidate sequences (e.g. searching for `{0x96, 0x96}` in a run of `0x96`
    /// bytes) are still found one after another on successive calls.
    pub fn find_next_latch_sequence(&mut self, sequence: &[u8], max_bits: i64) -> Result<Option<u32>> {
        if sequence.is_empty() {
            return invalid_argument("bitbuffer: latch sequence must not be empty");
        }
        let seq_bits = sequence.len() as i64 * 8;
        if max_bits != -1 && max_bits < seq_bits {
            return invalid_argument("bitbuffer: max_bits must cover at least the sequence length");
        }

        let bit_count = self.bit_count() as i64;
        let search_limit = if max_bits == -1 || max_bits >= bit_count { bit_count } else { max_bits };

        let mut seq_index = 0usize;
        let mut restart_cursor = self.cursor;
        let mut match_start_cursor = self.cursor;
        let mut bits_scanned: i64 = 0;

        loop {
            let before = self.cursor;
            let byte = self.latch_next_byte();
            bits_scanned += self.forward_distance(before, self.cursor);

            if byte == sequence[seq_index] {
                if seq_index == 0 {
                    match_start_cursor = before;
                    restart_cursor = self.cursor;
                }
                seq_index += 1;
                if seq_index == sequence.len() {
                    return Ok(Some(match_start_cursor - self.start));
                }
            } else if seq_index > 0 {
                self.cursor = restart_cursor;
                seq_index = 0;
            }

            if bits_scanned >= search_limit {
                return Ok(None);
            }
        }
    }

    /// Fills the entire range with `width`-wide copies of `v`. Falls back to a plain byte
    /// `slice::fill` when the range is byte-aligned at both ends and `width == 8`; otherwise
    /// writes byte by byte via [`BitBuffer::write_byte`], with a final partial
    /// [`BitBuffer::write_bit`] run for any bits left over. Resets the cursor to `start`
    /// afterwards. Fails if this buffer is read-only.
    pub fn fill(&mut self, v: u8, width: u32) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }

        let bit_count = self.bit_count();

        if width == 8 && self.start & 7 == 0 && bit_count & 7 == 0 {
            let start_byte = (self.start >> 3) as usize;
            let end_byte = (self.end >> 3) as usize;
            self.bytes[start_byte..end_byte].fill(v);
            self.zeroed = v == 0;
            self.modified.set(true);
            self.cursor = self.start;
            return Ok(());
        }

        self.cursor = self.start;
        let whole_units = bit_count / width;
        for _ in 0..whole_units {
            self.write_byte(v, width)?;
        }
        let remaining_bits = bit_count % width;
        for i in 0..remaining_bits {
            let bit = if i < 8 { (v >> (7 - i)) & 1 } else { 0 };
            self.write_bit(bit)?;
        }
        self.cursor = self.start;
        Ok(())
    }

    /// Moves the cursor by `delta` bits (positive forward, negative backward) relative to its
    /// current position, wrapping into `[start, end)`. Fails if `|delta|` exceeds the buffer's
    /// total bit count.
    pub fn adjust_bit_position(&mut self, delta: i64) -> Result<()> {
        let bit_count = self.bit_count() as i64;
        if delta.unsigned_abs() > bit_count as u64 {
            return invalid_argument("bitbuffer: position adjustment exceeds the buffer's size");
        }

        let mut relative = self.cursor as i64 - self.start as i64 + delta;
        while relative < 0 {
            relative += bit_count;
        }
        while relative >= bit_count {
            relative -= bit_count;
        }
        self.cursor = self.start + relative as u32;
        Ok(())
    }
}
