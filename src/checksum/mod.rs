// Pomace
// Copyright (c) 2024-2026 The Pomace Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `checksum` module provides the error-detecting codes used across vintage disk and tape
//! formats: CRC-32/ISO-HDLC (used by common archive containers) and three CRC-16 variants
//! (XMODEM, IBM-3740, and KERMIT).

mod crc16;
mod crc32;

pub use crc16::{Crc16Ibm3740, Crc16Kermit, Crc16Xmodem};
pub use crc32::Crc32IsoHdlc;

use std::io::Read;

use crate::errors::Result;

/// A `Checksum` observes a stream of bytes one at a time (or in bulk) and folds them into a
/// running accumulator of type `T`.
///
/// This is the same shape as this crate's streaming I/O monitors elsewhere: a checksum is
/// nothing more than a `Monitor` that happens to also expose its accumulated value.
pub trait Checksum<T> {
    /// Folds a single byte into the running checksum.
    fn process_byte(&mut self, byte: u8);

    /// Folds a slice of bytes into the running checksum.
    #[inline]
    fn process_buf_bytes(&mut self, buf: &[u8]) {
        for &byte in buf {
            self.process_byte(byte);
        }
    }

    /// Returns the checksum's current value.
    fn get(&self) -> T;
}

/// Folds every byte of `reader` into `checksum`, reading in 8 KiB chunks until EOF.
pub fn fold_stream<T, C, R>(checksum: &mut C, mut reader: R) -> Result<()>
where
    C: Checksum<T>,
    R: Read,
{
    let mut buf = [0u8; 8192];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        checksum.process_buf_bytes(&buf[..n]);
    }

    Ok(())
}
