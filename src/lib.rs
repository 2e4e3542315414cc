// Pomace
// Copyright (c) 2024-2026 The Pomace Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pomace is a collection of the hard parts of working with vintage Apple II and classic Mac
//! media: checksums, legacy character sets, vintage timestamp encodings, a path glob matcher,
//! a bit-addressable circular buffer for GCR nibble images, a RIFF/WAVE reader, and an
//! Apple II cassette-audio demodulator.
//!
//! Each module stands on its own; nothing in this crate owns a file, a window, or a device.
//! Callers supply byte buffers and streams and are responsible for everything above that line.

pub mod bitbuffer;
pub mod cassette;
pub mod charmap;
pub mod checksum;
pub mod errors;
pub mod glob;
pub mod timestamp;
pub mod util;
pub mod wav;

pub use errors::{Error, Result};
