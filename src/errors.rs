// Pomace
// Copyright (c) 2024-2026 The Pomace Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type shared by every module in this crate.
//!
//! Two classes of failure exist in this crate and only one of them is represented here:
//!
//! * Malformed input data (a truncated WAV file, an out-of-range glob separator count) is
//!   reported through [`Error`] and [`Result`].
//! * A broken invariant in this crate's own static tables (a character-map collision, an
//!   incomplete HFS sort table) is a bug in this crate, not in caller data, and is raised as a
//!   panic during lazy table construction rather than through this error type.
//!
//! "No date" and "invalid date" are likewise not errors: they are sentinel variants of
//! [`crate::timestamp::VintageDate`], since a vintage timestamp field being zero or
//! out-of-range is an entirely ordinary outcome that callers branch on, not a failure.

use std::fmt;
use std::io;
use std::result;

/// `Error` enumerates every way a fallible operation in this crate can fail.
#[derive(Debug)]
pub enum Error {
    /// A caller passed an out-of-range offset, width, or count; an empty sequence where one is
    /// forbidden; a buffer too small for the requested operation; or a position adjustment that
    /// exceeds the buffer's size. This is a caller bug, not a data error.
    InvalidArgument(&'static str),
    /// A mutating call was attempted on a buffer flagged read-only.
    ReadOnly,
    /// An unsupported container feature, codec, or bit depth was encountered.
    NotSupported(&'static str),
    /// The stream ended before a fixed-size read could complete.
    EndOfStream,
    /// A container (currently only WAV/RIFF) failed its signature or size validation.
    MalformedContainer(&'static str),
    /// An I/O error occurred while reading or writing a stream.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::ReadOnly => write!(f, "buffer is read-only"),
            Error::NotSupported(feature) => write!(f, "not supported: {}", feature),
            Error::EndOfStream => write!(f, "unexpected end of stream"),
            Error::MalformedContainer(msg) => write!(f, "malformed container: {}", msg),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

/// A specialized `Result` type for fallible operations in this crate.
pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create an invalid-argument error.
pub fn invalid_argument<T>(msg: &'static str) -> Result<T> {
    Err(Error::InvalidArgument(msg))
}

/// Convenience function to create a not-supported error.
pub fn unsupported_error<T>(feature: &'static str) -> Result<T> {
    Err(Error::NotSupported(feature))
}

/// Convenience function to create a malformed-container error.
pub fn malformed_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::MalformedContainer(msg))
}
