// Pomace
// Copyright (c) 2024-2026 The Pomace Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Legacy 8-bit character sets: code page 437 (the IBM PC's original character set) and Mac OS
//! Roman, plus the HFS case- and diacritic-insensitive filename ordering built on top of the
//! latter.
//!
//! Both encodings are total on decode (every byte maps to some character) and partial on
//! encode (not every Unicode character has a representation); `encode` substitutes `?` and
//! logs a warning rather than failing, matching how these encodings behave in the vintage
//! tooling that still writes them today.

pub mod cp437;
pub mod mac_roman;

mod tables;
