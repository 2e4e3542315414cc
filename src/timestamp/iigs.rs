// Pomace
// Copyright (c) 2024-2026 The Pomace Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Apple IIgs Toolbox's 8-byte little-endian `DateTimeRec`: second, minute, hour,
//! year-1900, day-1, month-1, reserved, weekday (`1 == Sunday`).

use super::civil::weekday_sun0;
use super::{validated, DateComponents, VintageDate};

/// Decodes an 8-byte `DateTimeRec`. All zero bytes is the format's "no date" sentinel.
pub fn decode(bytes: [u8; 8]) -> VintageDate {
    if bytes == [0u8; 8] {
        return VintageDate::NoDate;
    }

    let second = bytes[0] as u32;
    let minute = bytes[1] as u32;
    let hour = bytes[2] as u32;
    let year_field = bytes[3] as u32;
    let day = bytes[4] as u32 + 1;
    let month = bytes[5] as u32 + 1;

    // Fields 0..=39 are a post-2000 convention identical in spirit to ProDOS's.
    let year = if year_field < 40 { 2000 + year_field as i64 } else { 1900 + year_field as i64 };

    validated(year, month, day, hour, minute, second)
}

/// Encodes a `DateTimeRec`. Returns `None` if `dc.year` is outside the representable range
/// (`1940..=2155`, the set that actually round-trips — see `DESIGN.md`).
pub fn encode(dc: &DateComponents) -> Option<[u8; 8]> {
    let year = dc.year as i64;
    if !(1940..=2155).contains(&year) {
        return None;
    }
    let year_field = (year - 1900) as u8;

    let weekday = weekday_sun0(year, dc.month as u32, dc.day as u32) as u8 + 1;

    Some([
        dc.second,
        dc.minute,
        dc.hour,
        year_field,
        dc.day - 1,
        dc.month - 1,
        0,
        weekday,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_zero_is_no_date() {
        assert_eq!(decode([0; 8]), VintageDate::NoDate);
    }

    #[test]
    fn test_known_fixture_round_trip() {
        // 1993-08-15 10:20:30, a Sunday.
        let dc = DateComponents { year: 1993, month: 8, day: 15, hour: 10, minute: 20, second: 30 };
        let encoded = encode(&dc).unwrap();
        assert_eq!(encoded, [30, 20, 10, 93, 14, 7, 0, 1]);
        assert_eq!(decode(encoded).components().unwrap(), dc);
    }

    #[test]
    fn test_low_year_field_remaps_to_2000s() {
        let bytes = [0, 0, 0, 24, 0, 0, 0, 1]; // year field 24 -> 2024-01-01
        assert_eq!(decode(bytes).components().unwrap().year, 2024);
    }

    #[test]
    fn test_year_out_of_range_does_not_encode() {
        let dc = DateComponents { year: 1899, month: 1, day: 1, hour: 0, minute: 0, second: 0 };
        assert_eq!(encode(&dc), None);
    }
}
