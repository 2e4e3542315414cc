// Pomace
// Copyright (c) 2024-2026 The Pomace Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The plain UNIX 32-bit signed seconds-since-1970 timestamp, as used by some archive and disk
//! image containers that embed a vintage file's modification time in host format rather than
//! one of the machine-native encodings.

use super::civil::civil_from_days;
use super::{validated, DateComponents, VintageDate};

/// `i32::MIN` is reserved as this format's "no date" sentinel rather than a legal 1901 instant,
/// matching the convention used by the containers that embed this field.
const NO_DATE: i32 = i32::MIN;

/// Decodes a UNIX 32-bit signed seconds count as UTC.
pub fn decode(seconds: i32) -> VintageDate {
    if seconds == NO_DATE {
        return VintageDate::NoDate;
    }

    let seconds = seconds as i64;
    let days = seconds.div_euclid(86_400);
    let time_of_day = seconds.rem_euclid(86_400);

    let (year, month, day) = civil_from_days(days);
    let hour = (time_of_day / 3600) as u32;
    let minute = ((time_of_day % 3600) / 60) as u32;
    let second = (time_of_day % 60) as u32;

    validated(year, month, day, hour, minute, second)
}

/// Encodes a UNIX 32-bit signed seconds count. Returns `None` if the result would not fit in an
/// `i32`, or would collide with the reserved [`NO_DATE`] sentinel.
pub fn encode(dc: &DateComponents) -> Option<i32> {
    let days = super::civil::days_from_civil(dc.year as i64, dc.month as u32, dc.day as u32);
    let seconds = days * 86_400 + dc.hour as i64 * 3600 + dc.minute as i64 * 60 + dc.second as i64;
    if seconds < i32::MIN as i64 || seconds > i32::MAX as i64 || seconds as i32 == NO_DATE {
        None
    } else {
        Some(seconds as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_min_is_no_date() {
        assert_eq!(decode(i32::MIN), VintageDate::NoDate);
    }

    #[test]
    fn test_epoch_round_trip() {
        let decoded = decode(0);
        assert_eq!(
            decoded,
            VintageDate::Local(DateComponents { year: 1970, month: 1, day: 1, hour: 0, minute: 0, second: 0 })
        );
        assert_eq!(encode(&decoded.components().unwrap()), Some(0));
    }

    #[test]
    fn test_negative_seconds_predate_epoch() {
        // One day before the epoch: 1969-12-31 00:00:00.
        let decoded = decode(-86_400);
        assert_eq!(
            decoded,
            VintageDate::Local(DateComponents { year: 1969, month: 12, day: 31, hour: 0, minute: 0, second: 0 })
        );
        assert_eq!(encode(&decoded.components().unwrap()), Some(-86_400));
    }

    #[test]
    fn test_known_fixture_round_trip() {
        // 2038-01-19 03:14:07, one second before the signed 32-bit rollover.
        let dc = DateComponents { year: 2038, month: 1, day: 19, hour: 3, minute: 14, second: 7 };
        let encoded = encode(&dc).unwrap();
        assert_eq!(encoded, i32::MAX);
        assert_eq!(decode(encoded).components().unwrap(), dc);
    }
}
