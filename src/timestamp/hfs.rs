// Pomace
// Copyright (c) 2024-2026 The Pomace Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HFS's 32-bit unsigned seconds-since-1904 timestamp.
//!
//! The classic Mac OS never stored a time zone alongside this value: the seconds count was
//! always computed, and always displayed, against whatever local clock face the machine
//! happened to be set to. To preserve that literal clock face across a DST transition (a
//! property real HFS volumes depend on), this codec does not attempt to interpret the value as
//! UTC and convert to a caller's zone — it treats the seconds count as elapsed time against a
//! fixed local epoch and reads the calendar straight off it.

use super::civil::{civil_from_days, days_from_civil};
use super::{validated, DateComponents, VintageDate};

/// Seconds between the HFS epoch (1904-01-01 00:00:00) and the UNIX epoch (1970-01-01
/// 00:00:00).
const HFS_TO_UNIX_EPOCH_OFFSET: i64 = 2_082_844_800;

/// Decodes an HFS timestamp. Zero is the format's reserved "no date" sentinel.
pub fn decode(seconds: u32) -> VintageDate {
    if seconds == 0 {
        return VintageDate::NoDate;
    }

    let elapsed = seconds as i64 - HFS_TO_UNIX_EPOCH_OFFSET;
    let days = elapsed.div_euclid(86_400);
    let time_of_day = elapsed.rem_euclid(86_400);

    let (year, month, day) = civil_from_days(days);
    let hour = (time_of_day / 3600) as u32;
    let minute = ((time_of_day % 3600) / 60) as u32;
    let second = (time_of_day % 60) as u32;

    validated(year, month, day, hour, minute, second)
}

/// Encodes an HFS timestamp. Returns `None` if the resulting seconds count would not fit in a
/// `u32` (roughly, years before 1904 or after 2040).
pub fn encode(dc: &DateComponents) -> Option<u32> {
    let days = days_from_civil(dc.year as i64, dc.month as u32, dc.day as u32);
    let seconds = days * 86_400 + dc.hour as i64 * 3600 + dc.minute as i64 * 60 + dc.second as i64;
    let hfs_seconds = seconds + HFS_TO_UNIX_EPOCH_OFFSET;
    if hfs_seconds <= 0 || hfs_seconds > u32::MAX as i64 {
        None
    } else {
        Some(hfs_seconds as u32)
    }
}
