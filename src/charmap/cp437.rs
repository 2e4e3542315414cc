// Pomace
// Copyright (c) 2024-2026 The Pomace Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Code page 437, the IBM PC's original character set. Bytes `0x00..=0x7F` decode as ASCII,
//! control characters included; bytes `0x80..=0xFF` decode through [`tables::CP437_UPPER`].

use once_cell::sync::Lazy;

use super::tables::CP437_UPPER;

const SUBSTITUTE: char = '?';

fn forward(byte: u8) -> char {
    if byte < 0x80 {
        byte as char
    } else {
        CP437_UPPER[(byte - 0x80) as usize]
    }
}

/// Reverse lookup over the Basic Multilingual Plane: `REVERSE[c as usize]` is the CP437 byte
/// that decodes to code point `c`, or `-1` if no CP437 byte does.
static REVERSE: Lazy<Vec<i32>> = Lazy::new(|| {
    let mut table = vec![-1i32; 0x1_0000];
    for byte in 0u16..=0xFF {
        let c = forward(byte as u8);
        let slot = &mut table[c as usize];
        assert!(*slot == -1, "cp437: code point {c:?} already mapped before byte {byte:#04X}");
        *slot = byte as i32;
    }
    table
});

/// Decodes a CP437 byte string to a `String`. Total: every byte sequence decodes to a string of
/// equal length.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| forward(b)).collect()
}

/// Encodes a `&str` to CP437 bytes, substituting `?` for any code point CP437 cannot represent
/// and logging each substitution.
pub fn encode(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match REVERSE.get(c as usize).copied().unwrap_or(-1) {
            byte if byte >= 0 => byte as u8,
            _ => {
                log::warn!("cp437: {c:?} is not representable, substituting '?'");
                SUBSTITUTE as u8
            }
        })
        .collect()
}

/// Returns `true` if every character in `s` is representable in CP437 without substitution.
pub fn is_valid(s: &str) -> bool {
    s.chars().all(|c| REVERSE.get(c as usize).copied().unwrap_or(-1) >= 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_range_is_identity() {
        for byte in 0x00u8..=0x7F {
            assert_eq!(decode(&[byte]), (byte as char).to_string());
        }
    }

    #[test]
    fn test_upper_range_round_trips() {
        for byte in 0x80u16..=0xFF {
            let byte = byte as u8;
            let s = decode(&[byte]);
            assert_eq!(encode(&s), vec![byte]);
        }
    }

    #[test]
    fn test_decode_encode_round_trip() {
        // 0x87 is cedilla-c in CP437 ("ç"), 0x82 is "é".
        let bytes = [0x87, b'a', b'f', 0x82];
        let s = decode(&bytes);
        assert_eq!(s, "çafé");
        assert!(is_valid(&s));
        assert_eq!(encode(&s), bytes.to_vec());
    }

    #[test]
    fn test_unrepresentable_character_substitutes() {
        assert_eq!(encode("漢"), vec![b'?']);
        assert!(!is_valid("漢字"));
    }
}
