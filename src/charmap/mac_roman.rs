// Pomace
// Copyright (c) 2024-2026 The Pomace Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The classic Mac OS Roman encoding, its "show control characters" display variant, and the
//! HFS case- and diacritic-insensitive filename ordering built on top of it.

use std::cmp::Ordering;

use once_cell::sync::Lazy;

use super::tables::{HFS_SORT_INDEX, MAC_ROMAN_UPPER};
use crate::util::ascii::fold_control_to_picture;

const SUBSTITUTE: char = '?';

/// Byte `0xDB` is the currency sign (`¤`) under the original 1984 mapping and the euro sign
/// (`€`) under the 1998 System 8.5 revision. Both code points encode back to `0xDB`.
const CURRENCY_SIGN: char = '\u{00A4}';
const EURO_SIGN: char = '\u{20AC}';

fn forward(byte: u8) -> char {
    if byte < 0x80 {
        byte as char
    } else {
        MAC_ROMAN_UPPER[(byte - 0x80) as usize]
    }
}

fn forward_show_control(byte: u8) -> char {
    fold_control_to_picture(forward(byte))
}

/// Reverse lookup over the Basic Multilingual Plane, aliasing both [`CURRENCY_SIGN`] and
/// [`EURO_SIGN`] to `0xDB` so text written under either Mac Roman revision round-trips.
static REVERSE: Lazy<Vec<i32>> = Lazy::new(|| {
    let mut table = vec![-1i32; 0x1_0000];
    for byte in 0u16..=0xFF {
        let c = forward(byte as u8);
        let slot = &mut table[c as usize];
        assert!(*slot == -1, "mac_roman: code point {c:?} already mapped before byte {byte:#04X}");
        *slot = byte as i32;
    }
    table[EURO_SIGN as usize] = 0xDB;
    table
});

/// Reverse lookup for the "show control" forward mapping, used by the four-character constant
/// conversion and the Unicode-string HFS comparer.
static REVERSE_SHOW_CONTROL: Lazy<Vec<i32>> = Lazy::new(|| {
    let mut table = vec![-1i32; 0x1_0000];
    for byte in 0u16..=0xFF {
        let c = forward_show_control(byte as u8);
        let slot = &mut table[c as usize];
        assert!(*slot == -1, "mac_roman: show-control point {c:?} already mapped before byte {byte:#04X}");
        *slot = byte as i32;
    }
    table[EURO_SIGN as usize] = 0xDB;
    table
});

/// Decodes a Mac OS Roman byte string to a `String`. `0xDB` decodes as the currency sign; use
/// [`decode_1998`] for text known to postdate the 1998 revision.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| forward(b)).collect()
}

/// Decodes a Mac OS Roman byte string, treating `0xDB` as the euro sign.
pub fn decode_1998(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b == 0xDB { EURO_SIGN } else { forward(b) })
        .collect()
}

/// Encodes a `&str` to Mac OS Roman bytes, substituting `?` for any unrepresentable code point
/// and logging each substitution. Both the currency sign and the euro sign encode to `0xDB`.
pub fn encode(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match REVERSE.get(c as usize).copied().unwrap_or(-1) {
            byte if byte >= 0 => byte as u8,
            _ => {
                log::warn!("mac_roman: {c:?} is not representable, substituting '?'");
                SUBSTITUTE as u8
            }
        })
        .collect()
}

/// Returns `true` if every character in `s` is representable in Mac OS Roman without
/// substitution.
pub fn is_valid(s: &str) -> bool {
    s.chars().all(|c| REVERSE.get(c as usize).copied().unwrap_or(-1) >= 0)
}

/// Decodes a byte string the way a vintage directory listing displays it: control bytes
/// (`0x00..=0x1F`, `0x7F`) fold to their Unicode "control picture" glyphs so an on-screen name
/// never contains a literal control character.
pub fn decode_show_control(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| forward_show_control(b)).collect()
}

/// Converts a packed four-character Mac OS type/creator code to its display string via the
/// "show control" forward table, so a non-printable tag byte still round-trips to something
/// displayable.
pub fn fourcc_to_string(code: u32) -> String {
    decode_show_control(&code.to_be_bytes())
}

/// Converts a four-character display string back to a packed Mac OS type/creator code. Returns
/// `None` if `s` is not exactly four characters or contains one not representable in the
/// "show control" mapping.
pub fn string_to_fourcc(s: &str) -> Option<u32> {
    let mut bytes = [0u8; 4];
    let mut chars = s.chars();
    for slot in bytes.iter_mut() {
        let c = chars.next()?;
        let byte = REVERSE_SHOW_CONTROL.get(c as usize).copied().unwrap_or(-1);
        if byte < 0 {
            return None;
        }
        *slot = byte as u8;
    }
    if chars.next().is_some() {
        return None;
    }
    Some(u32::from_be_bytes(bytes))
}

/// Compares two bytes under HFS's case- and diacritic-insensitive filename ordering. Bytes that
/// are case or diacritic variants of the same letter compare equal; otherwise ordering follows
/// [`HFS_SORT_INDEX`].
fn compare_byte(a: u8, b: u8) -> Ordering {
    HFS_SORT_INDEX[a as usize].cmp(&HFS_SORT_INDEX[b as usize])
}

/// Compares two byte strings the way HFS compares catalog file names: byte-by-byte under
/// [`compare_byte`], with the shorter string sorting first if one is a prefix of the other.
///
/// This is not the same as raw byte ordering: accented and differently-cased forms of the same
/// letter compare equal, so e.g. `"cafe"` and the Mac Roman bytes for `"CAFÉ"` compare equal
/// despite differing in every byte after the common prefix.
pub fn compare(a: &[u8], b: &[u8]) -> Ordering {
    for (&x, &y) in a.iter().zip(b.iter()) {
        match compare_byte(x, y) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    a.len().cmp(&b.len())
}

/// Compares two Unicode strings under HFS ordering by mapping each character through the
/// "show control" reverse table and delegating to [`compare`]. Returns `None` if either string
/// contains a character not representable in Mac OS Roman, show-control glyphs included.
pub fn compare_str(a: &str, b: &str) -> Option<Ordering> {
    let to_bytes = |s: &str| -> Option<Vec<u8>> {
        s.chars()
            .map(|c| {
                let byte = REVERSE_SHOW_CONTROL.get(c as usize).copied().unwrap_or(-1);
                (byte >= 0).then_some(byte as u8)
            })
            .collect()
    };
    Some(compare(&to_bytes(a)?, &to_bytes(b)?))
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
    fn test_euro_sign_alias() {
        assert_eq!(decode(&[0xDB]), CURRENCY_SIGN.to_string());
        assert_eq!(decode_1998(&[0xDB]), EURO_SIGN.to_string());
        assert_eq!(encode(&EURO_SIGN.to_string()), vec![0xDB]);
        assert_eq!(encode(&CURRENCY_SIGN.to_string()), vec![0xDB]);
    }

    #[test]
    fn test_show_control_folds_controls() {
        assert_eq!(decode_show_control(&[0x00]), "\u{2400}");
        assert_eq!(decode_show_control(&[0x7F]), "\u{2421}");
        assert_eq!(decode_show_control(b"A"), "A");
    }

    #[test]
    fn test_fourcc_round_trip() {
        let code = string_to_fourcc("TEXT").unwrap();
        assert_eq!(code, 0x5445_5854);
        assert_eq!(fourcc_to_string(code), "TEXT");

        // A non-printable tag byte still round-trips through the control-picture glyph.
        let weird = 0x0000_0041u32; // b'\0\0\0A'
        let s = fourcc_to_string(weird);
        assert_eq!(string_to_fourcc(&s), Some(weird));
    }

    #[test]
    fn test_fourcc_requires_exactly_four_chars() {
        assert_eq!(string_to_fourcc("TEX"), None);
        assert_eq!(string_to_fourcc("TEXTS"), None);
    }

    #[test]
    fn test_hfs_case_and_diacritic_insensitivity() {
        assert_eq!(compare_byte(b'a', b'A'), Ordering::Equal);
        assert_eq!(compare_byte(b'A', 0x80 /* Ä */), Ordering::Equal);
        assert_eq!(compare_byte(b'A', 0x87 /* á */), Ordering::Equal);
    }

    #[test]
    fn test_hfs_ordinal_sign_flip() {
        // Ordinal byte comparison says Ä (0x80) > b (0x62); HFS ordering says otherwise,
        // because Ä folds to A's rank, which precedes B's.
        assert!(0x80u8 > b'b');
        assert_eq!(compare_byte(0x80, b'b'), Ordering::Less);
    }

    #[test]
    fn test_compare_str_accent_and_case_insensitive() {
        assert_eq!(compare_str("cafe", "CAFE"), Some(Ordering::Equal));
        assert_eq!(compare_str("café", "CAFÉ"), Some(Ordering::Equal));
    }

    #[test]
    fn test_compare_str_prefix_orders_shorter_first() {
        assert_eq!(compare_str("cat", "catalog"), Some(Ordering::Less));
    }

    #[test]
    fn test_compare_str_rejects_unrepresentable() {
        assert_eq!(compare_str("日本語", "cafe"), None);
    }
}
