// Pomace
// Copyright (c) 2024-2026 The Pomace Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A minimal RIFF/WAVE header parser and normalized-float sample reader, just capable enough to
//! feed the cassette demodulator: a `fmt ` subchunk, a `data` subchunk, and nothing else this
//! crate cares about.

use std::io::Read;

use crate::errors::{malformed_error, unsupported_error, Error, Result};
use crate::util::bits::{get_u16le, get_u32le, tag_to_u32};

const RIFF_TAG: u32 = 0x5249_4646; // "RIFF"
const WAVE_TAG: u32 = 0x5741_5645; // "WAVE"
const FMT_TAG: u32 = 0x666D_7420; // "fmt "
const DATA_TAG: u32 = 0x6461_7461; // "data"

/// WAVE format tag `1`: linear PCM. This is the only format this reader decodes samples from;
/// other tags parse successfully as a header but refuse [`WavReader::get_samples`].
const WAVE_FORMAT_PCM: u16 = 1;

/// The parsed `fmt ` subchunk and the location of the `data` subchunk that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavDescriptor {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_offset: u32,
    pub data_length: u32,
}

impl WavDescriptor {
    fn bytes_per_frame(&self) -> u32 {
        self.block_align as u32
    }
}

/// Reads a RIFF/WAVE container from a borrowed, forward-only stream: the 12-byte RIFF header,
/// the `fmt ` subchunk, and subchunks up to and including `data`. Unrecognized subchunks in
/// between are skipped.
pub struct WavReader<'a, R: Read> {
    stream: &'a mut R,
    descriptor: WavDescriptor,
    bytes_remaining: u32,
}

impl<'a, R: Read> WavReader<'a, R> {
    /// Parses the RIFF/WAVE header from `stream`, leaving the stream positioned at the first
    /// byte of sample data.
    pub fn open(stream: &'a mut R) -> Result<Self> {
        let mut riff_header = [0u8; 12];
        stream.read_exact(&mut riff_header).map_err(|_| Error::MalformedContainer("truncated RIFF header"))?;

        if get_u32le_be(&riff_header, 0) != RIFF_TAG {
            return malformed_error("wav: missing 'RIFF' signature");
        }
        if get_u32le_be(&riff_header, 8) != WAVE_TAG {
            return malformed_error("wav: missing 'WAVE' form type");
        }

        let mut format_tag = 0u16;
        let mut channels = 0u16;
        let mut sample_rate = 0u32;
        let mut avg_bytes_per_sec = 0u32;
        let mut block_align = 0u16;
        let mut bits_per_sample = 0u16;
        let mut fmt_seen = false;
        let mut data_offset = 0u32;
        let mut data_length = 0u32;
        let mut consumed = 12u32;

        loop {
            let mut chunk_header = [0u8; 8];
            match read_fully_or_eof(stream, &mut chunk_header)? {
                None => break,
                Some(()) => {}
            }
            consumed += 8;

            let tag = get_u32le_be(&chunk_header, 0);
            let len = get_u32le(&chunk_header, 4);

            if tag == FMT_TAG {
                if !(16..=128).contains(&len) {
                    return malformed_error("wav: 'fmt ' subchunk has an implausible length");
                }
                let mut body = vec![0u8; len as usize];
                stream.read_exact(&mut body).map_err(|_| Error::MalformedContainer("truncated 'fmt ' subchunk"))?;

                format_tag = get_u16le(&body, 0);
                channels = get_u16le(&body, 2);
                sample_rate = get_u32le(&body, 4);
                avg_bytes_per_sec = get_u32le(&body, 8);
                block_align = get_u16le(&body, 12);

                if format_tag == WAVE_FORMAT_PCM {
                    bits_per_sample = get_u16le(&body, 14);
                    if !(1..=256).contains(&bits_per_sample) {
                        return malformed_error("wav: 'fmt ' subchunk has an out-of-range bits-per-sample");
                    }
                }

                if channels == 0 {
                    return malformed_error("wav: 'fmt ' subchunk declares zero channels");
                }
                if sample_rate == 0 {
                    return malformed_error("wav: 'fmt ' subchunk declares a zero sample rate");
                }

                let expected_byte_rate = sample_rate.saturating_mul(channels as u32).saturating_mul(bits_per_sample as u32 / 8);
                if avg_bytes_per_sec != expected_byte_rate {
                    log::warn!(
                        "wav: average byte rate {avg_bytes_per_sec} does not match channels*rate*bytes/sample ({expected_byte_rate})"
                    );
                }
                let expected_block_align = channels * (bits_per_sample / 8).max(1);
                if block_align != expected_block_align {
                    log::warn!("wav: block align {block_align} does not match channels*bytes/sample ({expected_block_align})");
                }

                fmt_seen = true;
                consumed += len;
                if len & 1 == 1 {
                    skip_bytes(stream, 1)?;
                    consumed += 1;
                }
            } else if tag == DATA_TAG {
                if !fmt_seen {
                    return malformed_error("wav: 'data' subchunk appeared before 'fmt '");
                }
                data_offset = consumed;
                data_length = len;
                consumed += len;
                break;
            } else {
                skip_bytes(stream, len as u64)?;
                consumed += len;
                if len & 1 == 1 {
                    skip_bytes(stream, 1)?;
                    consumed += 1;
                }
            }
        }

        if !fmt_seen {
            return malformed_error("wav: missing 'fmt ' subchunk");
        }

        if format_tag == WAVE_FORMAT_PCM {
            let frame_size = (channels as u32) * (bits_per_sample as u32 / 8).max(1);
            if frame_size > 0 {
                data_length -= data_length % frame_size;
            }
        }

        let descriptor = WavDescriptor {
            format_tag,
            channels,
            sample_rate,
            avg_bytes_per_sec,
            block_align,
            bits_per_sample,
            data_offset,
            data_length,
        };

        Ok(WavReader { stream, bytes_remaining: descriptor.data_length, descriptor })
    }

    /// The parsed header.
    pub fn descriptor(&self) -> &WavDescriptor {
        &self.descriptor
    }

    /// Reads up to `out.len()` normalized float samples from channel 0, clamped by the number
    /// of data bytes remaining. Returns `Ok(0)` at end of stream. Samples are mapped into
    /// `[-1, 1)`: unsigned 8-bit samples via `(x - 128) / 128`, signed 16-bit via `x / 32768`,
    /// signed 32-bit via `x / 2147483648`.
    pub fn get_samples(&mut self, out: &mut [f32]) -> Result<usize> {
        if self.descriptor.format_tag != WAVE_FORMAT_PCM {
            return unsupported_error("wav: only PCM sample data can be decoded to floats");
        }

        let bytes_per_sample = match self.descriptor.bits_per_sample {
            8 => 1u32,
            16 => 2,
            32 => 4,
            _ => return unsupported_error("wav: unsupported bit depth for float sample extraction"),
        };

        let frame_size = self.descriptor.bytes_per_frame();
        let skip_per_frame = frame_size.saturating_sub(bytes_per_sample) as u64;

        let mut sample_buf = [0u8; 4];
        let mut produced = 0usize;

        for slot in out.iter_mut() {
            if self.bytes_remaining < bytes_per_sample {
                break;
            }

            self.stream.read_exact(&mut sample_buf[..bytes_per_sample as usize])?;
            self.bytes_remaining -= bytes_per_sample;

            *slot = match bytes_per_sample {
                1 => (sample_buf[0] as f32 - 128.0) / 128.0,
                2 => (get_u16le(&sample_buf, 0) as i16) as f32 / 32768.0,
                4 => (get_u32le(&sample_buf, 0) as i32) as f32 / 2_147_483_648.0,
                _ => unreachable!(),
            };

            if skip_per_frame > 0 {
                if self.bytes_remaining < skip_per_frame as u32 {
                    self.bytes_remaining = 0;
                } else {
                    skip_bytes(self.stream, skip_per_frame)?;
                    self.bytes_remaining -= skip_per_frame as u32;
                }
            }

            produced += 1;
        }

        Ok(produced)
    }
}

/// Reads a big-endian `u32` at `offset`, for comparing 4-byte ASCII tags as integers.
fn get_u32le_be(buf: &[u8], offset: usize) -> u32 {
    tag_to_u32([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

/// Reads into `buf`, returning `Ok(None)` if the stream was already at EOF, or propagating any
/// other I/O failure (including a short read partway through `buf`, which is malformed input).
fn read_fully_or_eof<R: Read>(stream: &mut R, buf: &mut [u8]) -> Result<Option<()>> {
    let mut total = 0usize;
    while total < buf.len() {
        let n = stream.read(&mut buf[total..])?;
        if n == 0 {
            return if total == 0 {
                Ok(None)
            } else {
                Err(Error::EndOfStream)
            };
        }
        total += n;
    }
    Ok(Some(()))
}

fn skip_bytes<R: Read>(stream: &mut R, mut count: u64) -> Result<()> {
    let mut sink = [0u8; 256];
    while count > 0 {
        let chunk = count.min(sink.len() as u64) as usize;
        stream.read_exact(&mut sink[..chunk])?;
        count -= chunk as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn minimal_pcm_wav(sample_rate: u32, bits_per_sample: u16, channels: u16, data: &[u8]) -> Vec<u8> {
        let block_align = channels * (bits_per_sample / 8);
        let byte_rate = sample_rate * block_align as u32;
        let fmt_len = 16u32;
        let data_len = data.len() as u32;
        let riff_len = 4 + (8 + fmt_len) + (8 + data_len);

        let mut buf = Vec::new();
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&riff_len.to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&fmt_len.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&channels.to_le_bytes());
        buf.extend_from_slice(&sample_rate.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_len.to_le_bytes());
        buf.extend_from_slice(data);
        buf
    }

    #[test]
    fn test_parses_minimal_header() {
        let data = vec![0u8; 10];
        let file = minimal_pcm_wav(22_050, 16, 1, &data);
        let mut cursor = Cursor::new(file);
        let reader = WavReader::open(&mut cursor).unwrap();

        let d = reader.descriptor();
        assert_eq!(d.sample_rate, 22_050);
        assert_eq!(d.bits_per_sample, 16);
        assert_eq!(d.channels, 1);
        assert_eq!(d.data_length, 10);
    }

    #[test]
    fn test_rejects_bad_signature() {
        let mut bad = minimal_pcm_wav(8000, 8, 1, &[0, 0]);
        bad[0] = b'X';
        let mut cursor = Cursor::new(bad);
        assert!(matches!(WavReader::open(&mut cursor), Err(Error::MalformedContainer(_))));
    }

    #[test]
    fn test_skips_unknown_subchunks_before_data() {
        let mut file = Vec::new();
        let data = vec![1u8, 2, 3, 4];
        let base = minimal_pcm_wav(8000, 8, 1, &data);
        // Splice a "JUNK" chunk in right after the fmt subchunk (byte offset 36 in our minimal layout).
        file.extend_from_slice(&base[..36]);
        file.extend_from_slice(b"JUNK");
        file.extend_from_slice(&4u32.to_le_bytes());
        file.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);
        file.extend_from_slice(&base[36..]);

        // Patch the RIFF size for the extra 12 bytes we inserted.
        let new_riff_len = (file.len() - 8) as u32;
        file[4..8].copy_from_slice(&new_riff_len.to_le_bytes());

        let mut cursor = Cursor::new(file);
        let reader = WavReader::open(&mut cursor).unwrap();
        assert_eq!(reader.descriptor().data_length, 4);
    }

    #[test]
    fn test_get_samples_8bit_mapping() {
        let data = vec![0u8, 128, 255];
        let file = minimal_pcm_wav(8000, 8, 1, &data);
        let mut cursor = Cursor::new(file);
        let mut reader = WavReader::open(&mut cursor).unwrap();

        let mut out = [0f32; 3];
        let n = reader.get_samples(&mut out).unwrap();
        assert_eq!(n, 3);
        assert!((out[0] - (-1.0)).abs() < 1e-6);
        assert!((out[1] - 0.0).abs() < 1e-6);
        assert!((out[2] - (127.0 / 128.0)).abs() < 1e-6);
    }

    #[test]
    fn test_get_samples_16bit_mapping_and_eof() {
        let mut data = Vec::new();
        data.extend_from_slice(&0i16.to_le_bytes());
        data.extend_from_slice(&(-32768i16).to_le_bytes());
        data.extend_from_slice(&32767i16.to_le_bytes());
        let file = minimal_pcm_wav(8000, 16, 1, &data);
        let mut cursor = Cursor::new(file);
        let mut reader = WavReader::open(&mut cursor).unwrap();

        let mut out = [0f32; 5];
        let n = reader.get_samples(&mut out).unwrap();
        assert_eq!(n, 3);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - (-1.0)).abs() < 1e-6);

        let mut more = [0f32; 1];
        assert_eq!(reader.get_samples(&mut more).unwrap(), 0);
    }

    #[test]
    fn test_stereo_stride_only_returns_channel_zero() {
        // Two 16-bit channels, 2 frames: (L=100, R=999), (L=200, R=999).
        let mut data = Vec::new();
        for &l in &[100i16, 200] {
            data.extend_from_slice(&l.to_le_bytes());
            data.extend_from_slice(&999i16.to_le_bytes());
        }
        let file = minimal_pcm_wav(8000, 16, 2, &data);
        let mut cursor = Cursor::new(file);
        let mut reader = WavReader::open(&mut cursor).unwrap();

        let mut out = [0f32; 2];
        let n = reader.get_samples(&mut out).unwrap();
        assert_eq!(n, 2);
        assert!((out[0] - 100.0 / 32768.0).abs() < 1e-6);
        assert!((out[1] - 200.0 / 32768.0).abs() < 1e-6);
    }
}
