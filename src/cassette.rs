// Pomace
// Copyright (c) 2024-2026 The Pomace Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An Apple II cassette-audio demodulator: turns a stream of floating-point PCM samples into
//! [`CassetteChunk`]s, the way the Apple II's own cassette ROM routine would have read them off
//! tape, just in software and from a WAV capture instead of the cassette port.
//!
//! A cassette chunk is a 770 Hz lead-in tone, a short sync cycle, a run of 0/1 data bits, and a
//! trailing XOR checksum byte. Everything here is two nested state machines: an inner one that
//! turns the raw waveform into timed half-cycle events (two interchangeable algorithms), and an
//! outer one that turns timed half-cycles into bits, bytes, and chunks.

/// The trend-detection flavor used by [`SampleProcessor::PeakToPeak`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakKind {
    Sharp,
    Round,
    Shallow,
}

/// The low-level waveform-to-half-cycle extractor. A tagged enum rather than a trait object:
/// this is matched once per sample in the decoder's hottest loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleProcessor {
    ZeroCrossing,
    PeakToPeak(PeakKind),
}

const PEAK_THRESHOLD: f32 = 0.20;

/// Base amplitude step, per sample, that a trend must fail to keep making (in `InTransition`)
/// before `Round` calls the peak; `Sharp` uses zero tolerance and `Shallow` reuses `Round`'s
/// transition rule but a quartered peak threshold.
const ROUND_TRANSITION_SCALE: f32 = 1.0 / 8000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InnerState {
    Initial0,
    Initial1,
    InTransition,
    AtPeak,
}

/// Extracts timed half-cycle events (in microseconds) from a sample stream.
struct HalfCycleExtractor {
    processor: SampleProcessor,
    sample_rate: u32,
    state: InnerState,
    prev_sample: f32,
    positive_trend: bool,
    last_event_index: i64,
    peak_value: f32,
}

/// One emitted half-cycle: its duration in microseconds and the sample index it's anchored to
/// (which may be the previous sample, per the peak-to-peak algorithm's low-sample-rate fixup).
struct HalfCycleEvent {
    micros: u32,
    sample_index: i64,
}

impl HalfCycleExtractor {
    fn new(processor: SampleProcessor, sample_rate: u32) -> Self {
        HalfCycleExtractor {
            processor,
            sample_rate,
            state: InnerState::Initial0,
            prev_sample: 0.0,
            positive_trend: true,
            last_event_index: -1,
            peak_value: 0.0,
        }
    }

    fn us_per_sample(&self) -> f64 {
        1_000_000.0 / self.sample_rate as f64
    }

    /// Feeds one more sample at `index`, returning a half-cycle event if one completed.
    fn push(&mut self, index: i64, sample: f32) -> Option<HalfCycleEvent> {
        let event = match self.processor {
            SampleProcessor::ZeroCrossing => self.push_zero_crossing(index, sample),
            SampleProcessor::PeakToPeak(kind) => self.push_peak_to_peak(index, sample, kind),
        };
        self.prev_sample = sample;
        event
    }

    fn push_zero_crossing(&mut self, index: i64, sample: f32) -> Option<HalfCycleEvent> {
        if self.last_event_index < 0 {
            self.last_event_index = index;
            return None;
        }

        let sign_changed = (self.prev_sample < 0.0 && sample >= 0.0) || (self.prev_sample >= 0.0 && sample < 0.0);
        if !sign_changed {
            return None;
        }

        let crossing_index = if self.prev_sample.abs() < sample.abs() { index - 1 } else { index };
        let duration = (crossing_index - self.last_event_index) as f64 * self.us_per_sample();
        self.last_event_index = crossing_index;

        Some(HalfCycleEvent { micros: duration.round() as u32, sample_index: crossing_index })
    }

    fn push_peak_to_peak(&mut self, index: i64, sample: f32, kind: PeakKind) -> Option<HalfCycleEvent> {
        let peak_threshold = match kind {
            PeakKind::Shallow => PEAK_THRESHOLD / 4.0,
            PeakKind::Sharp | PeakKind::Round => PEAK_THRESHOLD,
        };
        let transition_threshold = match kind {
            PeakKind::Sharp => 0.0,
            PeakKind::Round | PeakKind::Shallow => self.sample_rate as f32 * ROUND_TRANSITION_SCALE,
        };

        match self.state {
            InnerState::Initial0 => {
                self.peak_value = sample;
                self.last_event_index = index;
                self.state = InnerState::Initial1;
                None
            }
            InnerState::Initial1 => {
                self.positive_trend = sample >= self.peak_value;
                self.peak_value = sample;
                self.state = InnerState::InTransition;
                None
            }
            InnerState::InTransition => {
                let advancing =
                    if self.positive_trend { sample >= self.peak_value - transition_threshold } else { sample <= self.peak_value + transition_threshold };

                if advancing {
                    if (self.positive_trend && sample > self.peak_value) || (!self.positive_trend && sample < self.peak_value) {
                        self.peak_value = sample;
                    }
                    None
                } else {
                    // The trend failed to advance: the previous sample was the peak, so the event
                    // is anchored there rather than at the current (already receding) sample.
                    let event_index = index - 1;
                    let duration = (event_index - self.last_event_index) as f64 * self.us_per_sample();
                    self.last_event_index = event_index;
                    self.peak_value = self.prev_sample;
                    self.state = InnerState::AtPeak;
                    Some(HalfCycleEvent { micros: duration.round() as u32, sample_index: event_index })
                }
            }
            InnerState::AtPeak => {
                let moved_off_peak = (sample - self.peak_value).abs() > peak_threshold;
                if moved_off_peak {
                    self.positive_trend = sample < self.peak_value;
                    self.peak_value = sample;
                    self.state = InnerState::InTransition;
                }
                None
            }
        }
    }
}

/// A window check: does `value` lie within `center ± tolerance`?
fn within(value: u32, center: u32, tolerance: u32) -> bool {
    let lo = center.saturating_sub(tolerance);
    let hi = center + tolerance;
    (lo..=hi).contains(&value)
}

const LEAD_IN_HALF: u32 = 650;
const LEAD_IN_HALF_TOLERANCE: u32 = 108;
const LEAD_IN_FULL_TOLERANCE: u32 = 216;

const SHORT0_HALF: u32 = 200;
const SHORT0_TOLERANCE: u32 = 150;

const BIT0_HALF: u32 = 250;
const BIT0_TOLERANCE: u32 = 94;
const BIT1_HALF: u32 = 500;
const BIT1_TOLERANCE: u32 = 94;

/// Full-cycle tone count threshold: `1540 / 2`, about one second of 770 Hz tone.
const LEAD_IN_COUNT_THRESHOLD: u32 = 770;

const MAX_CHUNK_BYTES: usize = 512 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OuterState {
    ScanFor770Start,
    Scanning770,
    ScanForShort0,
    Short0B,
    ReadData,
    EndReached,
}

/// A decoded cassette data chunk: one tape-recorded file, framed by lead-in tone and a trailing
/// checksum byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CassetteChunk {
    /// The payload bytes, with the trailing checksum byte removed.
    pub data: Vec<u8>,
    /// The checksum byte as read from the tape.
    pub read_checksum: u8,
    /// The checksum recomputed by XOR-folding `0xFF` with every data byte and `read_checksum`.
    /// Zero means the chunk checksums correctly.
    pub calc_checksum: u8,
    /// `true` if decoding ended mid-byte (the bit accumulator was not back down to its sentinel
    /// value of `1` when the chunk ended).
    pub bad_end: bool,
    pub start_sample: i64,
    pub end_sample: i64,
}

/// Decodes [`CassetteChunk`]s from a sample source, one sample at a time.
///
/// Construct with [`CassetteDecoder::new`] and either iterate it directly (it implements
/// [`Iterator`]) or call [`CassetteDecoder::decode_one`] in a loop. [`CassetteDecoder::stop_after_first`]
/// requests cancellation after the first emitted chunk.
pub struct CassetteDecoder<I> {
    samples: I,
    extractor: HalfCycleExtractor,
    outer_state: OuterState,
    sample_index: i64,
    prev_half_micros: Option<u32>,
    lead_in_count: u32,
    data_start: i64,
    data_end: i64,
    bit_accumulator: u32,
    output: Vec<u8>,
    checksum: u8,
    first_only: bool,
    done: bool,
}

impl<I: Iterator<Item = f32>> CassetteDecoder<I> {
    pub fn new(samples: I, sample_rate: u32, processor: SampleProcessor) -> Self {
        CassetteDecoder {
            samples,
            extractor: HalfCycleExtractor::new(processor, sample_rate),
            outer_state: OuterState::ScanFor770Start,
            sample_index: -1,
            prev_half_micros: None,
            lead_in_count: 0,
            data_start: 0,
            data_end: 0,
            bit_accumulator: 1,
            output: Vec::new(),
            checksum: 0xFF,
            first_only: false,
            done: false,
        }
    }

    /// Requests that the iterator stop emitting further chunks after the next one.
    pub fn stop_after_first(&mut self) {
        self.first_only = true;
    }

    fn reset_chunk_state(&mut self) {
        self.outer_state = OuterState::ScanFor770Start;
        self.prev_half_micros = None;
        self.lead_in_count = 0;
        self.bit_accumulator = 1;
        self.output.clear();
        self.checksum = 0xFF;
    }

    /// Feeds samples into the half-cycle extractor and the outer state machine until a chunk
    /// completes or the sample source is exhausted. Returns `None` when no more chunks can be
    /// produced.
    pub fn decode_one(&mut self) -> Option<CassetteChunk> {
        if self.done {
            return None;
        }

        loop {
            let sample = match self.samples.next() {
                Some(s) => s,
                None => {
                    self.done = true;
                    return None;
                }
            };
            self.sample_index += 1;

            let Some(event) = self.extractor.push(self.sample_index, sample) else { continue };

            let full_cycle = match self.prev_half_micros.take() {
                Some(prev) => Some(prev + event.micros),
                None => {
                    self.prev_half_micros = Some(event.micros);
                    None
                }
            };

            if let Some(chunk) = self.advance_outer(event.micros, full_cycle, event.sample_index) {
                if self.first_only {
                    self.done = true;
                }
                return Some(chunk);
            }
        }
    }

    fn advance_outer(&mut self, half_micros: u32, full_cycle: Option<u32>, sample_index: i64) -> Option<CassetteChunk> {
        match self.outer_state {
            OuterState::ScanFor770Start => {
                if let Some(full) = full_cycle {
                    if within(full, LEAD_IN_HALF * 2, LEAD_IN_FULL_TOLERANCE) {
                        self.outer_state = OuterState::Scanning770;
                        self.lead_in_count = 1;
                    }
                    self.prev_half_micros = None;
                }
                None
            }
            OuterState::Scanning770 => {
                if let Some(full) = full_cycle {
                    if within(full, LEAD_IN_HALF * 2, LEAD_IN_FULL_TOLERANCE) {
                        self.lead_in_count += 1;
                        if self.lead_in_count > LEAD_IN_COUNT_THRESHOLD {
                            self.outer_state = OuterState::ScanForShort0;
                        }
                    } else {
                        // Any run that breaks before reaching the threshold resets silently per
                        // spec, whether it was a handful of cycles or most of the way there.
                        self.outer_state = OuterState::ScanFor770Start;
                        self.lead_in_count = 0;
                    }
                    self.prev_half_micros = None;
                }
                None
            }
            OuterState::ScanForShort0 => {
                if within(half_micros, SHORT0_HALF, SHORT0_TOLERANCE) {
                    self.outer_state = OuterState::Short0B;
                    // Anchor this half so the next half pairs with it into the full cycle
                    // Short0B checks, instead of starting a fresh pairing from scratch.
                    self.prev_half_micros = Some(half_micros);
                } else if let Some(full) = full_cycle {
                    if within(full, LEAD_IN_HALF * 2, LEAD_IN_FULL_TOLERANCE) {
                        self.lead_in_count += 1;
                    } else {
                        self.outer_state = OuterState::ScanFor770Start;
                        self.lead_in_count = 0;
                    }
                    self.prev_half_micros = None;
                }
                None
            }
            OuterState::Short0B => {
                let Some(full) = full_cycle else { return None };
                let expected = SHORT0_HALF + BIT0_HALF;
                if within(full, expected, BIT0_TOLERANCE * 2) {
                    self.data_start = sample_index;
                    self.outer_state = OuterState::ReadData;
                } else {
                    self.outer_state = OuterState::ScanFor770Start;
                    self.lead_in_count = 0;
                }
                self.prev_half_micros = None;
                None
            }
            OuterState::ReadData => {
                let Some(full) = full_cycle else { return None };
                self.prev_half_micros = None;

                if within(full, BIT0_HALF * 2, BIT0_TOLERANCE) {
                    self.emit_bit(0);
                } else if within(full, BIT1_HALF * 2, BIT1_TOLERANCE) {
                    self.emit_bit(1);
                } else {
                    self.data_end = sample_index;
                    self.outer_state = OuterState::EndReached;
                    return Some(self.finish_chunk());
                }

                if self.output.len() > MAX_CHUNK_BYTES {
                    self.data_end = sample_index;
                    self.outer_state = OuterState::EndReached;
                    return Some(self.finish_chunk());
                }
                None
            }
            OuterState::EndReached => None,
        }
    }

    fn emit_bit(&mut self, bit: u32) {
        self.bit_accumulator = (self.bit_accumulator << 1) | bit;
        if self.bit_accumulator > 0xFF {
            let byte = (self.bit_accumulator & 0xFF) as u8;
            self.output.push(byte);
            self.checksum ^= byte;
            self.bit_accumulator = 1;
        }
    }

    fn finish_chunk(&mut self) -> CassetteChunk {
        let bad_end = self.bit_accumulator != 1;
        let read_checksum = self.output.last().copied().unwrap_or(0);
        let data = if self.output.is_empty() { Vec::new() } else { self.output[..self.output.len() - 1].to_vec() };

        let chunk = CassetteChunk {
            data,
            read_checksum,
            calc_checksum: self.checksum,
            bad_end,
            start_sample: self.data_start,
            end_sample: self.data_end,
        };

        self.reset_chunk_state();
        chunk
    }
}

impl<I: Iterator<Item = f32>> Iterator for CassetteDecoder<I> {
    type Item = CassetteChunk;

    fn next(&mut self) -> Option<CassetteChunk> {
        self.decode_one()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44_100;

    /// Synthesizes a square wave of `half_cycle_us`-long half-cycles for `count` half-cycles,
    /// alternating +1.0/-1.0, feeding the zero-crossing extractor's sign-change rule directly.
    fn square_wave_halves(half_cycle_us: u32, count: usize) -> Vec<f32> {
        let samples_per_half = ((half_cycle_us as f64 / 1_000_000.0) * SAMPLE_RATE as f64).round() as usize;
        let mut samples = Vec::new();
        let mut positive = true;
        for _ in 0..count {
            for _ in 0..samples_per_half.max(1) {
                samples.push(if positive { 1.0 } else { -1.0 });
            }
            positive = !positive;
        }
        samples
    }

    fn bits_to_samples(bits: &[u8]) -> Vec<f32> {
        let mut samples = Vec::new();
        // ~1.1s of 770 Hz lead-in tone (a few more than the 770-cycle threshold).
        samples.extend(square_wave_halves(LEAD_IN_HALF, (LEAD_IN_COUNT_THRESHOLD as usize + 8) * 2));
        // Short-0 sync cycle: short-0 half followed by a "0" half.
        samples.extend(square_wave_halves(SHORT0_HALF, 1));
        samples.extend(square_wave_halves(BIT0_HALF, 1));
        for &bit in bits {
            let half = if bit == 1 { BIT1_HALF } else { BIT0_HALF };
            samples.extend(square_wave_halves(half, 2));
        }
        // A cycle that matches neither bit window, to force EndReached.
        samples.extend(square_wave_halves(50, 2));
        samples
    }

    #[test]
    fn test_within_window() {
        assert!(within(650, 650, 108));
        assert!(within(542, 650, 108));
        assert!(within(758, 650, 108));
        assert!(!within(541, 650, 108));
        assert!(!within(759, 650, 108));
    }

    #[test]
    fn test_decodes_a_single_byte_chunk() {
        // One data byte 0xD5, MSB-first matching the sentinel-accumulator bit order, no checksum
        // byte supplied here beyond what the decoder itself accumulates from the data bits.
        let byte = 0xD5u8;
        let mut bits = Vec::new();
        for i in (0..8).rev() {
            bits.push((byte >> i) & 1);
        }
        // The decoder treats every emitted byte past the first as data until a non-matching
        // cycle ends the chunk, so a single data byte followed by a garbage cycle yields a
        // chunk whose data is empty and whose checksum byte is `byte` itself.
        let samples = bits_to_samples(&bits);

        let decoder = CassetteDecoder::new(samples.into_iter(), SAMPLE_RATE, SampleProcessor::ZeroCrossing);
        let chunks: Vec<_> = decoder.collect();

        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.read_checksum, byte);
        assert!(chunk.data.is_empty());
        assert_eq!(chunk.calc_checksum, 0xFF ^ byte);
    }

    #[test]
    fn test_checksum_law_holds_for_clean_chunk() {
        // Two data bytes followed by their own XOR checksum (seed 0xFF), so the decoder's
        // finish_chunk() sees a clean chunk: CalcChecksum == 0.
        let data_bytes = [0x01u8, 0x02u8];
        let checksum_byte = data_bytes.iter().fold(0xFFu8, |acc, b| acc ^ b);

        let mut bits = Vec::new();
        for &byte in data_bytes.iter().chain(std::iter::once(&checksum_byte)) {
            for i in (0..8).rev() {
                bits.push((byte >> i) & 1);
            }
        }

        let samples = bits_to_samples(&bits);
        let decoder = CassetteDecoder::new(samples.into_iter(), SAMPLE_RATE, SampleProcessor::ZeroCrossing);
        let chunks: Vec<_> = decoder.collect();

        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.data, data_bytes.to_vec());
        assert_eq!(chunk.read_checksum, checksum_byte);
        assert_eq!(chunk.calc_checksum, 0);
        assert!(!chunk.bad_end);
    }

    #[test]
    fn test_first_only_stops_after_one_chunk() {
        let data_bytes = [0xAAu8];
        let checksum_byte = data_bytes.iter().fold(0xFFu8, |acc, b| acc ^ b);
        let mut bits = Vec::new();
        for &byte in data_bytes.iter().chain(std::iter::once(&checksum_byte)) {
            for i in (0..8).rev() {
                bits.push((byte >> i) & 1);
            }
        }

        let mut samples = bits_to_samples(&bits);
        // A second copy of the same chunk, back to back, to confirm a second chunk would have
        // been found if scanning had continued.
        samples.extend(bits_to_samples(&bits));

        let mut decoder = CassetteDecoder::new(samples.into_iter(), SAMPLE_RATE, SampleProcessor::ZeroCrossing);
        decoder.stop_after_first();
        let chunks: Vec<_> = decoder.collect();

        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_empty_sample_source_yields_no_chunks() {
        let decoder = CassetteDecoder::new(std::iter::empty::<f32>(), SAMPLE_RATE, SampleProcessor::ZeroCrossing);
        let chunks: Vec<_> = decoder.collect();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_tone_run_does_not_reach_scanning_state() {
        // Four 770 Hz cycles is below the 5-cycle minimum run, so the scan resets silently
        // rather than treating it as the start of lead-in.
        let samples = square_wave_halves(LEAD_IN_HALF, 4 * 2);
        let decoder = CassetteDecoder::new(samples.into_iter(), SAMPLE_RATE, SampleProcessor::ZeroCrossing);
        let chunks: Vec<_> = decoder.collect();
        assert!(chunks.is_empty());
    }
}
