use crate::bitqueue::BitQueue;
use crate::decompress_utils::LENGTH_DECODE_TABLE;
use crate::lzs_constants::{
    LENGTH_MAX_BIT_WIDTH, LONG_OFFSET_BITS, LZS_MAX_HISTORY_SIZE, MAX_EXTENDED_LENGTH,
    MAX_INITIAL_LENGTH, SHORT_OFFSET_BITS,
};
use std::fmt::Debug;
use std::ops::{BitOr, BitOrAssign};

/*
 * Status flags reported by one incremental decompression call.  The flags
 * compose with bit-or; INPUT_FINISHED | INPUT_STARVED is the normal
 * steady-state response once all input has been fed and consumed.
 */
#[derive(Copy, Clone, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct LzsStatus(u8);

impl LzsStatus {
    pub const NONE: LzsStatus = LzsStatus(0);

    /* The bit queue holds fewer bits than the current state needs; supply
     * more input. */
    pub const INPUT_STARVED: LzsStatus = LzsStatus(0b0001);

    /* Queue occupancy and input length are both zero; no further progress
     * is possible without new input. */
    pub const INPUT_FINISHED: LzsStatus = LzsStatus(0b0010);

    /* The output buffer ran out mid-token; drain it and call again.  No
     * partial token is lost. */
    pub const NO_OUTPUT_BUFFER_SPACE: LzsStatus = LzsStatus(0b0100);

    /* An end marker was consumed; the stream continues at the next byte
     * boundary. */
    pub const END_MARKER: LzsStatus = LzsStatus(0b1000);

    #[inline(always)]
    pub fn contains(self, flags: LzsStatus) -> bool {
        self.0 & flags.0 == flags.0
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LzsStatus {
    type Output = LzsStatus;

    #[inline(always)]
    fn bitor(self, rhs: LzsStatus) -> LzsStatus {
        LzsStatus(self.0 | rhs.0)
    }
}

impl BitOrAssign for LzsStatus {
    #[inline(always)]
    fn bitor_assign(&mut self, rhs: LzsStatus) {
        self.0 |= rhs.0;
    }
}

impl Debug for LzsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let mut first = true;
        for (flag, name) in [
            (Self::INPUT_STARVED, "INPUT_STARVED"),
            (Self::INPUT_FINISHED, "INPUT_FINISHED"),
            (Self::NO_OUTPUT_BUFFER_SPACE, "NO_OUTPUT_BUFFER_SPACE"),
            (Self::END_MARKER, "END_MARKER"),
        ] {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/*
 * States of the decode automaton.  Every transition below names its
 * successor explicitly; nothing depends on declaration order.
 */
#[derive(Copy, Clone, Debug)]
enum DecompressState {
    GetTokenType,
    GetLiteral,
    GetOffsetType,
    GetOffsetShort,
    GetOffsetLong,
    GetLength,
    CopyData,
    CopyExtendedData,
    GetExtendedLength,
}

impl DecompressState {
    /*
     * Number of queued bits a state needs before it may execute.  GetLength
     * peeks 4 bits and re-checks the symbol width the table reports, so its
     * entry requirement is zero; the copy states consume no bits at all.
     */
    const fn min_queue_width(self) -> usize {
        match self {
            DecompressState::GetTokenType => 1,
            DecompressState::GetLiteral => 8,
            DecompressState::GetOffsetType => 1,
            DecompressState::GetOffsetShort => SHORT_OFFSET_BITS,
            DecompressState::GetOffsetLong => LONG_OFFSET_BITS,
            DecompressState::GetLength => 0,
            DecompressState::CopyData => 0,
            DecompressState::CopyExtendedData => 0,
            DecompressState::GetExtendedLength => LENGTH_MAX_BIT_WIDTH,
        }
    }
}

/* Outcome of one decompression call. */
#[derive(Debug)]
pub struct DecompressResult {
    /* Input bytes moved into the bit queue during this call. */
    pub consumed: usize,
    /* Output bytes produced during this call. */
    pub produced: usize,
    pub status: LzsStatus,
}

/*
 * Incremental decompression.
 *
 * State is kept between calls, so decompression can be done gradually and
 * flexibly depending on the application's input/output buffer handling.
 * Each call runs the automaton until it needs more input, runs out of output
 * space, or hits an end marker's padding; the returned status says which.
 *
 * The history ring is caller-owned and must be the same buffer, of the same
 * length (at least LZS_MAX_HISTORY_SIZE bytes), on every call of one
 * decode.  The decoder tracks how much of the ring it has written and reads
 * never-written cells as zero, so the ring's initial contents can never
 * leak into the output.
 */
pub struct LzsDecompressor {
    bit_queue: BitQueue,
    state: DecompressState,
    /* Offset of the back-reference currently being decoded. */
    offset: u16,
    /* Bytes still to copy for the current (possibly extended) length group. */
    length: u8,
    history_write_idx: usize,
    history_read_idx: usize,
    /* Ring bytes ever written, saturating at the ring size. */
    history_filled: usize,
}

impl Default for LzsDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl LzsDecompressor {
    pub fn new() -> Self {
        Self {
            bit_queue: BitQueue::new(),
            state: DecompressState::GetTokenType,
            offset: 0,
            length: 0,
            history_write_idx: 0,
            history_read_idx: 0,
            history_filled: 0,
        }
    }

    /* Restart from a clean automaton, as if freshly constructed.  The
     * caller-owned history ring is not touched; never-written tracking
     * restarts with it. */
    pub fn reset(&mut self) {
        self.bit_queue.clear();
        self.state = DecompressState::GetTokenType;
        self.offset = 0;
        self.length = 0;
        self.history_write_idx = 0;
        self.history_read_idx = 0;
        self.history_filled = 0;
    }

    pub fn decompress(
        &mut self,
        in_data: &[u8],
        out_data: &mut [u8],
        history: &mut [u8],
    ) -> DecompressResult {
        assert!(
            history.len() >= LZS_MAX_HISTORY_SIZE,
            "history ring must cover the long offset range"
        );

        let mut status = LzsStatus::NONE;
        let mut in_pos = 0;
        let mut out_pos = 0;

        loop {
            /* Load input data into the bit queue. */
            while in_pos < in_data.len() && self.bit_queue.has_room_for_byte() {
                self.bit_queue.push_byte(in_data[in_pos]);
                in_pos += 1;
            }
            /* Check if we've reached the end of the input data. */
            if self.bit_queue.is_empty() {
                status |= LzsStatus::INPUT_FINISHED | LzsStatus::INPUT_STARVED;
            }
            /* Check if we have enough queued bits to do something useful. */
            if self.bit_queue.len() < self.state.min_queue_width() {
                status |= LzsStatus::INPUT_STARVED;
            }
            if !status.is_empty() {
                break;
            }

            match self.state {
                DecompressState::GetTokenType => {
                    /* 0 is a literal byte, 1 an offset/length token. */
                    self.state = if self.bit_queue.pop_bits(1) != 0 {
                        DecompressState::GetOffsetType
                    } else {
                        DecompressState::GetLiteral
                    };
                }

                DecompressState::GetLiteral => {
                    if out_pos >= out_data.len() {
                        status |= LzsStatus::NO_OUTPUT_BUFFER_SPACE;
                    } else {
                        let byte = self.bit_queue.pop_bits(8) as u8;
                        out_data[out_pos] = byte;
                        out_pos += 1;
                        self.push_history(history, byte);
                        self.state = DecompressState::GetTokenType;
                    }
                }

                DecompressState::GetOffsetType => {
                    /* 1 selects the short (7 bit) offset, 0 the long
                     * (11 bit) offset. */
                    self.state = if self.bit_queue.pop_bits(1) != 0 {
                        DecompressState::GetOffsetShort
                    } else {
                        DecompressState::GetOffsetLong
                    };
                }

                DecompressState::GetOffsetShort => {
                    let offset = self.bit_queue.pop_bits(SHORT_OFFSET_BITS) as u16;
                    if offset == 0 {
                        /* End marker: discard the bits that are fractions
                         * of a byte, to align with a byte boundary. */
                        self.bit_queue.align_to_byte();
                        status |= LzsStatus::END_MARKER;
                        self.state = DecompressState::GetTokenType;
                    } else {
                        self.offset = offset;
                        self.state = DecompressState::GetLength;
                    }
                }

                DecompressState::GetOffsetLong => {
                    self.offset = self.bit_queue.pop_bits(LONG_OFFSET_BITS) as u16;
                    self.state = DecompressState::GetLength;
                }

                DecompressState::GetLength => {
                    let entry =
                        LENGTH_DECODE_TABLE[self.bit_queue.bits(LENGTH_MAX_BIT_WIDTH) as usize];
                    if self.bit_queue.len() < entry.width() {
                        status |= LzsStatus::INPUT_STARVED;
                    } else {
                        self.bit_queue.remove_bits(entry.width());
                        self.length = entry.length();
                        /* Resolve the offset into a ring read position
                         * before the copy begins. */
                        self.history_read_idx = (self.history_write_idx + history.len()
                            - self.offset as usize)
                            % history.len();
                        self.state = if self.length == MAX_INITIAL_LENGTH {
                            DecompressState::CopyExtendedData
                        } else {
                            DecompressState::CopyData
                        };
                    }
                }

                DecompressState::CopyData => {
                    if self.copy_from_history(out_data, &mut out_pos, history, &mut status) {
                        self.state = DecompressState::GetTokenType;
                    }
                }

                DecompressState::CopyExtendedData => {
                    if self.copy_from_history(out_data, &mut out_pos, history, &mut status) {
                        self.state = DecompressState::GetExtendedLength;
                    }
                }

                DecompressState::GetExtendedLength => {
                    self.length = self.bit_queue.pop_bits(LENGTH_MAX_BIT_WIDTH) as u8;
                    self.state = if self.length == MAX_EXTENDED_LENGTH {
                        /* More nibbles follow this copy. */
                        DecompressState::CopyExtendedData
                    } else {
                        DecompressState::CopyData
                    };
                }
            }
        }

        DecompressResult {
            consumed: in_pos,
            produced: out_pos,
            status,
        }
    }

    #[inline(always)]
    fn push_history(&mut self, history: &mut [u8], byte: u8) {
        history[self.history_write_idx] = byte;
        self.history_write_idx += 1;
        if self.history_write_idx >= history.len() {
            self.history_write_idx = 0;
        }
        if self.history_filled < history.len() {
            self.history_filled += 1;
        }
    }

    /*
     * Copy loop shared by CopyData and CopyExtendedData.  Each copied byte
     * re-enters the ring, so a read cursor trailing the write cursor by
     * less than the pending length expands a run.  Returns true when the
     * pending length reached zero, false when the output buffer ran out
     * (status is set and the partial copy resumes on the next call).
     */
    fn copy_from_history(
        &mut self,
        out_data: &mut [u8],
        out_pos: &mut usize,
        history: &mut [u8],
        status: &mut LzsStatus,
    ) -> bool {
        while self.length > 0 {
            if *out_pos >= out_data.len() {
                *status |= LzsStatus::NO_OUTPUT_BUFFER_SPACE;
                return false;
            }

            /* While the ring is not yet full, the written cells are exactly
             * the index range below history_filled; anything else has never
             * been written and reads as zero. */
            let byte = if self.history_filled >= history.len()
                || self.history_read_idx < self.history_filled
            {
                history[self.history_read_idx]
            } else {
                0
            };
            self.history_read_idx += 1;
            if self.history_read_idx >= history.len() {
                self.history_read_idx = 0;
            }

            out_data[*out_pos] = byte;
            *out_pos += 1;
            self.length -= 1;

            self.push_history(history, byte);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lzs_constants::LZS_HISTORY_BUFFER_SIZE;
    use crate::test_utils::{model_backref, LzsBitWriter};

    fn new_history() -> Vec<u8> {
        vec![0u8; LZS_HISTORY_BUFFER_SIZE]
    }

    #[test]
    fn test_single_literal_then_end_marker() {
        let mut dec = LzsDecompressor::new();
        let mut history = new_history();
        let mut out = [0u8; 8];

        let step = dec.decompress(&[0x20, 0xE0, 0x00], &mut out, &mut history);
        assert_eq!(step.consumed, 3);
        assert_eq!(step.produced, 1);
        assert_eq!(out[0], b'A');
        assert!(step.status.contains(LzsStatus::END_MARKER));
        assert!(step.status.contains(LzsStatus::INPUT_FINISHED));
    }

    #[test]
    fn test_input_finished_and_starved_when_drained() {
        let mut dec = LzsDecompressor::new();
        let mut history = new_history();
        let mut out = [0u8; 8];

        let step = dec.decompress(&[], &mut out, &mut history);
        assert_eq!(step.produced, 0);
        assert!(step.status.contains(LzsStatus::INPUT_FINISHED));
        assert!(step.status.contains(LzsStatus::INPUT_STARVED));
    }

    #[test]
    fn test_starved_mid_token_resumes_without_loss() {
        // "aaaa": literal 'a', then (offset 1, length 3), then end marker.
        let encoded = [0x30, 0xE0, 0x5C, 0x00];
        let mut dec = LzsDecompressor::new();
        let mut history = new_history();
        let mut produced = Vec::new();

        for &byte in &encoded {
            let mut chunk = &[byte][..];
            loop {
                let mut out = [0u8; 8];
                let step = dec.decompress(chunk, &mut out, &mut history);
                produced.extend_from_slice(&out[..step.produced]);
                chunk = &chunk[step.consumed..];
                if step.status.contains(LzsStatus::INPUT_STARVED) {
                    assert!(chunk.is_empty());
                    break;
                }
            }
        }
        assert_eq!(produced, b"aaaa");
    }

    #[test]
    fn test_fragmented_input_and_single_byte_output() {
        let encoded = [0x30, 0xE0, 0x5C, 0x00];
        let mut dec = LzsDecompressor::new();
        let mut history = new_history();
        let mut produced = Vec::new();
        let mut statuses_seen = LzsStatus::NONE;

        for &byte in &encoded {
            let mut chunk = &[byte][..];
            loop {
                let mut out = [0u8; 1];
                let step = dec.decompress(chunk, &mut out, &mut history);
                produced.extend_from_slice(&out[..step.produced]);
                chunk = &chunk[step.consumed..];
                statuses_seen |= step.status;
                if step.status.contains(LzsStatus::INPUT_STARVED) {
                    assert!(chunk.is_empty());
                    break;
                }
            }
        }
        assert_eq!(produced, b"aaaa");
        assert!(statuses_seen.contains(LzsStatus::INPUT_STARVED));
        assert!(statuses_seen.contains(LzsStatus::NO_OUTPUT_BUFFER_SPACE));
        assert!(statuses_seen.contains(LzsStatus::END_MARKER));
    }

    #[test]
    fn test_no_output_space_mid_copy_then_resume() {
        // 'X', then (offset 1, length 13), then end marker.
        let encoded = [0x2C, 0x60, 0x7D, 0x70, 0x00];
        let mut dec = LzsDecompressor::new();
        let mut history = new_history();

        let mut first = [0u8; 4];
        let step = dec.decompress(&encoded, &mut first, &mut history);
        assert_eq!(step.produced, 4);
        assert!(step.status.contains(LzsStatus::NO_OUTPUT_BUFFER_SPACE));
        assert!(!step.status.contains(LzsStatus::END_MARKER));

        let mut rest = [0u8; 32];
        let step = dec.decompress(&encoded[step.consumed..], &mut rest, &mut history);
        assert_eq!(step.produced, 10);
        assert!(step.status.contains(LzsStatus::END_MARKER));

        assert_eq!(&first, &[b'X'; 4]);
        assert_eq!(&rest[..10], &[b'X'; 10]);
    }

    #[test]
    fn test_records_continue_byte_aligned_after_end_marker() {
        let mut writer = LzsBitWriter::new();
        writer.literal(b'A');
        writer.end_marker();
        writer.literal(b'B');
        writer.end_marker();
        let encoded = writer.finish();

        let mut dec = LzsDecompressor::new();
        let mut history = new_history();
        let mut out = [0u8; 8];
        let mut produced = 0;
        let mut markers = 0;
        let mut remaining = &encoded[..];

        loop {
            let step = dec.decompress(remaining, &mut out[produced..], &mut history);
            produced += step.produced;
            remaining = &remaining[step.consumed..];
            if step.status.contains(LzsStatus::END_MARKER) {
                markers += 1;
            }
            if step.status.contains(LzsStatus::INPUT_FINISHED) {
                break;
            }
        }
        assert_eq!(&out[..produced], b"AB");
        assert_eq!(markers, 2);
    }

    #[test]
    fn test_long_offset_back_reference() {
        let mut writer = LzsBitWriter::new();
        let mut expected = Vec::new();
        for i in 0..200u8 {
            writer.literal(i);
            expected.push(i);
        }
        writer.backref(150, 6);
        model_backref(&mut expected, 150, 6);
        writer.end_marker();
        let encoded = writer.finish();

        let mut dec = LzsDecompressor::new();
        let mut history = new_history();
        let mut out = vec![0u8; expected.len()];
        let step = dec.decompress(&encoded, &mut out, &mut history);
        assert_eq!(step.produced, expected.len());
        assert_eq!(out, expected);
    }

    #[test]
    fn test_under_history_ring_reads_are_zero() {
        // Back-reference far beyond anything produced yet; the ring starts
        // dirty to prove its initial contents cannot leak.
        let mut writer = LzsBitWriter::new();
        writer.literal(b'q');
        writer.backref(2000, 4);
        writer.end_marker();
        let encoded = writer.finish();

        let mut dec = LzsDecompressor::new();
        let mut history = vec![0x5Au8; LZS_HISTORY_BUFFER_SIZE];
        let mut out = [0xEEu8; 8];
        let step = dec.decompress(&encoded, &mut out, &mut history);
        assert_eq!(step.produced, 5);
        assert_eq!(&out[..5], &[b'q', 0, 0, 0, 0]);
    }

    #[test]
    fn test_ring_wrap_past_history_size() {
        // Produce well past the ring size with maximum-distance references
        // crossing the wrap point.
        let mut writer = LzsBitWriter::new();
        let mut expected = Vec::new();
        for i in 0..600usize {
            let byte = (i % 251) as u8;
            writer.literal(byte);
            expected.push(byte);
        }
        for _ in 0..8 {
            writer.backref(547, 300);
            model_backref(&mut expected, 547, 300);
        }
        writer.backref(2047, 40);
        model_backref(&mut expected, 2047, 40);
        writer.end_marker();
        let encoded = writer.finish();

        let mut dec = LzsDecompressor::new();
        let mut history = new_history();
        let mut out = vec![0u8; expected.len()];
        let mut produced = 0;
        let mut remaining = &encoded[..];
        loop {
            let step = dec.decompress(remaining, &mut out[produced..], &mut history);
            produced += step.produced;
            remaining = &remaining[step.consumed..];
            if step.status.contains(LzsStatus::INPUT_FINISHED) {
                break;
            }
        }
        assert_eq!(produced, expected.len());
        assert_eq!(out, expected);
    }

    #[test]
    fn test_extended_length_suspends_between_nibbles() {
        // 'B', then (offset 1, length 8 + 15 + 15 + 2): the copy groups of
        // the extended run suspend and resume across 1-byte output buffers.
        let encoded = [0x21, 0x60, 0x7F, 0xFC, 0xB0, 0x00];
        let mut dec = LzsDecompressor::new();
        let mut history = new_history();
        let mut produced = Vec::new();
        let mut remaining = &encoded[..];

        loop {
            let mut out = [0u8; 1];
            let step = dec.decompress(remaining, &mut out, &mut history);
            produced.extend_from_slice(&out[..step.produced]);
            remaining = &remaining[step.consumed..];
            if step.status.contains(LzsStatus::INPUT_FINISHED) {
                break;
            }
        }
        assert_eq!(produced.len(), 41);
        assert!(produced.iter().all(|&b| b == b'B'));
    }

    #[test]
    fn test_reset_restarts_the_automaton() {
        let mut dec = LzsDecompressor::new();
        let mut history = new_history();
        let mut out = [0u8; 8];

        // Feed half a literal so state and queue are mid-token.
        let step = dec.decompress(&[0x20], &mut out, &mut history);
        assert_eq!(step.produced, 0);
        assert!(step.status.contains(LzsStatus::INPUT_STARVED));

        dec.reset();
        let step = dec.decompress(&[0x20, 0xE0, 0x00], &mut out, &mut history);
        assert_eq!(step.produced, 1);
        assert_eq!(out[0], b'A');
    }
}
