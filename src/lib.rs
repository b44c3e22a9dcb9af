// #![cfg_attr(debug_assertions, deny(warnings))]
pub mod bitqueue;

pub mod decompress_incremental;
pub mod decompress_simple;
mod decompress_utils;
mod lzs_constants;
pub mod streams;
pub mod unchecked;

#[macro_use]
extern crate static_assertions;

#[cfg(test)]
mod test_utils;

use crate::streams::lzs_chunked_buffer_input::LzsChunkedBufferInput;
use crate::streams::lzs_chunked_buffer_output::LzsChunkedBufferOutput;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub use crate::decompress_incremental::{DecompressResult, LzsDecompressor, LzsStatus};
pub use crate::decompress_simple::lzs_decompress;
pub use crate::lzs_constants::{LZS_HISTORY_BUFFER_SIZE, LZS_MAX_HISTORY_SIZE};
pub use crate::streams::lzs_chunked_buffer_output::OutStreamResult;

/*
 * Result of a call to decompress_file_buffered().
 */
#[derive(Debug)]
pub enum LzsError {
    /* The output callback refused more data. */
    OutputError,
}

/*
 * Decompress a whole LZS file through caller-sized chunk buffers, handing
 * each flushed chunk of plaintext to 'func'.  End markers inside the file
 * byte-align the stream and decoding continues, so a file holding several
 * marker-terminated records decodes back-to-back; history carries across
 * the markers.
 *
 * Returns the total bytes produced and their crc32, for callers that check
 * output against an external framing layer.
 */
pub fn decompress_file_buffered(
    file: impl AsRef<Path>,
    func: impl FnMut(&[u8]) -> Result<(), ()>,
    buf_size: usize,
) -> Result<OutStreamResult, LzsError> {
    let mut read_file = File::open(file).unwrap();
    let mut input_stream =
        LzsChunkedBufferInput::new(|buf| read_file.read(buf).unwrap_or(0), buf_size);

    let mut output_stream = LzsChunkedBufferOutput::new(func, buf_size);

    let mut history = vec![0u8; LZS_HISTORY_BUFFER_SIZE].into_boxed_slice();
    let mut decompressor = LzsDecompressor::new();

    input_stream.refill();
    loop {
        let step = decompressor.decompress(
            input_stream.pending(),
            output_stream.available(),
            &mut history,
        );
        input_stream.consume(step.consumed);
        output_stream.advance(step.produced);

        if step.status.contains(LzsStatus::NO_OUTPUT_BUFFER_SPACE) && !output_stream.flush() {
            return Err(LzsError::OutputError);
        }
        if step.status.contains(LzsStatus::INPUT_STARVED) && !input_stream.refill() {
            break;
        }
    }

    output_stream.final_flush().map_err(|_| LzsError::OutputError)
}
