use crc32fast::Hasher;
use nightly_quirks::utils::NightlyUtils;

/* Totals of one buffered decompression run. */
pub struct OutStreamResult {
    pub written: usize,
    pub crc32: u32,
}

/*
 * Heap chunk buffer flushed to a write callback.  Unlike a DEFLATE-style
 * output window, no look-back region is kept: the decoder's history lives
 * in its explicit ring, so the buffer can be handed out and flushed whole.
 * The crc32 of everything flushed is accumulated for callers that validate
 * output against an external framing layer.
 */
pub struct LzsChunkedBufferOutput<'a> {
    buffer: Box<[u8]>,
    position: usize,
    crc32: Hasher,
    written: usize,
    func: Box<dyn FnMut(&[u8]) -> Result<(), ()> + 'a>,
}

impl<'a> LzsChunkedBufferOutput<'a> {
    pub fn new<F: FnMut(&[u8]) -> Result<(), ()> + 'a>(write_func: F, buf_size: usize) -> Self {
        Self {
            buffer: unsafe { NightlyUtils::box_new_uninit_slice_assume_init(buf_size) },
            position: 0,
            crc32: Hasher::new(),
            written: 0,
            func: Box::new(write_func),
        }
    }

    /* Writable remainder of the buffer. */
    pub fn available(&mut self) -> &mut [u8] {
        &mut self.buffer[self.position..]
    }

    /* Mark 'count' bytes of available() as produced. */
    pub fn advance(&mut self, count: usize) {
        debug_assert!(self.position + count <= self.buffer.len());
        self.position += count;
    }

    pub fn flush(&mut self) -> bool {
        if self.position == 0 {
            return true;
        }
        self.crc32.update(&self.buffer[..self.position]);
        if (self.func)(&self.buffer[..self.position]).is_err() {
            return false;
        }
        self.written += self.position;
        self.position = 0;
        true
    }

    pub fn final_flush(&mut self) -> Result<OutStreamResult, ()> {
        if !self.flush() {
            return Err(());
        }

        let result = OutStreamResult {
            written: self.written,
            crc32: self.crc32.clone().finalize(),
        };

        self.crc32 = Hasher::new();
        self.written = 0;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_accumulates_written_and_crc() {
        let mut sink = Vec::new();
        let result = {
            let mut output = LzsChunkedBufferOutput::new(
                |data| {
                    sink.extend_from_slice(data);
                    Ok(())
                },
                8,
            );

            output.available()[..5].copy_from_slice(b"hello");
            output.advance(5);
            assert!(output.flush());
            output.available()[..6].copy_from_slice(b" world");
            output.advance(6);
            output.final_flush().unwrap()
        };

        assert_eq!(sink, b"hello world");
        assert_eq!(result.written, 11);
        assert_eq!(result.crc32, crc32fast::hash(b"hello world"));
    }

    #[test]
    fn test_failing_sink_reported() {
        let mut output = LzsChunkedBufferOutput::new(|_| Err(()), 8);
        output.available()[0] = 1;
        output.advance(1);
        assert!(!output.flush());
    }
}
