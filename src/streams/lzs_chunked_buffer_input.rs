use nightly_quirks::utils::NightlyUtils;

/*
 * Heap chunk buffer refilled from a read callback.  The LZS bit queue is
 * fed whole bytes, so the window handed to the decoder is a plain byte
 * slice; consumed bytes are discarded on the next refill.  A callback
 * return of 0 means end of source.
 */
pub struct LzsChunkedBufferInput<'a> {
    buffer: Box<[u8]>,
    position: usize,
    end_position: usize,
    source_drained: bool,
    func: Box<dyn FnMut(&mut [u8]) -> usize + 'a>,
}

impl<'a> LzsChunkedBufferInput<'a> {
    pub fn new<F: FnMut(&mut [u8]) -> usize + 'a>(read_func: F, buf_size: usize) -> Self {
        Self {
            buffer: unsafe { NightlyUtils::box_new_uninit_slice_assume_init(buf_size) },
            position: 0,
            end_position: 0,
            source_drained: false,
            func: Box::new(read_func),
        }
    }

    /*
     * Discard consumed bytes and ask the callback for more.  Returns true
     * while unconsumed bytes remain afterwards.
     */
    pub fn refill(&mut self) -> bool {
        if self.position > 0 {
            self.buffer.copy_within(self.position..self.end_position, 0);
            self.end_position -= self.position;
            self.position = 0;
        }
        if !self.source_drained && self.end_position < self.buffer.len() {
            let count = (self.func)(&mut self.buffer[self.end_position..]);
            if count == 0 {
                self.source_drained = true;
            }
            self.end_position += count;
        }
        self.position < self.end_position
    }

    /* The unconsumed byte window. */
    pub fn pending(&self) -> &[u8] {
        &self.buffer[self.position..self.end_position]
    }

    pub fn consume(&mut self, count: usize) {
        debug_assert!(count <= self.end_position - self.position);
        self.position += count;
    }
}
