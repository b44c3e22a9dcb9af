pub mod lzs_chunked_buffer_input;
pub mod lzs_chunked_buffer_output;
