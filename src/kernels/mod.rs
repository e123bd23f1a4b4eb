//! The pure decode kernels. Each one works on borrowed catalog bytes and owned
//! output buffers only; none of them know about the catalog container, the
//! terminal or the random source.

pub mod bitstream;
pub mod huffman;
pub mod lz77;
pub mod palette;
