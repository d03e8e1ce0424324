//! Transport module - exact-length I/O over a stream socket.
//!
//! Absorbs partial reads and writes so the rest of the crate only deals in
//! whole buffers.

mod stream;

pub use stream::Transport;
