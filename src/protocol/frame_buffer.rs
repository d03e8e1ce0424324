//! Frame buffer for accumulating partial reads of fixed-width frames.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management. Bytes arrive in
//! whatever segments the stream produces; frames only come out once a full
//! `frame_width` boundary is buffered, so callers never see a partial frame.
//!
//! # Example
//!
//! ```
//! use betwire_client::protocol::{FrameBuffer, ACK_WIDTH};
//!
//! let mut buffer = FrameBuffer::new(ACK_WIDTH);
//!
//! assert!(buffer.push(&[0u8; 5]).is_empty());
//! let frames = buffer.push(&[0u8; 13]);
//! assert_eq!(frames.len(), 2);
//! assert!(buffer.is_empty());
//! ```

use bytes::{Bytes, BytesMut};

/// Buffer that turns an arbitrary byte stream into fixed-width frames.
pub struct FrameBuffer {
    /// Accumulated bytes not yet handed out as frames.
    buffer: BytesMut,
    /// Width of every frame.
    frame_width: usize,
}

impl FrameBuffer {
    /// Create a new frame buffer for frames of `frame_width` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `frame_width` is zero.
    pub fn new(frame_width: usize) -> Self {
        Self::with_capacity(frame_width, frame_width * 64)
    }

    /// Create a new frame buffer with a custom initial capacity.
    pub fn with_capacity(frame_width: usize, capacity: usize) -> Self {
        assert!(frame_width > 0, "frame width must be non-zero");
        Self {
            buffer: BytesMut::with_capacity(capacity),
            frame_width,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// A trailing partial frame stays buffered for the next push.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::with_capacity(self.buffer.len() / self.frame_width);
        while let Some(frame) = self.try_extract_one() {
            frames.push(frame);
        }
        frames
    }

    /// Append data to the buffer without extracting frames.
    ///
    /// Pair with [`FrameBuffer::try_extract_one`] to inspect frames one at a time.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract a single frame from the buffer.
    pub fn try_extract_one(&mut self) -> Option<Bytes> {
        if self.buffer.len() < self.frame_width {
            return None;
        }
        Some(self.buffer.split_to(self.frame_width).freeze())
    }

    /// Take every buffered byte out, leaving the buffer empty.
    pub fn take_remainder(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Width of the frames this buffer produces.
    pub fn frame_width(&self) -> usize {
        self.frame_width
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
