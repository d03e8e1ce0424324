//! Batch assembler.
//!
//! Every record is serialized up front, the end-of-submission sentinel is
//! appended once, and the resulting stream is handed out in bounded slices.
//! The sentinel is ordinary payload for chunking purposes and may straddle
//! two batches when the batch size is not a multiple of the record width.

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::error::{BetwireError, Result};

use super::record::BetRecord;
use super::wire_format::{END_OF_SUBMISSION, MAX_BATCH_BYTES, RECORD_WIDTH};

/// Immutable batch sizing, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSizing {
    batch_bytes: usize,
    records_per_batch: usize,
}

impl BatchSizing {
    /// Size batches by record count.
    ///
    /// `records_per_batch * RECORD_WIDTH` above [`MAX_BATCH_BYTES`] is clamped
    /// to the largest multiple of the record width under the ceiling.
    pub fn for_records(records_per_batch: usize) -> Result<Self> {
        if records_per_batch == 0 {
            return Err(BetwireError::Config(
                "Records per batch must be at least 1".to_string(),
            ));
        }
        Ok(Self::from_bytes_unchecked(
            records_per_batch.saturating_mul(RECORD_WIDTH),
        ))
    }

    /// Size batches by byte count.
    ///
    /// Any size of at least one record width is accepted; only sizes above
    /// the ceiling are clamped.
    pub fn for_bytes(batch_bytes: usize) -> Result<Self> {
        if batch_bytes < RECORD_WIDTH {
            return Err(BetwireError::Config(format!(
                "Batch size {} is smaller than one record ({} bytes)",
                batch_bytes, RECORD_WIDTH
            )));
        }
        Ok(Self::from_bytes_unchecked(batch_bytes))
    }

    fn from_bytes_unchecked(batch_bytes: usize) -> Self {
        let batch_bytes = if batch_bytes > MAX_BATCH_BYTES {
            let clamped = MAX_BATCH_BYTES - MAX_BATCH_BYTES % RECORD_WIDTH;
            debug!(
                requested = batch_bytes,
                clamped, "Batch size above protocol ceiling, clamping"
            );
            clamped
        } else {
            batch_bytes
        };

        Self {
            batch_bytes,
            records_per_batch: batch_bytes / RECORD_WIDTH,
        }
    }

    /// Maximum bytes per batch.
    #[inline]
    pub fn batch_bytes(&self) -> usize {
        self.batch_bytes
    }

    /// Whole records that fit in one batch.
    #[inline]
    pub fn records_per_batch(&self) -> usize {
        self.records_per_batch
    }
}

/// Result of asking the assembler for the next batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    /// Next slice of the serialized stream (never empty).
    Chunk(Bytes),
    /// Every byte, sentinel included, has been handed out.
    Exhausted,
}

/// Slices the serialized record stream into bounded batches.
#[derive(Debug)]
pub struct BatchAssembler {
    stream: Bytes,
    cursor: usize,
    sizing: BatchSizing,
    record_count: usize,
}

impl BatchAssembler {
    /// Serialize `records` and append the end-of-submission sentinel.
    ///
    /// Fails with [`BetwireError::Encoding`] on the first record that does
    /// not fit its layout; nothing is handed out in that case.
    pub fn new(records: &[BetRecord], sizing: BatchSizing) -> Result<Self> {
        let mut stream = BytesMut::with_capacity((records.len() + 1) * RECORD_WIDTH);
        for record in records {
            stream.extend_from_slice(&record.encode()?);
        }
        stream.extend_from_slice(&END_OF_SUBMISSION);

        debug!(
            records = records.len(),
            stream_bytes = stream.len(),
            batch_bytes = sizing.batch_bytes(),
            "Serialized submission stream"
        );

        Ok(Self {
            stream: stream.freeze(),
            cursor: 0,
            sizing,
            record_count: records.len(),
        })
    }

    /// Hand out up to one batch of bytes starting at the cursor.
    pub fn next_batch(&mut self) -> Batch {
        let remaining = self.stream.len() - self.cursor;
        if remaining == 0 {
            return Batch::Exhausted;
        }

        let take = remaining.min(self.sizing.batch_bytes());
        let start = self.cursor;
        self.cursor += take;

        debug!(from = start, to = self.cursor, "Returned batch");
        Batch::Chunk(self.stream.slice(start..self.cursor))
    }

    /// Whole frames, sentinel included, that end inside the byte range
    /// `[0, cursor)` but not inside `[0, previous)`.
    pub fn frames_completed_since(&self, previous: usize) -> usize {
        self.cursor / RECORD_WIDTH - previous / RECORD_WIDTH
    }

    /// Bytes handed out so far.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether the whole stream has been handed out.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.stream.len()
    }

    /// Total stream length, sentinel included.
    #[inline]
    pub fn stream_len(&self) -> usize {
        self.stream.len()
    }

    /// Number of bet records in the stream.
    #[inline]
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Sizing fixed at construction.
    #[inline]
    pub fn sizing(&self) -> BatchSizing {
        self.sizing
    }
}
