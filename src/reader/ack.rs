//! Acknowledgment reader.
//!
//! Per submitted batch the server answers with one ack frame per record
//! frame, or stops early with the end-of-acknowledgment sentinel. Reads are
//! capped at the bytes still expected and pass through a [`FrameBuffer`], so
//! the sentinel is only ever checked on complete, aligned frames.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::error::{BetwireError, Result};
use crate::protocol::{is_end_of_acks, AckRecord, FrameBuffer, ACK_WIDTH};
use crate::transport::Transport;

/// Decoded acks of one request/response round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AckRound {
    /// Acks in the order the server sent them.
    pub acks: Vec<AckRecord>,
    /// The end-of-acknowledgment sentinel closed this round.
    pub terminal: bool,
}

impl AckRound {
    /// Walk `collected` in ack-width strides, stopping at the sentinel.
    ///
    /// Fails with [`BetwireError::Protocol`] if the byte count is not a
    /// multiple of the ack width.
    pub fn decode(collected: &[u8]) -> Result<Self> {
        if collected.len() % ACK_WIDTH != 0 {
            return Err(BetwireError::Protocol(format!(
                "Ack stream of {} bytes is not a multiple of {}",
                collected.len(),
                ACK_WIDTH
            )));
        }

        let mut round = AckRound::default();
        for frame in collected.chunks_exact(ACK_WIDTH) {
            if is_end_of_acks(frame) {
                round.terminal = true;
                break;
            }
            round.acks.push(AckRecord::decode(frame)?);
        }
        Ok(round)
    }

    /// Number of acks with an accepted status.
    pub fn accepted(&self) -> usize {
        self.acks.iter().filter(|ack| ack.is_accepted()).count()
    }
}

/// Reads ack frames for each submitted batch.
pub struct AckReader {
    frames: FrameBuffer,
}

impl AckReader {
    /// Create a reader with an empty ack frame buffer.
    pub fn new() -> Self {
        Self {
            frames: FrameBuffer::new(ACK_WIDTH),
        }
    }

    /// Collect and decode the acks for a batch of `expected_frames` records.
    pub async fn read_round<S>(
        &mut self,
        transport: &mut Transport<S>,
        expected_frames: usize,
    ) -> Result<AckRound>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let collected = self.collect(transport, expected_frames).await?;
        AckRound::decode(&collected)
    }

    /// Read whole ack frames until `expected_frames` arrived or the
    /// sentinel completed, whichever comes first.
    async fn collect<S>(
        &mut self,
        transport: &mut Transport<S>,
        expected_frames: usize,
    ) -> Result<BytesMut>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let expected = expected_frames * ACK_WIDTH;
        let mut collected = BytesMut::with_capacity(expected);
        self.frames.clear();

        while collected.len() < expected {
            let want = expected - collected.len() - self.frames.len();
            let chunk = transport.receive_some(want).await?;
            self.frames.extend(&chunk);

            while let Some(frame) = self.frames.try_extract_one() {
                collected.extend_from_slice(&frame);

                if is_end_of_acks(&frame) {
                    debug!(
                        frames = collected.len() / ACK_WIDTH,
                        expected_frames, "End-of-acknowledgment received"
                    );
                    // Anything after the sentinel belongs to the next message.
                    transport.unread(&self.frames.take_remainder());
                    return Ok(collected);
                }
            }
        }

        Ok(collected)
    }
}

impl Default for AckReader {
    fn default() -> Self {
        Self::new()
    }
}
