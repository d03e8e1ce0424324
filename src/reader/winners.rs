//! Winners list reader.
//!
//! ```text
//! ┌──────────┬──────────────────────────────────┐
//! │ Length   │ National IDs                     │
//! │ 2 bytes  │ Length bytes, uint32 BE each     │
//! │ uint16 BE│                                  │
//! └──────────┴──────────────────────────────────┘
//! ```
//!
//! The length counts bytes, not winners.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{BetwireError, Result};
use crate::protocol::{WINNERS_LENGTH_WIDTH, WINNER_ID_WIDTH};
use crate::transport::Transport;

/// National ids of the agency's winners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Winners {
    ids: Vec<u32>,
}

impl Winners {
    /// Split a payload into 4-byte Big Endian identifiers.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() % WINNER_ID_WIDTH != 0 {
            return Err(BetwireError::Protocol(format!(
                "Winners payload of {} bytes is not a multiple of {}",
                payload.len(),
                WINNER_ID_WIDTH
            )));
        }

        let ids = payload
            .chunks_exact(WINNER_ID_WIDTH)
            .map(|id| u32::from_be_bytes([id[0], id[1], id[2], id[3]]))
            .collect();
        Ok(Self { ids })
    }

    /// Number of winners.
    #[inline]
    pub fn count(&self) -> usize {
        self.ids.len()
    }

    /// Whether the agency has no winners.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Winner national ids in the order received.
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Consume the list, returning the ids.
    pub fn into_ids(self) -> Vec<u32> {
        self.ids
    }
}

/// Reads the length-prefixed winners list sent after the submission.
pub struct WinnersReader;

impl WinnersReader {
    /// Read the length prefix, then exactly that many payload bytes.
    pub async fn read<S>(transport: &mut Transport<S>) -> Result<Winners>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let prefix = transport.receive_exact(WINNERS_LENGTH_WIDTH).await?;
        let length = u16::from_be_bytes([prefix[0], prefix[1]]) as usize;
        if length == 0 {
            return Ok(Winners::default());
        }

        let payload = transport.receive_exact(length).await?;
        Winners::decode(&payload)
    }
}
