//! Wire format constants, sentinels and the batch metadata preamble.
//!
//! Bet record frame (79 bytes):
//! ```text
//! ┌─────────┬─────────┬──────────┬─────────────┬─────────┬────────────┐
//! │ House ID│ Name    │ LastName │ National ID │ Birth   │ Bet Number │
//! │ 1 byte  │ 30 bytes│ 30 bytes │ 4 bytes     │ 10 bytes│ 4 bytes    │
//! │ uint8   │ 0-padded│ 0-padded │ uint32 BE   │ 0-padded│ uint32 BE  │
//! └─────────┴─────────┴──────────┴─────────────┴─────────┴────────────┘
//! ```
//!
//! Ack frame (9 bytes): national id (uint32 BE), bet number (uint32 BE),
//! status code (uint8, `1` = accepted).
//!
//! All multi-byte integers are Big Endian.

/// Width of the house id field.
pub const HOUSE_ID_WIDTH: usize = 1;

/// Width of the zero-padded first name field.
pub const NAME_WIDTH: usize = 30;

/// Width of the zero-padded last name field.
pub const LAST_NAME_WIDTH: usize = 30;

/// Width of the national id field.
pub const NATIONAL_ID_WIDTH: usize = 4;

/// Width of the zero-padded birth date field (`YYYY-MM-DD`).
pub const BIRTH_DATE_WIDTH: usize = 10;

/// Width of the bet number field.
pub const BET_NUMBER_WIDTH: usize = 4;

/// Bet record frame width in bytes (fixed, exactly 79).
pub const RECORD_WIDTH: usize = HOUSE_ID_WIDTH
    + NAME_WIDTH
    + LAST_NAME_WIDTH
    + NATIONAL_ID_WIDTH
    + BIRTH_DATE_WIDTH
    + BET_NUMBER_WIDTH;

/// Ack frame width in bytes (fixed, exactly 9).
pub const ACK_WIDTH: usize = 9;

/// Hard ceiling for a single batch on the wire.
pub const MAX_BATCH_BYTES: usize = 8137;

/// Width of the winners list length prefix.
pub const WINNERS_LENGTH_WIDTH: usize = 2;

/// Width of one winner identifier.
pub const WINNER_ID_WIDTH: usize = 4;

/// Batch metadata preamble size in bytes.
pub const METADATA_SIZE: usize = 4;

const END_OF_SUBMISSION_TOKEN: &[u8] = b"END_MESSAGE";
const END_OF_ACKS_TOKEN: &[u8] = b"END";

/// Sentinel frame closing the submitted record stream.
pub const END_OF_SUBMISSION: [u8; RECORD_WIDTH] = pad_token(END_OF_SUBMISSION_TOKEN);

/// Sentinel frame closing the ack stream.
pub const END_OF_ACKS: [u8; ACK_WIDTH] = pad_token(END_OF_ACKS_TOKEN);

const fn pad_token<const N: usize>(token: &[u8]) -> [u8; N] {
    let mut frame = [0u8; N];
    let mut i = 0;
    while i < token.len() {
        frame[i] = token[i];
        i += 1;
    }
    frame
}

/// Check a complete record frame against the end-of-submission sentinel.
#[inline]
pub fn is_end_of_submission(frame: &[u8]) -> bool {
    frame == END_OF_SUBMISSION.as_slice()
}

/// Check a complete ack frame against the end-of-acknowledgment sentinel.
#[inline]
pub fn is_end_of_acks(frame: &[u8]) -> bool {
    frame == END_OF_ACKS.as_slice()
}

/// Optional preamble telling the server how large each batch is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchMetadata {
    /// Configured batch size in bytes.
    pub batch_byte_size: u16,
    /// Agency the batches come from.
    pub house_id: u16,
}

impl BatchMetadata {
    /// Create a new preamble.
    pub fn new(batch_byte_size: u16, house_id: u16) -> Self {
        Self {
            batch_byte_size,
            house_id,
        }
    }

    /// Encode preamble to bytes (Big Endian).
    pub fn encode(&self) -> [u8; METADATA_SIZE] {
        let mut buf = [0u8; METADATA_SIZE];
        buf[0..2].copy_from_slice(&self.batch_byte_size.to_be_bytes());
        buf[2..4].copy_from_slice(&self.house_id.to_be_bytes());
        buf
    }

    /// Decode preamble from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < METADATA_SIZE {
            return None;
        }
        Some(Self {
            batch_byte_size: u16::from_be_bytes([buf[0], buf[1]]),
            house_id: u16::from_be_bytes([buf[2], buf[3]]),
        })
    }
}
