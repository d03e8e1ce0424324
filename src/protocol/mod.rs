//! Protocol module - wire format, record codecs, batching and framing.
//!
//! This module implements the binary protocol spoken with the server:
//! - Fixed-width bet and ack record layouts
//! - End-of-submission and end-of-acknowledgment sentinels
//! - Batch assembler slicing the serialized stream into bounded batches
//! - Frame buffer for accumulating partial reads

mod batch;
mod frame_buffer;
mod record;
mod wire_format;

pub use batch::{Batch, BatchAssembler, BatchSizing};
pub use frame_buffer::FrameBuffer;
pub use record::{AckRecord, BetRecord, STATUS_ACCEPTED};
pub use wire_format::{
    is_end_of_acks, is_end_of_submission, BatchMetadata, ACK_WIDTH, BET_NUMBER_WIDTH,
    BIRTH_DATE_WIDTH, END_OF_ACKS, END_OF_SUBMISSION, HOUSE_ID_WIDTH, LAST_NAME_WIDTH,
    MAX_BATCH_BYTES, METADATA_SIZE, NAME_WIDTH, NATIONAL_ID_WIDTH, RECORD_WIDTH,
    WINNERS_LENGTH_WIDTH, WINNER_ID_WIDTH,
};
