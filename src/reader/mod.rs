//! Reader module - server responses.
//!
//! - [`AckReader`] collects per-batch ack frames up to the expected count or
//!   the end-of-acknowledgment sentinel
//! - [`WinnersReader`] reads the length-prefixed winners list

mod ack;
mod winners;

pub use ack::{AckReader, AckRound};
pub use winners::{Winners, WinnersReader};
