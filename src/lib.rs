//! # betwire-client
//!
//! Rust client for the betwire batched bet submission protocol.
//!
//! An agency submits its bets to the lottery server over one TCP connection:
//! fixed-width 79-byte bet frames in size-bounded batches, closed by an
//! end-of-submission sentinel. The server answers every batch with 9-byte
//! ack frames, closed by an end-of-acknowledgment sentinel, and finally
//! sends the length-prefixed list of winners.
//!
//! ## Architecture
//!
//! - **Transport**: exact-length reads and writes over the stream
//! - **Protocol**: record codecs, sentinels, batch assembler, frame buffer
//! - **Readers**: per-batch ack rounds and the winners list
//! - **Client**: the submission loop tying them together
//!
//! ## Example
//!
//! ```ignore
//! use betwire_client::{ingest, Client, ClientConfig, Submission};
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_file("config.yaml")?;
//!     let rows = ingest::read_rows_from_path(&config.bets_file)?;
//!     let (records, _skipped) = ingest::records_from_rows(config.house_id()?, &rows);
//!
//!     let client = betwire_client::ClientBuilder::from_config(&config).build()?;
//!     let (_tx, cancel) = watch::channel(false);
//!
//!     if let Submission::Completed(report) = client.run(&records, &cancel).await? {
//!         println!("{} winners", report.winners.count());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod protocol;
pub mod reader;
pub mod transport;

mod client;

pub use client::{Client, ClientBuilder, Submission, SubmissionReport};
pub use config::ClientConfig;
pub use error::{BetwireError, Stage};
