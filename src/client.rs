//! Client builder and submission loop.
//!
//! The [`ClientBuilder`] provides a fluent API for configuring the client.
//! [`Client::run`] drives one submission:
//! 1. Serialize every bet (encoding errors abort before connecting)
//! 2. Connect to the server
//! 3. Check the cancellation signal once
//! 4. Send the metadata preamble, then batch / ack rounds until done
//! 5. Read the winners list
//!
//! The transport is closed exactly once on every exit path.
//!
//! # Example
//!
//! ```ignore
//! use betwire_client::Client;
//! use tokio::sync::watch;
//!
//! let client = Client::builder()
//!     .id("1")
//!     .server_address("server:12345")
//!     .records_per_batch(100)
//!     .build()?;
//!
//! let (_cancel_tx, cancel_rx) = watch::channel(false);
//! let outcome = client.run(&records, &cancel_rx).await?;
//! ```

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::config::{ClientConfig, DEFAULT_BATCH_MAX_AMOUNT};
use crate::error::{BetwireError, Result};
use crate::protocol::{Batch, BatchAssembler, BatchMetadata, BatchSizing, BetRecord, RECORD_WIDTH};
use crate::reader::{AckReader, Winners, WinnersReader};
use crate::transport::Transport;

/// Builder for configuring and creating a betwire client.
pub struct ClientBuilder {
    id: String,
    server_address: String,
    records_per_batch: usize,
    send_metadata: bool,
    span: Option<Span>,
}

impl ClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            id: "0".to_string(),
            server_address: String::new(),
            records_per_batch: DEFAULT_BATCH_MAX_AMOUNT,
            send_metadata: true,
            span: None,
        }
    }

    /// Seed a builder from a loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new()
            .id(config.id.clone())
            .server_address(config.server.address.clone())
            .records_per_batch(config.batch.max_amount)
            .send_metadata(config.send_metadata)
    }

    /// Set the agency id (must parse as a house id in 0..=255).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the `host:port` of the server.
    pub fn server_address(mut self, address: impl Into<String>) -> Self {
        self.server_address = address.into();
        self
    }

    /// Set how many records go into each batch.
    ///
    /// Sizes above the protocol ceiling are clamped when the client is built.
    /// Default: 100
    pub fn records_per_batch(mut self, records: usize) -> Self {
        self.records_per_batch = records;
        self
    }

    /// Send the 4-byte batch metadata preamble before the first batch.
    ///
    /// Default: true
    pub fn send_metadata(mut self, enabled: bool) -> Self {
        self.send_metadata = enabled;
        self
    }

    /// Span every submission log line is recorded under.
    ///
    /// Default: `client` span carrying the client id.
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Validate the settings and build the client.
    pub fn build(self) -> Result<Client> {
        let house_id = self.id.trim().parse::<u8>().map_err(|_| {
            BetwireError::Config(format!("id {:?} is not a number in 0..=255", self.id))
        })?;
        let sizing = BatchSizing::for_records(self.records_per_batch)?;
        let span = self
            .span
            .unwrap_or_else(|| info_span!("client", client_id = %self.id));

        Ok(Client {
            server_address: self.server_address,
            house_id,
            sizing,
            send_metadata: self.send_metadata,
            span,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The submission ran to completion and the winners list was read.
    Completed(SubmissionReport),
    /// The cancellation signal was set before the first batch.
    Cancelled,
}

/// Summary of a completed submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    /// Bet frames fully written to the server.
    pub bets_sent: usize,
    /// Acks with an accepted status.
    pub accepted: usize,
    /// Acks with any other status.
    pub rejected: usize,
    /// The server ended acknowledgments before every batch was sent.
    pub early_stop: bool,
    pub winners: Winners,
}

/// A configured betwire client.
pub struct Client {
    server_address: String,
    house_id: u8,
    sizing: BatchSizing,
    send_metadata: bool,
    span: Span,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Agency id carried in every bet.
    pub fn house_id(&self) -> u8 {
        self.house_id
    }

    /// Effective batch sizing after clamping.
    pub fn sizing(&self) -> BatchSizing {
        self.sizing
    }

    /// Connect to the configured server and submit `records`.
    ///
    /// Records are serialized before the connection is opened, so an
    /// encoding error never reaches the network.
    pub async fn run(
        &self,
        records: &[BetRecord],
        cancel: &watch::Receiver<bool>,
    ) -> Result<Submission> {
        let assembler = BatchAssembler::new(records, self.sizing)?;

        let mut transport = Transport::connect(self.server_address.as_str())
            .instrument(self.span.clone())
            .await
            .map_err(|e| {
                self.span.in_scope(|| {
                    error!(action = "connect", result = "fail", "{}", e);
                });
                e
            })?;

        self.drive(&mut transport, assembler, cancel).await
    }

    /// Submit `records` over an already connected stream.
    ///
    /// The transport is closed when this returns, whatever the outcome.
    pub async fn run_on<S>(
        &self,
        transport: &mut Transport<S>,
        records: &[BetRecord],
        cancel: &watch::Receiver<bool>,
    ) -> Result<Submission>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match BatchAssembler::new(records, self.sizing) {
            Ok(assembler) => self.drive(transport, assembler, cancel).await,
            Err(e) => {
                transport.close().await;
                Err(e)
            }
        }
    }

    async fn drive<S>(
        &self,
        transport: &mut Transport<S>,
        mut assembler: BatchAssembler,
        cancel: &watch::Receiver<bool>,
    ) -> Result<Submission>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        async move {
            if *cancel.borrow() {
                transport.close().await;
                info!(action = "shutdown", result = "success", "Cancelled before submission");
                return Ok(Submission::Cancelled);
            }

            let result = self.submit(transport, &mut assembler).await;
            transport.close().await;

            match result {
                Ok(report) => Ok(Submission::Completed(report)),
                Err(e) => {
                    let stage = e.stage().map_or("unknown".to_string(), |s| s.to_string());
                    error!(action = "submit", result = "fail", stage = %stage, "{}", e);
                    Err(e)
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }

    async fn submit<S>(
        &self,
        transport: &mut Transport<S>,
        assembler: &mut BatchAssembler,
    ) -> Result<SubmissionReport>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if self.send_metadata {
            // Batch sizes never exceed the ceiling, which fits in a u16.
            let metadata =
                BatchMetadata::new(self.sizing.batch_bytes() as u16, u16::from(self.house_id));
            transport.send_all(&metadata.encode()).await?;
            debug!(?metadata, "Sent batch metadata");
        }

        let mut reader = AckReader::new();
        let mut report = SubmissionReport::default();
        let mut end_acked = false;

        loop {
            let before = assembler.cursor();
            let chunk = match assembler.next_batch() {
                Batch::Chunk(chunk) => chunk,
                Batch::Exhausted => break,
            };

            transport.send_all(&chunk).await?;
            let expected = assembler.frames_completed_since(before);
            let round = reader.read_round(transport, expected).await?;

            for ack in &round.acks {
                if ack.is_accepted() {
                    report.accepted += 1;
                    info!(
                        action = "bet_sent",
                        result = "success",
                        national_id = ack.national_id,
                        bet_number = ack.bet_number
                    );
                } else {
                    report.rejected += 1;
                    warn!(
                        action = "bet_sent",
                        result = "fail",
                        national_id = ack.national_id,
                        bet_number = ack.bet_number,
                        status_code = ack.status_code
                    );
                }
            }

            if round.terminal {
                end_acked = true;
                if !assembler.is_exhausted() {
                    report.early_stop = true;
                    warn!(
                        sent = assembler.cursor(),
                        total = assembler.stream_len(),
                        "Server ended acknowledgments early, stopping submission"
                    );
                }
                break;
            }
        }

        if !end_acked {
            return Err(BetwireError::Protocol(
                "Submission finished without an end-of-acknowledgment".to_string(),
            ));
        }

        report.bets_sent = (assembler.cursor() / RECORD_WIDTH).min(assembler.record_count());

        let winners = WinnersReader::read(transport).await?;
        info!(
            action = "winners_query",
            result = "success",
            winners = winners.count()
        );
        report.winners = winners;

        Ok(report)
    }
}
