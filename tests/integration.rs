//! End-to-end tests for betwire-client.
//!
//! Each test runs a scripted server on a loopback listener and drives a
//! real [`Client`] against it.

use betwire_client::protocol::{
    is_end_of_submission, BatchMetadata, BetRecord, END_OF_ACKS, METADATA_SIZE, RECORD_WIDTH,
};
use betwire_client::{BetwireError, Client, Stage, Submission};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

fn bet(house_id: u8, n: u32) -> BetRecord {
    BetRecord {
        house_id,
        name: "Santiago Lionel".to_string(),
        last_name: "Lorca".to_string(),
        national_id: 30_000_000 + n,
        birth_date: "1999-03-17".to_string(),
        bet_number: n,
    }
}

fn ack(bet: &BetRecord, status: u8) -> Vec<u8> {
    let mut frame = bet.national_id.to_be_bytes().to_vec();
    frame.extend_from_slice(&bet.bet_number.to_be_bytes());
    frame.push(status);
    frame
}

fn winners_payload(ids: &[u32]) -> Vec<u8> {
    let mut out = ((ids.len() * 4) as u16).to_be_bytes().to_vec();
    for id in ids {
        out.extend_from_slice(&id.to_be_bytes());
    }
    out
}

async fn listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    (listener, address)
}

/// What the lottery server records while serving one agency.
#[derive(Debug, Default)]
struct ServerLog {
    metadata: Option<BatchMetadata>,
    batches: Vec<Vec<BetRecord>>,
    saw_end: bool,
}

/// Serve one agency the way the lottery server does: ack every bet of a
/// batch, accepting even bet numbers, then send the accepted national ids
/// as winners once the end of submission arrives.
async fn serve_agency(mut socket: TcpStream) -> ServerLog {
    let mut log = ServerLog::default();

    let mut preamble = [0u8; METADATA_SIZE];
    socket.read_exact(&mut preamble).await.unwrap();
    let metadata = BatchMetadata::decode(&preamble).unwrap();
    let per_batch = metadata.batch_byte_size as usize / RECORD_WIDTH;
    log.metadata = Some(metadata);

    let mut winners = Vec::new();
    while !log.saw_end {
        let mut batch = Vec::new();
        let mut reply = Vec::new();

        for _ in 0..per_batch {
            let mut frame = [0u8; RECORD_WIDTH];
            socket.read_exact(&mut frame).await.unwrap();
            if is_end_of_submission(&frame) {
                log.saw_end = true;
                break;
            }

            let bet = BetRecord::decode(&frame).unwrap();
            let accepted = bet.bet_number % 2 == 0;
            reply.extend_from_slice(&ack(&bet, u8::from(accepted)));
            if accepted {
                winners.push(bet.national_id);
            }
            batch.push(bet);
        }

        if log.saw_end {
            reply.extend_from_slice(&END_OF_ACKS);
        }
        socket.write_all(&reply).await.unwrap();
        log.batches.push(batch);
    }

    socket.write_all(&winners_payload(&winners)).await.unwrap();
    log
}

#[tokio::test]
async fn test_full_submission_over_tcp() {
    let (listener, address) = listener().await;
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        serve_agency(socket).await
    });

    let records: Vec<BetRecord> = (1..=5).map(|n| bet(7, n)).collect();
    let client = Client::builder()
        .id("7")
        .server_address(address)
        .records_per_batch(2)
        .build()
        .unwrap();
    let (_tx, cancel) = watch::channel(false);

    let outcome = client.run(&records, &cancel).await.unwrap();
    let log = server.await.unwrap();

    let metadata = log.metadata.unwrap();
    assert_eq!(metadata.batch_byte_size as usize, 2 * RECORD_WIDTH);
    assert_eq!(metadata.house_id, 7);

    // 5 bets + sentinel in frames of two: [1,2] [3,4] [5,END]
    assert_eq!(log.batches.len(), 3);
    assert_eq!(log.batches[2].len(), 1);
    assert!(log.saw_end);
    let received: Vec<BetRecord> = log.batches.into_iter().flatten().collect();
    assert_eq!(received, records);

    match outcome {
        Submission::Completed(report) => {
            assert_eq!(report.bets_sent, 5);
            assert_eq!(report.accepted, 2);
            assert_eq!(report.rejected, 3);
            assert!(!report.early_stop);
            assert_eq!(report.winners.ids(), &[30_000_002, 30_000_004]);
        }
        Submission::Cancelled => panic!("not cancelled"),
    }
}

#[tokio::test]
async fn test_single_batch_holds_everything() {
    let (listener, address) = listener().await;
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        serve_agency(socket).await
    });

    let records: Vec<BetRecord> = (10..20).map(|n| bet(1, n)).collect();
    let client = Client::builder()
        .id("1")
        .server_address(address)
        .build()
        .unwrap();
    let (_tx, cancel) = watch::channel(false);

    let outcome = client.run(&records, &cancel).await.unwrap();
    let log = server.await.unwrap();

    assert_eq!(log.batches.len(), 1);
    assert_eq!(log.batches[0].len(), 10);
    match outcome {
        Submission::Completed(report) => {
            assert_eq!(report.bets_sent, 10);
            assert_eq!(report.accepted, 5);
            assert_eq!(report.winners.count(), 5);
        }
        Submission::Cancelled => panic!("not cancelled"),
    }
}

#[tokio::test]
async fn test_server_ends_acknowledgments_early() {
    let (listener, address) = listener().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut preamble = [0u8; METADATA_SIZE];
        socket.read_exact(&mut preamble).await.unwrap();

        let mut frames = [0u8; 2 * RECORD_WIDTH];
        socket.read_exact(&mut frames).await.unwrap();
        let first = BetRecord::decode(&frames[..RECORD_WIDTH]).unwrap();

        // One ack, the end sentinel and the winners all in one write.
        let mut reply = ack(&first, 1);
        reply.extend_from_slice(&END_OF_ACKS);
        reply.extend_from_slice(&winners_payload(&[first.national_id]));
        socket.write_all(&reply).await.unwrap();

        // Nothing else arrives from the client.
        let mut rest = Vec::new();
        socket.read_to_end(&mut rest).await.unwrap();
        rest
    });

    let records: Vec<BetRecord> = (1..=6).map(|n| bet(3, n)).collect();
    let client = Client::builder()
        .id("3")
        .server_address(address)
        .records_per_batch(2)
        .build()
        .unwrap();
    let (_tx, cancel) = watch::channel(false);

    let outcome = client.run(&records, &cancel).await.unwrap();
    let rest = server.await.unwrap();
    assert!(rest.is_empty());

    match outcome {
        Submission::Completed(report) => {
            assert!(report.early_stop);
            assert_eq!(report.bets_sent, 2);
            assert_eq!(report.accepted, 1);
            assert_eq!(report.rejected, 0);
            assert_eq!(report.winners.ids(), &[30_000_001]);
        }
        Submission::Cancelled => panic!("not cancelled"),
    }
}

#[tokio::test]
async fn test_cancelled_client_sends_nothing() {
    let (listener, address) = listener().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        socket.read_to_end(&mut received).await.unwrap();
        received
    });

    let client = Client::builder()
        .id("2")
        .server_address(address)
        .build()
        .unwrap();
    let (_tx, cancel) = watch::channel(true);

    let outcome = client.run(&[bet(2, 1)], &cancel).await.unwrap();
    assert_eq!(outcome, Submission::Cancelled);
    assert!(server.await.unwrap().is_empty());
}

#[tokio::test]
async fn test_server_hangs_up_mid_submission() {
    let (listener, address) = listener().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut preamble = [0u8; METADATA_SIZE];
        socket.read_exact(&mut preamble).await.unwrap();
        let mut frames = [0u8; 2 * RECORD_WIDTH];
        socket.read_exact(&mut frames).await.unwrap();

        // Stop writing without acknowledging anything, then wait for the
        // client to release its end.
        socket.shutdown().await.unwrap();
        let mut rest = Vec::new();
        socket.read_to_end(&mut rest).await.unwrap();
        rest
    });

    let client = Client::builder()
        .id("4")
        .server_address(address)
        .build()
        .unwrap();
    let (_tx, cancel) = watch::channel(false);

    let err = client.run(&[bet(4, 1)], &cancel).await.unwrap_err();
    assert!(err.is_connection());
    assert_eq!(err.stage(), Some(Stage::Receive));

    assert!(server.await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_end_of_acks_closes_connection() {
    let (listener, address) = listener().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut preamble = [0u8; METADATA_SIZE];
        socket.read_exact(&mut preamble).await.unwrap();
        let mut frames = [0u8; 2 * RECORD_WIDTH];
        socket.read_exact(&mut frames).await.unwrap();
        let first = BetRecord::decode(&frames[..RECORD_WIDTH]).unwrap();

        // Ack the sentinel frame as if it were a bet.
        let mut reply = ack(&first, 1);
        reply.extend_from_slice(&ack(&first, 1));
        socket.write_all(&reply).await.unwrap();

        let mut rest = Vec::new();
        socket.read_to_end(&mut rest).await.unwrap();
        rest
    });

    let client = Client::builder()
        .id("4")
        .server_address(address)
        .build()
        .unwrap();
    let (_tx, cancel) = watch::channel(false);

    let err = client.run(&[bet(4, 1)], &cancel).await.unwrap_err();
    assert!(matches!(err, BetwireError::Protocol(_)));

    assert!(server.await.unwrap().is_empty());
}

#[tokio::test]
async fn test_connect_refused() {
    let (listener, address) = listener().await;
    drop(listener);

    let client = Client::builder()
        .id("5")
        .server_address(address)
        .build()
        .unwrap();
    let (_tx, cancel) = watch::channel(false);

    let err = client.run(&[bet(5, 1)], &cancel).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Connect));
}

#[tokio::test]
async fn test_oversized_field_never_connects() {
    let (listener, address) = listener().await;

    let mut bad = bet(6, 1);
    bad.name = "N".repeat(31);

    let client = Client::builder()
        .id("6")
        .server_address(address)
        .build()
        .unwrap();
    let (_tx, cancel) = watch::channel(false);

    let err = client.run(&[bad], &cancel).await.unwrap_err();
    assert!(matches!(err, BetwireError::Encoding { field: "name", .. }));

    // No connection was ever attempted.
    let accepted = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        listener.accept(),
    )
    .await;
    assert!(accepted.is_err());
}
