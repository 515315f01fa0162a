//! End-to-end tests over loopback TCP with real rustls engines.

use std::time::Duration;

use tls_stream::net::{connect, CloseOutcome, ReadOutcome};
use tls_stream::VerifyMode;

mod common;

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

#[tokio::test]
async fn round_trip_preserves_bytes_across_chunkings() {
    let pki = common::TestPki::generate();
    let listener = common::listener(pki.server_config(VerifyMode::None)).await;
    let addr = listener.local_addr().unwrap();

    let payload = pattern(48 * 1024 + 7);
    let expected = payload.len();

    let server = tokio::spawn(async move {
        let mut stream = listener.accept().await.unwrap();
        let mut echoed = 0;
        while echoed < expected {
            // Small reads force many record/chunk boundaries.
            let data = stream.read(777).await.unwrap().expect("early eof");
            echoed += stream.write(&data).await.unwrap();
        }
        stream.close().await
    });

    let mut client = connect(addr, "localhost", &pki.client_config(false))
        .await
        .unwrap();

    let mut offset = 0;
    for size in [1usize, 10, 100, 1000, 20_000].iter().cycle() {
        if offset >= payload.len() {
            break;
        }
        let end = (offset + size).min(payload.len());
        assert_eq!(client.write(&payload[offset..end]).await.unwrap(), end - offset);
        offset = end;
    }

    let mut received = Vec::new();
    while received.len() < expected {
        let data = client.read(16 * 1024).await.unwrap().expect("early eof");
        received.extend_from_slice(&data);
    }
    assert_eq!(received, payload);

    assert_eq!(client.close().await, CloseOutcome::Graceful);
    assert_eq!(server.await.unwrap(), CloseOutcome::Graceful);
}

#[tokio::test]
async fn large_write_returns_full_length() {
    let pki = common::TestPki::generate();
    let listener = common::listener(pki.server_config(VerifyMode::None)).await;
    let addr = listener.local_addr().unwrap();

    let payload = pattern(100_000);
    let expected = payload.len();

    let server = tokio::spawn(async move {
        let mut stream = listener.accept().await.unwrap();
        let mut received = Vec::new();
        while received.len() < expected {
            match stream.read(16 * 1024).await.unwrap() {
                Some(data) => received.extend_from_slice(&data),
                None => break,
            }
        }
        stream.close().await;
        received
    });

    let mut client = connect(addr, "localhost", &pki.client_config(false))
        .await
        .unwrap();
    assert_eq!(client.write(&payload).await.unwrap(), payload.len());

    assert_eq!(server.await.unwrap(), payload);
    client.close().await;
}

#[tokio::test]
async fn server_sees_memoized_client_certificate() {
    let pki = common::TestPki::generate();
    let listener = common::listener(pki.server_config(VerifyMode::PeerRequireCert)).await;
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let mut stream = listener.accept().await.unwrap();
        assert!(stream.peer_certificate().unwrap().is_none());

        let data = stream.read(1024).await.unwrap().unwrap();
        assert_eq!(data, b"hello");

        let first = stream.peer_certificate().unwrap().expect("client cert");
        let second = stream.peer_certificate().unwrap().expect("client cert");
        assert!(std::sync::Arc::ptr_eq(&first, &second));
        assert_eq!(first.subject(), "CN=client.test");
        assert_eq!(first.issuer(), "CN=tls-stream test CA");

        stream.write(b"world").await.unwrap();
        assert_eq!(stream.read(1024).await.unwrap(), None);
        stream.close().await
    });

    let mut client = connect(addr, "localhost", &pki.client_config(true))
        .await
        .unwrap();
    client.write(b"hello").await.unwrap();
    assert_eq!(client.read(1024).await.unwrap().unwrap(), b"world");

    let server_cert = client.peer_certificate().unwrap().expect("server cert");
    assert_eq!(server_cert.subject(), "CN=localhost");

    assert_eq!(client.close().await, CloseOutcome::Graceful);
    assert_eq!(server.await.unwrap(), CloseOutcome::Graceful);
}

#[tokio::test]
async fn server_without_verification_has_no_peer_certificate() {
    let pki = common::TestPki::generate();
    let listener = common::listener(pki.server_config(VerifyMode::None)).await;
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let mut stream = listener.accept().await.unwrap();
        let data = stream.read(1024).await.unwrap().unwrap();
        stream.write(&data).await.unwrap();
        let cert = stream.peer_certificate().unwrap();
        assert_eq!(stream.read(1024).await.unwrap(), None);
        stream.close().await;
        cert
    });

    // Client presents a certificate the server never asked for.
    let mut client = connect(addr, "localhost", &pki.client_config(true))
        .await
        .unwrap();
    client.write(b"x").await.unwrap();
    client.read(1024).await.unwrap().unwrap();
    client.close().await;

    assert!(server.await.unwrap().is_none());
}

#[tokio::test]
async fn required_client_certificate_missing_fails_read() {
    let pki = common::TestPki::generate();
    let listener = common::listener(pki.server_config(VerifyMode::PeerRequireCert)).await;
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let mut stream = listener.accept().await.unwrap();
        let result = stream.read(1024).await;
        stream.close().await;
        result.is_err()
    });

    let mut client = connect(addr, "localhost", &pki.client_config(false))
        .await
        .unwrap();
    let _ = client.write(b"no cert").await;
    let _ = client.read(1024).await;
    client.close().await;

    assert!(server.await.unwrap(), "server read should fail without client cert");
}

#[tokio::test]
async fn peer_closes_without_data() {
    let pki = common::TestPki::generate();
    let listener = common::listener(pki.server_config(VerifyMode::None)).await;
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let mut stream = listener.accept().await.unwrap();
        let read = stream.read(1024).await.unwrap();
        (read, stream.close().await)
    });

    let mut client = connect(addr, "localhost", &pki.client_config(false))
        .await
        .unwrap();
    // An empty write performs no I/O; flush pushes the ClientHello out so
    // close has a handshake to finish.
    assert_eq!(client.write(b"").await.unwrap(), 0);
    client.flush().await.unwrap();
    let client_outcome = tokio::time::timeout(Duration::from_secs(5), client.close())
        .await
        .unwrap();

    let (read, server_outcome) = server.await.unwrap();
    assert_eq!(read, None);
    assert_eq!(server_outcome, CloseOutcome::Graceful);
    assert_eq!(client_outcome, CloseOutcome::Graceful);
}

#[tokio::test]
async fn large_read_takes_bulk_data_in_one_go() {
    let pki = common::TestPki::generate();
    let listener = common::listener(pki.server_config(VerifyMode::None)).await;
    let addr = listener.local_addr().unwrap();

    let payload = pattern(100_000);
    let expected = payload.clone();

    let server = tokio::spawn(async move {
        let mut stream = listener.accept().await.unwrap();
        assert_eq!(stream.read(1024).await.unwrap().unwrap(), b"hi");
        stream.write(b"ok").await.unwrap();

        // Let the bulk transfer pile up in the socket before reading it.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let mut received = Vec::new();
        while received.len() < expected.len() {
            let data = stream.read(1 << 20).await.unwrap().expect("early eof");
            received.extend_from_slice(&data);
        }
        assert_eq!(received, expected);
        stream.close().await
    });

    let mut client = connect(addr, "localhost", &pki.client_config(false))
        .await
        .unwrap();
    client.write(b"hi").await.unwrap();
    assert_eq!(client.read(1024).await.unwrap().unwrap(), b"ok");
    assert_eq!(client.write(&payload).await.unwrap(), payload.len());

    assert_eq!(client.close().await, CloseOutcome::Graceful);
    assert_eq!(server.await.unwrap(), CloseOutcome::Graceful);
}

#[tokio::test]
async fn close_discards_unread_bulk_data() {
    let pki = common::TestPki::generate();
    let listener = common::listener(pki.server_config(VerifyMode::None)).await;
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let mut stream = listener.accept().await.unwrap();
        assert_eq!(stream.read(1024).await.unwrap().unwrap(), b"hi");
        stream.write(b"ok").await.unwrap();
        stream.write(&pattern(64 * 1024)).await.unwrap();
        stream.close().await
    });

    let mut client = connect(addr, "localhost", &pki.client_config(false))
        .await
        .unwrap();
    client.write(b"hi").await.unwrap();
    assert_eq!(client.read(1024).await.unwrap().unwrap(), b"ok");

    // The 64 KiB and the server's close-notify arrive while we never read.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let client_outcome = tokio::time::timeout(Duration::from_secs(5), client.close())
        .await
        .unwrap();

    assert_eq!(client_outcome, CloseOutcome::Graceful);
    assert_eq!(server.await.unwrap(), CloseOutcome::Graceful);
}

#[tokio::test]
async fn nonblocking_read_retries_on_readiness_until_payload_arrives() {
    let pki = common::TestPki::generate();
    let listener = common::listener(pki.server_config(VerifyMode::None)).await;
    let addr = listener.local_addr().unwrap();

    let payload = pattern(40_000);
    let expected = payload.clone();
    let (go_tx, go_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let mut stream = listener.accept().await.unwrap();
        assert_eq!(stream.read(1024).await.unwrap().unwrap(), b"hi");
        stream.write(b"ok").await.unwrap();

        // Nothing has been sent yet.
        assert_eq!(
            stream.read_nonblocking(1 << 20).await.unwrap(),
            ReadOutcome::WouldBlock
        );
        go_tx.send(()).unwrap();

        let mut received = Vec::new();
        while received.len() < expected.len() {
            match stream.read_nonblocking(1 << 20).await.unwrap() {
                ReadOutcome::Data(data) => received.extend_from_slice(&data),
                ReadOutcome::WouldBlock => stream.get_ref().readable().await.unwrap(),
                ReadOutcome::Eof => panic!("early eof"),
            }
        }
        assert_eq!(received, expected);

        stream.write(b"done").await.unwrap();
        stream.close().await
    });

    let mut client = connect(addr, "localhost", &pki.client_config(false))
        .await
        .unwrap();
    client.write(b"hi").await.unwrap();
    assert_eq!(client.read(1024).await.unwrap().unwrap(), b"ok");

    go_rx.await.unwrap();
    assert_eq!(client.write(&payload).await.unwrap(), payload.len());
    assert_eq!(client.read(1024).await.unwrap().unwrap(), b"done");

    assert_eq!(client.close().await, CloseOutcome::Graceful);
    assert_eq!(server.await.unwrap(), CloseOutcome::Graceful);
}
