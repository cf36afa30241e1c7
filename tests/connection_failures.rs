//! Connection establishment and loss.

use std::{sync::Arc, time::Duration};

use sreeify::{
    client::{TransformClient, TransformError},
    transport::{BackoffConfig, ConnectError},
};
use sreeify_testing::{ServerMode, ServerOptions, TransformServer};
use tokio::net::TcpListener;

fn quick_backoff(max_attempts: u32) -> BackoffConfig {
    BackoffConfig {
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        max_attempts,
        ..BackoffConfig::default()
    }
}

async fn wait_for_chunks(server: &TransformServer, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while server.chunks() < expected {
        assert!(tokio::time::Instant::now() < deadline, "chunks never arrived");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn connect_fails_after_exhausting_attempts() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind placeholder listener");
    let target = listener.local_addr().expect("placeholder address").to_string();
    drop(listener);

    let err = TransformClient::builder(target)
        .insecure(true)
        .backoff(quick_backoff(2))
        .connect()
        .await
        .expect_err("nothing is listening");
    assert!(matches!(
        err,
        TransformError::Connect(ConnectError::Exhausted { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn server_closing_mid_request_fails_the_call() {
    let server = TransformServer::start(ServerOptions::with_mode(ServerMode::CloseOnFirstChunk))
        .await
        .expect("start server");
    let client = TransformClient::builder(server.target())
        .insecure(true)
        .backoff(quick_backoff(2))
        .connect()
        .await
        .expect("connect");

    let err = client
        .transform(b"doomed".to_vec())
        .await
        .expect_err("server hangs up");
    assert!(matches!(err, TransformError::ConnectionClosed));
}

#[tokio::test]
async fn next_call_redials_a_dead_connection() {
    let server = TransformServer::start(ServerOptions::with_mode(ServerMode::CloseOnFirstChunk))
        .await
        .expect("start server");
    let client = TransformClient::builder(server.target())
        .insecure(true)
        .backoff(quick_backoff(2))
        .connect()
        .await
        .expect("connect");

    let first = client.transform(b"one".to_vec()).await;
    assert!(matches!(first, Err(TransformError::ConnectionClosed)));

    let second = client.transform(b"two".to_vec()).await;
    assert!(matches!(second, Err(TransformError::ConnectionClosed)));
    assert_eq!(server.connections(), 2);
}

#[tokio::test]
async fn server_shutdown_fails_pending_requests() {
    let server = TransformServer::start(ServerOptions::with_mode(ServerMode::Silent))
        .await
        .expect("start server");
    let client = Arc::new(
        TransformClient::builder(server.target())
            .insecure(true)
            .request_timeout(None)
            .connect()
            .await
            .expect("connect"),
    );

    let pending = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.transform(b"waiting".to_vec()).await })
    };
    wait_for_chunks(&server, 1).await;
    server.shutdown().await;

    let outcome = pending.await.expect("join transform");
    assert!(matches!(outcome, Err(TransformError::ConnectionClosed)));
}

#[tokio::test]
async fn closing_the_client_fails_pending_requests() {
    let server = TransformServer::start(ServerOptions::with_mode(ServerMode::Silent))
        .await
        .expect("start server");
    let client = Arc::new(
        TransformClient::builder(server.target())
            .insecure(true)
            .request_timeout(None)
            .connect()
            .await
            .expect("connect"),
    );

    let pending = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.transform(b"waiting".to_vec()).await })
    };
    wait_for_chunks(&server, 1).await;
    client.close().await;

    let outcome = pending.await.expect("join transform");
    assert!(matches!(outcome, Err(TransformError::ConnectionClosed)));
    assert_eq!(client.in_flight().await, 0);
}
