//! Integration tests for the transform client against a loopback server.

use std::{num::NonZeroUsize, time::Duration};

use rand::{RngCore, SeedableRng, rngs::StdRng};
use rstest::rstest;
use sreeify::{
    Transform,
    client::{TransformClient, TransformError},
};
use sreeify_testing::{LoggerHandle, ReplyOrder, ServerMode, ServerOptions, TransformServer, logger};

fn size(n: usize) -> NonZeroUsize { NonZeroUsize::new(n).expect("non-zero size") }

async fn client_for(server: &TransformServer) -> TransformClient {
    TransformClient::builder(server.target())
        .insecure(true)
        .connect()
        .await
        .expect("connect to loopback server")
}

fn random_payload(len: usize, seed: u64) -> Vec<u8> {
    let mut data = vec![0; len];
    StdRng::seed_from_u64(seed).fill_bytes(&mut data);
    data
}

#[tokio::test]
async fn transform_returns_service_output() {
    let server = TransformServer::start(ServerOptions::uppercase())
        .await
        .expect("start server");
    let client = client_for(&server).await;

    let out = client
        .transform(b"<p>hello sree</p>".to_vec())
        .await
        .expect("transform");
    assert_eq!(out, b"<P>HELLO SREE</P>");
}

#[tokio::test]
async fn empty_payload_round_trips() {
    let server = TransformServer::start(ServerOptions::uppercase())
        .await
        .expect("start server");
    let client = client_for(&server).await;

    let out = client.transform(Vec::new()).await.expect("transform");
    assert!(out.is_empty());
    assert_eq!(server.chunks(), 1);
}

#[rstest]
#[case(ReplyOrder::InOrder)]
#[case(ReplyOrder::Reversed)]
#[tokio::test]
async fn multi_chunk_payloads_reassemble(#[case] order: ReplyOrder) {
    let server = TransformServer::start(
        ServerOptions::transform(<[u8]>::to_vec)
            .reply_order(order)
            .chunk_size(size(700)),
    )
    .await
    .expect("start server");
    let client = TransformClient::builder(server.target())
        .insecure(true)
        .chunk_size(size(1024))
        .connect()
        .await
        .expect("connect");

    let payload = random_payload(10 * 1024 + 17, 11);
    let out = client.transform(payload.clone()).await.expect("transform");
    assert_eq!(out, payload);
    assert_eq!(server.chunks(), 11);
}

#[rstest]
#[tokio::test]
async fn stray_chunks_are_dropped(mut logger: LoggerHandle) {
    let server = TransformServer::start(ServerOptions::uppercase().stray_chunk(true))
        .await
        .expect("start server");
    let client = client_for(&server).await;

    let out = client.transform(b"abc".to_vec()).await.expect("transform");
    assert_eq!(out, b"ABC");
    assert!(
        !logger
            .take_matching(log::Level::Debug, "dropping chunk for unknown request")
            .is_empty(),
        "stray chunk not reported"
    );
}

#[tokio::test]
async fn silent_server_times_out() {
    let server = TransformServer::start(ServerOptions::with_mode(ServerMode::Silent))
        .await
        .expect("start server");
    let client = TransformClient::builder(server.target())
        .insecure(true)
        .request_timeout(Some(Duration::from_millis(100)))
        .connect()
        .await
        .expect("connect");

    let err = client
        .transform(b"anyone there?".to_vec())
        .await
        .expect_err("no reply expected");
    assert!(matches!(
        err,
        TransformError::Timeout { after, .. } if after == Duration::from_millis(100)
    ));
    assert_eq!(client.in_flight().await, 0);
}

#[tokio::test]
async fn dropped_call_releases_its_request() {
    let server = TransformServer::start(ServerOptions::with_mode(ServerMode::Silent))
        .await
        .expect("start server");
    let client = TransformClient::builder(server.target())
        .insecure(true)
        .request_timeout(None)
        .connect()
        .await
        .expect("connect");

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), client.transform(b"x".to_vec())).await;
    assert!(abandoned.is_err(), "silent server replied");
    assert_eq!(client.in_flight().await, 0);
}

#[tokio::test]
async fn keepalive_records_round_trip() {
    let server = TransformServer::start(ServerOptions::uppercase())
        .await
        .expect("start server");
    let client = TransformClient::builder(server.target())
        .insecure(true)
        .ping_interval(Some(Duration::from_millis(20)))
        .connect()
        .await
        .expect("connect");
    assert_eq!(client.last_round_trip(), None);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while client.last_round_trip().is_none() {
        assert!(tokio::time::Instant::now() < deadline, "no ping echo recorded");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(server.pings() >= 1);
}

#[tokio::test]
async fn unanswered_pings_leave_round_trip_unset() {
    let server = TransformServer::start(ServerOptions::uppercase().echo_pings(false))
        .await
        .expect("start server");
    let client = TransformClient::builder(server.target())
        .insecure(true)
        .ping_interval(Some(Duration::from_millis(20)))
        .connect()
        .await
        .expect("connect");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while server.pings() < 3 {
        assert!(tokio::time::Instant::now() < deadline, "pings never arrived");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(client.last_round_trip(), None);
    let out = client.transform(b"still up".to_vec()).await.expect("transform");
    assert_eq!(out, b"STILL UP");
}

#[tokio::test]
async fn client_is_usable_through_transform_trait() {
    async fn run(service: &dyn Transform, input: &[u8]) -> Vec<u8> {
        service.transform(input.to_vec()).await.expect("transform")
    }

    let server = TransformServer::start(ServerOptions::uppercase())
        .await
        .expect("start server");
    let client = client_for(&server).await;
    assert_eq!(run(&client, b"trait").await, b"TRAIT");
}
