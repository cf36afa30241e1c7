//! Concurrent requests sharing one connection.

use std::{num::NonZeroUsize, sync::Arc};

use futures::future::join_all;
use sreeify::client::TransformClient;
use sreeify_testing::{ReplyOrder, ServerOptions, TransformServer};

fn tagged_payload(index: usize, len: usize) -> Vec<u8> {
    (0..len)
        .map(|offset| u8::try_from((index * 31 + offset) % 251).expect("below 251"))
        .collect()
}

#[tokio::test]
async fn concurrent_transforms_share_one_connection() {
    let server = TransformServer::start(
        ServerOptions::transform(|input: &[u8]| input.iter().rev().copied().collect())
            .reply_order(ReplyOrder::Reversed)
            .chunk_size(NonZeroUsize::new(333).expect("non-zero")),
    )
    .await
    .expect("start server");
    let client = Arc::new(
        TransformClient::builder(server.target())
            .insecure(true)
            .chunk_size(NonZeroUsize::new(512).expect("non-zero"))
            .connect()
            .await
            .expect("connect"),
    );

    let calls = (0..24).map(|index| {
        let client = Arc::clone(&client);
        let payload = tagged_payload(index, 200 + index * 97);
        tokio::spawn(async move {
            let out = client.transform(payload.clone()).await;
            (payload, out)
        })
    });

    for joined in join_all(calls).await {
        let (payload, out) = joined.expect("join transform task");
        let expected: Vec<u8> = payload.iter().rev().copied().collect();
        assert_eq!(out.expect("transform"), expected);
    }
    assert_eq!(server.connections(), 1);
    assert_eq!(client.in_flight().await, 0);
}
