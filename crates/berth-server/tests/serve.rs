//! The server loop over a real socket

mod common;

use berth_server::serve;
use berth_store::MemoryPayloadStore;
use common::node;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

#[tokio::test]
async fn test_serves_until_shutdown() {
    let node = node(Arc::new(MemoryPayloadStore::new()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, node.router.clone(), async {
        let _ = stopped.await;
    }));

    let mut stream = TcpStream::connect(address).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(node.node.as_str()));

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}
