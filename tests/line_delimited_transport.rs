//! Persistent newline-delimited connections

mod common;

use std::time::Duration;

use common::{SimpleAddService, TestServer};
use ferrule_server::prelude::*;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

type Lines = Framed<TcpStream, LinesCodec>;

async fn connect(server: &TestServer) -> Lines {
    let stream = TcpStream::connect(server.addr).await.unwrap();
    Framed::new(stream, LinesCodec::new())
}

async fn roundtrip(lines: &mut Lines, request: &str) -> Value {
    lines.send(request).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(5), lines.next())
        .await
        .expect("reply in time")
        .expect("connection open")
        .unwrap();
    serde_json::from_str(&reply).unwrap()
}

async fn assert_closed(lines: &mut Lines) {
    let next = tokio::time::timeout(Duration::from_secs(5), lines.next())
        .await
        .expect("server should close the connection");
    assert!(next.is_none() || next.is_some_and(|line| line.is_err()));
}

#[tokio::test]
async fn test_many_requests_on_one_connection() {
    let server = TestServer::simple(ConnectionMode::LineDelimited).await;
    let mut lines = connect(&server).await;

    for i in 0..5 {
        let reply = roundtrip(&mut lines, &format!(r#"{{"method":"add","params":[{},1],"id":{}}}"#, i, i)).await;
        assert_eq!(reply, json!({"jsonrpc": "2.0", "result": i + 1, "id": i}));
    }

    let reply = roundtrip(&mut lines, r#"[{"method":"subtract","params":{"a":5}},{"method":"unknown"}]"#).await;
    assert_eq!(reply[0]["result"], 4);
    assert_eq!(reply[1]["error"]["code"], -32601);

    drop(lines);
    server.stop().await;
}

#[tokio::test]
async fn test_errors_keep_the_connection_open() {
    let server = TestServer::simple(ConnectionMode::LineDelimited).await;
    let mut lines = connect(&server).await;

    assert_eq!(roundtrip(&mut lines, "{oops").await["error"]["code"], -32700);
    assert_eq!(roundtrip(&mut lines, r#"{"method":"throws"}"#).await["error"]["code"], -32603);
    assert_eq!(roundtrip(&mut lines, r#"{"method":"add","params":{"a":2,"b":3}}"#).await["result"], 5);

    drop(lines);
    server.stop().await;
}

#[tokio::test]
async fn test_blank_and_padded_lines() {
    let server = TestServer::simple(ConnectionMode::LineDelimited).await;
    let mut lines = connect(&server).await;

    lines.send("").await.unwrap();
    let reply = roundtrip(&mut lines, "\0\0{\"method\":\"echo\",\"params\":[\"hi\"]}\0\0").await;
    assert_eq!(reply["result"], "hi");

    drop(lines);
    server.stop().await;
}

#[tokio::test]
async fn test_strict_notifications_are_silent() {
    let server = TestServer::start(
        RpcServer::builder()
            .service(SimpleAddService)
            .connection_mode(ConnectionMode::LineDelimited)
            .strict_notifications(true),
    )
    .await;
    let mut lines = connect(&server).await;

    lines.send(r#"{"method":"add","params":[1,1]}"#).await.unwrap();
    lines.send(r#"[{"method":"add","params":[1,1]}]"#).await.unwrap();
    // The first line read back answers the request with an id
    let reply = roundtrip(&mut lines, r#"{"method":"add","params":[2,2],"id":9}"#).await;
    assert_eq!(reply["id"], 9);
    assert_eq!(reply["result"], 4);

    drop(lines);
    server.stop().await;
}

#[tokio::test]
async fn test_oversized_line_closes_connection() {
    let server = TestServer::start(
        RpcServer::builder()
            .service(SimpleAddService)
            .connection_mode(ConnectionMode::LineDelimited)
            .max_request_bytes(128),
    )
    .await;
    let mut lines = connect(&server).await;

    let reply = roundtrip(&mut lines, &format!(r#"{{"method":"echo","params":["{}"]}}"#, "z".repeat(200))).await;
    assert_eq!(reply["error"]["code"], -32600);
    assert_closed(&mut lines).await;

    server.stop().await;
}

#[tokio::test]
async fn test_invalid_utf8_line() {
    let server = TestServer::simple(ConnectionMode::LineDelimited).await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"{\"method\":\"\xff\"}\n").await.unwrap();

    let mut lines = Framed::new(stream, LinesCodec::new());
    let reply = lines.next().await.unwrap().unwrap();
    let reply: Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(reply["error"]["code"], -32700);
    assert_closed(&mut lines).await;

    server.stop().await;
}

#[tokio::test]
async fn test_idle_connection_is_dropped() {
    let server = TestServer::start(
        RpcServer::builder()
            .service(SimpleAddService)
            .connection_mode(ConnectionMode::LineDelimited)
            .read_timeout(Duration::from_millis(100)),
    )
    .await;
    let mut lines = connect(&server).await;

    assert_eq!(roundtrip(&mut lines, r#"{"method":"add","params":[1,2]}"#).await["result"], 3);
    assert_closed(&mut lines).await;

    server.stop().await;
}
