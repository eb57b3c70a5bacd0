//! Integration tests for the WebSocket transport.
//!
//! Each test binds a real listener on an OS-assigned port and drives it
//! with a plain `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use huddle_transport::{
        Connection, FrameSink, FrameSource, Incoming, Transport, WebSocketConnection,
        WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs =
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

    /// Binds a transport, connects one client, returns both ends.
    async fn connected_pair() -> (WebSocketTransport, WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address");

        let client = tokio::spawn(async move {
            let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");
            ws
        });
        let incoming = transport.accept().await.expect("should accept");
        let server_conn = incoming.upgrade().await.expect("should upgrade");
        let client_ws = client.await.expect("client task");
        (transport, server_conn, client_ws)
    }

    #[tokio::test]
    async fn test_websocket_split_send_and_receive() {
        let (_transport, conn, mut client) = connected_pair().await;
        assert!(conn.peer_addr().ip().is_loopback());
        let (mut sink, mut source) = conn.split();

        sink.send(b"hello from host").await.expect("send");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from host");

        client
            .send(Message::Binary(b"hello from client".to_vec().into()))
            .await
            .unwrap();
        let received = source.recv().await.expect("recv").expect("frame");
        assert_eq!(received, b"hello from client");

        sink.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_websocket_text_frames_are_delivered_as_bytes() {
        let (_transport, conn, mut client) = connected_pair().await;
        let (_sink, mut source) = conn.split();

        client.send(Message::text(r#"{"type":"Bye"}"#)).await.unwrap();
        let received = source.recv().await.unwrap().unwrap();
        assert_eq!(received, br#"{"type":"Bye"}"#);
    }

    #[tokio::test]
    async fn test_websocket_halves_work_concurrently() {
        // A reader parked in recv() must not block the writer.
        let (_transport, conn, mut client) = connected_pair().await;
        let (mut sink, mut source) = conn.split();

        let reader = tokio::spawn(async move { source.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        sink.send(b"while reading").await.expect("send during recv");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"while reading");

        client.send(Message::Binary(b"done".to_vec().into())).await.unwrap();
        let got = reader.await.unwrap().unwrap().unwrap();
        assert_eq!(got, b"done");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (_transport, conn, mut client) = connected_pair().await;
        let (_sink, mut source) = conn.split();

        client.send(Message::Close(None)).await.unwrap();

        let result = source.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_connection_ids_are_sequential() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        let clients = tokio::spawn(async move {
            let mut held = Vec::new();
            for _ in 0..2 {
                let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
                    .await
                    .unwrap();
                held.push(ws);
            }
            held
        });

        let first = transport.accept().await.unwrap();
        assert_eq!(first.id().into_inner(), 1);
        let first = first.upgrade().await.unwrap();
        let second = transport.accept().await.unwrap().upgrade().await.unwrap();
        assert_eq!(first.id().into_inner(), 1);
        assert_eq!(second.id().into_inner(), 2);
        drop(clients.await.unwrap());
    }

    #[tokio::test]
    async fn test_websocket_accept_does_not_wait_for_handshake() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        // Connects but never sends the upgrade request.
        let _silent = tokio::net::TcpStream::connect(addr).await.unwrap();
        let stalled = transport.accept().await.unwrap();
        let stalled = tokio::spawn(stalled.upgrade());

        let client = tokio::spawn(async move {
            tokio_tungstenite::connect_async(format!("ws://{addr}")).await
        });
        let incoming = tokio::time::timeout(Duration::from_secs(3), transport.accept())
            .await
            .expect("second peer accepted while the first is silent")
            .unwrap();
        let conn = incoming.upgrade().await.unwrap();
        assert_eq!(conn.id().into_inner(), 2);
        assert!(client.await.unwrap().is_ok());
        assert!(!stalled.is_finished());
        stalled.abort();
    }
}
