//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and drive it with
//! a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;
    use tourney_transport::{
        Connection, Incoming, Transport, TransportError, WebSocketConnection,
        WebSocketTransport,
    };

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect_client(addr: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws
    }

    async fn bound() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    async fn accept_one(transport: &mut WebSocketTransport) -> WebSocketConnection {
        transport
            .accept()
            .await
            .expect("should accept")
            .establish()
            .await
            .expect("should upgrade")
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bound().await;

        let server_handle = tokio::spawn(async move {
            accept_one(&mut transport).await
        });
        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.expect("task should complete");

        assert_eq!(server_conn.id().as_str().len(), 32);

        server_conn
            .send(b"hello from server")
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from server");

        client_ws
            .send(Message::Binary(b"hello from client".to_vec().into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_send_is_not_blocked_by_pending_recv() {
        let (mut transport, addr) = bound().await;

        let server_handle = tokio::spawn(async move {
            accept_one(&mut transport).await
        });
        let mut client_ws = connect_client(&addr).await;
        let server_conn =
            std::sync::Arc::new(server_handle.await.expect("accepted"));

        // Park a reader on the connection, then send from another task.
        let reader = std::sync::Arc::clone(&server_conn);
        let pending = tokio::spawn(async move { reader.recv().await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            server_conn.send(b"while reading"),
        )
        .await
        .expect("send must not wait for recv")
        .expect("send ok");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"while reading");

        client_ws.send(Message::Close(None)).await.unwrap();
        let result = pending.await.unwrap().expect("recv should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bound().await;

        let server_handle = tokio::spawn(async move {
            accept_one(&mut transport).await
        });
        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_each_accepted_connection_gets_distinct_identity() {
        let (mut transport, addr) = bound().await;

        let server_handle = tokio::spawn(async move {
            let a = accept_one(&mut transport).await;
            let b = accept_one(&mut transport).await;
            (a, b)
        });
        let _c1 = connect_client(&addr).await;
        let _c2 = connect_client(&addr).await;
        let (a, b) = server_handle.await.unwrap();

        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_accept_returns_before_upgrade() {
        let (mut transport, addr) = bound().await;
        let _raw = tokio::net::TcpStream::connect(&addr).await.unwrap();

        let incoming = tokio::time::timeout(Duration::from_secs(1), transport.accept())
            .await
            .expect("accept must not wait for the upgrade request")
            .expect("should accept");

        assert_eq!(incoming.id().as_str().len(), 32);
    }

    #[tokio::test]
    async fn test_idle_peer_does_not_hold_up_next_client() {
        let (mut transport, addr) = bound().await;
        let _idle = tokio::net::TcpStream::connect(&addr).await.unwrap();

        let server_handle = tokio::spawn(async move {
            let idle = transport.accept().await.expect("idle peer");
            let conn = accept_one(&mut transport).await;
            (idle, conn)
        });

        let _client = tokio::time::timeout(Duration::from_secs(3), connect_client(&addr))
            .await
            .expect("second client should upgrade while the first is idle");
        let (idle, conn) = server_handle.await.unwrap();
        assert_ne!(idle.id(), conn.id());
    }

    #[tokio::test]
    async fn test_establish_times_out_without_upgrade_request() {
        let (transport, addr) = bound().await;
        let mut transport = transport.with_handshake_timeout(Duration::from_millis(100));
        let _idle = tokio::net::TcpStream::connect(&addr).await.unwrap();

        let incoming = transport.accept().await.expect("should accept");
        let result = tokio::time::timeout(Duration::from_secs(2), incoming.establish())
            .await
            .expect("establish should give up on its own");

        match result {
            Err(TransportError::AcceptFailed(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::TimedOut);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("idle peer should not be upgraded"),
        }
    }
}
