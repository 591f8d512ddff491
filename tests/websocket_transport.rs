//! Drives the websocket transport against a minimal local Socket.IO server.

use futures::{SinkExt, StreamExt};
use portal_realtime::{
    MemorySessionStore, RealtimeClient, RealtimeClientOptions, RealtimeEvent, ReconnectPolicy,
    SessionStatus,
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

const TEST_TOKEN: &str = "test-token";
const WAIT: Duration = Duration::from_secs(5);
const OPEN_PACKET: &str =
    r#"0{"sid":"eio-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

struct FakeSocketIo {
    socket: WebSocketStream<TcpStream>,
}

impl FakeSocketIo {
    async fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = timeout(WAIT, listener.accept())
            .await
            .expect("no client connected")
            .unwrap();
        let socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        Self { socket }
    }

    async fn send(&mut self, frame: &str) {
        self.socket.send(Message::Text(frame.into())).await.unwrap();
    }

    async fn recv(&mut self) -> String {
        loop {
            let message = timeout(WAIT, self.socket.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("client went away")
                .unwrap();
            if let Message::Text(text) = message {
                return text.as_str().to_string();
            }
        }
    }

    async fn close(mut self) {
        self.socket.close(None).await.unwrap();
    }

    /// Reads the next Socket.IO event as `[name, ...args]`.
    async fn recv_event(&mut self) -> Value {
        let frame = self.recv().await;
        let body = frame
            .strip_prefix("42")
            .unwrap_or_else(|| panic!("expected an event frame, got {}", frame));
        serde_json::from_str(body).unwrap()
    }

    /// Engine.IO open, namespace connect, a heartbeat round and the authenticate exchange.
    async fn handshake(&mut self) {
        self.send(OPEN_PACKET).await;
        assert_eq!(self.recv().await, "40");

        self.send("2").await;
        assert_eq!(self.recv().await, "3");

        self.send(r#"40{"sid":"socket-1"}"#).await;
        assert_eq!(
            self.recv_event().await,
            json!(["authenticate", { "token": TEST_TOKEN }])
        );
        self.send(r#"42["auth:success"]"#).await;
    }
}

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

fn client_for(addr: SocketAddr, reconnect: ReconnectPolicy) -> RealtimeClient {
    RealtimeClient::builder(RealtimeClientOptions {
        socket_url: Some(format!("http://{}", addr)),
        reconnect,
        connect_timeout: WAIT,
        ..Default::default()
    })
    .unwrap()
    .with_session_store(MemorySessionStore::with_token(TEST_TOKEN))
    .build()
}

async fn wait_for_status(client: &RealtimeClient, expected: SessionStatus) {
    let mut rx = client.watch_status().await;
    timeout(WAIT, rx.wait_for(|status| *status == expected))
        .await
        .unwrap_or_else(|_| panic!("status never became {}", expected))
        .unwrap();
}

#[tokio::test]
async fn test_authenticated_session_over_websocket() {
    let (listener, addr) = bind().await;
    let client = client_for(addr, ReconnectPolicy::disabled());
    let mut received = client.subscribe(RealtimeEvent::MessageReceive);
    let mut disconnects = client.subscribe(RealtimeEvent::Disconnect);

    client.connect("user-42").await.unwrap();
    let mut server = FakeSocketIo::accept(&listener).await;
    server.handshake().await;
    wait_for_status(&client, SessionStatus::Ready).await;
    assert!(client.is_connected().await);

    server
        .send(r#"42["message:receive",{"from":"user-7","content":"hello"}]"#)
        .await;
    assert_eq!(
        timeout(WAIT, received.recv()).await.unwrap().unwrap(),
        json!({ "from": "user-7", "content": "hello" })
    );

    client
        .send_message("user-7", "hi back", Some("listing-3"), None)
        .await
        .unwrap();
    assert_eq!(
        server.recv_event().await,
        json!([
            "message:send",
            { "recipientId": "user-7", "content": "hi back", "listingId": "listing-3" }
        ])
    );

    client.start_typing("user-7").await.unwrap();
    assert_eq!(
        server.recv_event().await,
        json!(["typing:start", { "recipientId": "user-7" }])
    );

    client.disconnect().await;
    assert_eq!(server.recv().await, "41");
    assert_eq!(
        timeout(WAIT, disconnects.recv()).await.unwrap().unwrap(),
        json!("io client disconnect")
    );
    assert_eq!(client.status().await, SessionStatus::Disconnected);
}

#[tokio::test]
async fn test_auth_error_over_websocket_fails_session() {
    let (listener, addr) = bind().await;
    let client = client_for(addr, ReconnectPolicy::disabled());

    client.connect("user-42").await.unwrap();
    let mut server = FakeSocketIo::accept(&listener).await;
    server.send(OPEN_PACKET).await;
    assert_eq!(server.recv().await, "40");
    server.send("40").await;
    server.recv_event().await;

    server
        .send(r#"42["auth:error",{"message":"Invalid token"}]"#)
        .await;
    wait_for_status(&client, SessionStatus::Failed("Invalid token".to_string())).await;

    assert!(!client.is_connected().await);
    assert_eq!(server.recv().await, "41");
}

#[tokio::test]
async fn test_reconnects_and_reauthenticates_after_drop() {
    let (listener, addr) = bind().await;
    let client = client_for(
        addr,
        ReconnectPolicy {
            delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(50),
            ..Default::default()
        },
    );
    let mut disconnects = client.subscribe(RealtimeEvent::Disconnect);
    let mut received = client.subscribe(RealtimeEvent::MessageReceive);

    client.connect("user-42").await.unwrap();
    let mut first = FakeSocketIo::accept(&listener).await;
    first.handshake().await;
    wait_for_status(&client, SessionStatus::Ready).await;

    first.close().await;
    assert_eq!(
        timeout(WAIT, disconnects.recv()).await.unwrap().unwrap(),
        json!("transport close")
    );

    let mut second = FakeSocketIo::accept(&listener).await;
    second.handshake().await;
    wait_for_status(&client, SessionStatus::Ready).await;

    second
        .send(r#"42["message:receive",{"content":"after reconnect"}]"#)
        .await;
    assert_eq!(
        timeout(WAIT, received.recv()).await.unwrap().unwrap(),
        json!({ "content": "after reconnect" })
    );
    assert_eq!(client.current_user().await.as_deref(), Some("user-42"));

    client.disconnect().await;
}

#[tokio::test]
async fn test_server_disconnect_is_not_retried() {
    let (listener, addr) = bind().await;
    let client = client_for(
        addr,
        ReconnectPolicy {
            delay: Duration::from_millis(10),
            ..Default::default()
        },
    );

    client.connect("user-42").await.unwrap();
    let mut server = FakeSocketIo::accept(&listener).await;
    server.handshake().await;
    wait_for_status(&client, SessionStatus::Ready).await;

    server.send("41").await;
    wait_for_status(&client, SessionStatus::Disconnected).await;

    let retry = timeout(Duration::from_millis(300), listener.accept()).await;
    assert!(retry.is_err(), "client reconnected after a server disconnect");
}

#[tokio::test]
async fn test_namespace_refusal_reports_one_error() {
    let (listener, addr) = bind().await;
    let client = client_for(addr, ReconnectPolicy::default());
    let mut errors = client.subscribe(RealtimeEvent::Error);

    client.connect("user-42").await.unwrap();
    let mut server = FakeSocketIo::accept(&listener).await;
    server.send(OPEN_PACKET).await;
    assert_eq!(server.recv().await, "40");
    server.send(r#"44{"message":"Not authorized"}"#).await;

    wait_for_status(&client, SessionStatus::Failed("Not authorized".to_string())).await;
    assert_eq!(
        timeout(WAIT, errors.recv()).await.unwrap().unwrap(),
        json!({ "message": "Not authorized" })
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(errors.try_recv().is_err());
    assert_eq!(client.current_user().await, None);
}

#[tokio::test]
async fn test_gives_up_after_bounded_reconnect_attempts() {
    // Nothing listens on this port once the listener is dropped.
    let (listener, addr) = bind().await;
    drop(listener);

    let client = client_for(
        addr,
        ReconnectPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            ..Default::default()
        },
    );

    client.connect("user-42").await.unwrap();
    wait_for_status(
        &client,
        SessionStatus::Failed("gave up after 2 reconnect attempts".to_string()),
    )
    .await;

    assert!(!client.is_connected().await);
    assert_eq!(client.current_user().await, None);
}

#[tokio::test]
async fn test_silent_server_hits_ping_timeout() {
    let (listener, addr) = bind().await;
    let client = client_for(addr, ReconnectPolicy::disabled());
    let mut disconnects = client.subscribe(RealtimeEvent::Disconnect);

    client.connect("user-42").await.unwrap();
    let mut server = FakeSocketIo::accept(&listener).await;
    server
        .send(r#"0{"sid":"eio-2","upgrades":[],"pingInterval":200,"pingTimeout":200}"#)
        .await;
    assert_eq!(server.recv().await, "40");
    server.send("40").await;
    server.recv_event().await;
    server.send(r#"42["auth:success"]"#).await;
    wait_for_status(&client, SessionStatus::Ready).await;

    // No pings from here on.
    assert_eq!(
        timeout(WAIT, disconnects.recv()).await.unwrap().unwrap(),
        json!("ping timeout")
    );
    wait_for_status(&client, SessionStatus::Failed("reconnection disabled".to_string())).await;
}

#[tokio::test]
async fn test_disconnect_abandons_pending_handshake() {
    use tokio::io::AsyncReadExt;

    let (listener, addr) = bind().await;
    let client = client_for(addr, ReconnectPolicy::disabled());

    client.connect("user-42").await.unwrap();
    // Accept the TCP connection but never answer the websocket upgrade.
    let (mut stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();

    client.disconnect().await;

    let mut buf = [0u8; 1024];
    let closed = timeout(Duration::from_secs(1), async {
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "handshake kept running after disconnect");
    assert_eq!(client.status().await, SessionStatus::Disconnected);
}
