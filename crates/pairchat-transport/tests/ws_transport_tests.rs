//! Integration tests for WsTransport against a local WebSocket server

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pairchat_core::{
    create_event_sink, ClientEmit, EventReceiver, ServerEvent, Transport, TransportEvent, UserId,
};
use pairchat_transport::{ReconnectConfig, TransportConfig, WsTransport};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message;

const WAIT: Duration = Duration::from_secs(5);

fn fast_reconnect(url: String) -> TransportConfig {
    TransportConfig::new(url).with_reconnect(ReconnectConfig {
        delay_ms: 20,
        max_attempts: 5,
    })
}

async fn next_event(rx: &mut EventReceiver) -> TransportEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("event channel closed")
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

#[tokio::test]
async fn test_round_trip_with_server() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        // The client announces itself without being asked
        let first = ws.next().await.unwrap().unwrap();
        assert_eq!(
            ClientEmit::decode(first.to_text().unwrap()).unwrap(),
            ClientEmit::FindMatch
        );

        for frame in [
            ServerEvent::WaitingForMatch.encode(),
            ServerEvent::ChatStarted {
                room_id: "room-1".to_string(),
            }
            .encode(),
            "{ definitely not json".to_string(),
            r#"{"event":"teleport"}"#.to_string(),
            ServerEvent::ReceiveMessage {
                sender: UserId::new("user_partner01"),
                message: "hey".to_string(),
            }
            .encode(),
        ] {
            ws.send(Message::Text(frame)).await.unwrap();
        }

        let reply = ws.next().await.unwrap().unwrap();
        ClientEmit::decode(reply.to_text().unwrap()).unwrap()
    });

    let mut transport = WsTransport::new(fast_reconnect(url));
    let (sink, mut rx) = create_event_sink();
    transport.register_sink(sink);
    transport.connect().unwrap();

    assert_eq!(next_event(&mut rx).await, TransportEvent::Connected);
    assert!(transport.is_connected());
    assert_eq!(
        next_event(&mut rx).await,
        TransportEvent::Server(ServerEvent::WaitingForMatch)
    );
    assert_eq!(
        next_event(&mut rx).await,
        TransportEvent::Server(ServerEvent::ChatStarted {
            room_id: "room-1".to_string()
        })
    );
    // Malformed and unknown frames are dropped
    assert_eq!(
        next_event(&mut rx).await,
        TransportEvent::Server(ServerEvent::ReceiveMessage {
            sender: UserId::new("user_partner01"),
            message: "hey".to_string()
        })
    );

    transport.send_message("hello back");
    let reply = tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(
        reply,
        ClientEmit::SendMessage {
            message: "hello back".to_string()
        }
    );

    transport.disconnect().await;
    assert!(!transport.is_connected());
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let mut announcements = 0;
        for _ in 0..2 {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let first = ws.next().await.unwrap().unwrap();
            if ClientEmit::decode(first.to_text().unwrap()).unwrap() == ClientEmit::FindMatch {
                announcements += 1;
            }
            if announcements == 1 {
                ws.close(None).await.unwrap();
            } else {
                // Keep the second connection open until the client leaves
                while let Some(Ok(_)) = ws.next().await {}
            }
        }
        announcements
    });

    let mut transport = WsTransport::new(fast_reconnect(url));
    let (sink, mut rx) = create_event_sink();
    transport.register_sink(sink);
    transport.connect().unwrap();

    assert_eq!(next_event(&mut rx).await, TransportEvent::Connected);
    assert!(matches!(
        next_event(&mut rx).await,
        TransportEvent::Disconnected { .. }
    ));
    assert_eq!(next_event(&mut rx).await, TransportEvent::Connected);

    transport.disconnect().await;
    let announcements = tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(announcements, 2);
}

#[tokio::test]
async fn test_retry_exhaustion_on_unreachable_server() {
    // Reserve a port and release it so nothing is listening there
    let (listener, url) = bind().await;
    drop(listener);

    let mut transport = WsTransport::new(fast_reconnect(url.clone()));
    let (sink, mut rx) = create_event_sink();
    transport.register_sink(sink);
    transport.connect().unwrap();

    let mut failures = 0;
    let attempts = loop {
        match next_event(&mut rx).await {
            TransportEvent::Error(message) => {
                assert!(
                    message.starts_with(&format!("Transport error: Connection to {}", url)),
                    "unexpected error text {}",
                    message
                );
                failures += 1;
            }
            TransportEvent::ReconnectExhausted { attempts } => break attempts,
            other => panic!("unexpected event {:?}", other),
        }
    };

    // The initial dial plus five retries
    assert_eq!(failures, 6);
    assert_eq!(attempts, 5);
    assert!(!transport.is_connected());

    // Still accepted silently after giving up
    transport.send_message("is anyone there?");
    transport.send_typing_status(false);
    transport.request_next_partner();

    transport.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_cancels_pending_retry() {
    let (listener, url) = bind().await;
    drop(listener);

    let config = TransportConfig::new(url).with_reconnect(ReconnectConfig {
        delay_ms: 60_000,
        max_attempts: 5,
    });
    let mut transport = WsTransport::new(config);
    let (sink, mut rx) = create_event_sink();
    transport.register_sink(sink);
    transport.connect().unwrap();

    assert!(matches!(next_event(&mut rx).await, TransportEvent::Error(_)));

    // Returns promptly even though the next retry is a minute away
    tokio::time::timeout(WAIT, transport.disconnect())
        .await
        .expect("disconnect should cancel the retry delay");
}
