//! End-to-end tests against a served router
//!
//! A real listener is bound on localhost and driven with a tungstenite
//! client. `cat` stands in for ffmpeg so the PCM equals the input bytes.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::config::{ServerConfig, TranscoderConfig};
use crate::http::create_router;
use crate::relay::session::{SessionHandle, SessionState};
use crate::state::AppState;

async fn serve(config: ServerConfig) -> (SocketAddr, Arc<AppState>) {
    let state = Arc::new(AppState::new(config));
    let app = create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn config_with_transcoder(binary: &str, args: &[&str]) -> ServerConfig {
    ServerConfig {
        transcoder: TranscoderConfig {
            binary: binary.to_string(),
            args: Some(args.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        },
        ..Default::default()
    }
}

async fn wait_for_no_sessions(state: &AppState) {
    for _ in 0..100 {
        if state.sessions.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("sessions still registered: {}", state.sessions.len());
}

#[tokio::test]
async fn test_missing_transcoder_closes_socket_with_error() {
    let (addr, state) = serve(config_with_transcoder("/nonexistent/ffmpeg-missing", &[])).await;

    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();

    let frame = loop {
        match ws.next().await {
            Some(Ok(Message::Close(frame))) => break frame.unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("expected close frame, got {:?}", other),
        }
    };
    assert_eq!(u16::from(frame.code), 1011);
    assert!(frame.reason.contains("binary not found"));

    wait_for_no_sessions(&state).await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_audio_session_over_websocket() {
    let (addr, state) = serve(config_with_transcoder("cat", &[])).await;

    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    for i in 0u8..3 {
        ws.send(Message::Binary(vec![i; 1000].into())).await.unwrap();
    }

    // Wait until the relay has pushed all three chunks through the transcoder
    let mut seen = 0;
    for _ in 0..100 {
        let sessions = state.active_sessions();
        if let Some(session) = sessions.first() {
            seen = session.stats.bytes_out;
            if seen == 3000 {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(seen, 3000);

    ws.close(None).await.unwrap();
    while let Some(Ok(_)) = ws.next().await {}

    wait_for_no_sessions(&state).await;
}

async fn wait_for_session(state: &AppState) -> Arc<SessionHandle> {
    for _ in 0..100 {
        if let Some(entry) = state.sessions.iter().next() {
            return Arc::clone(entry.value());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no session registered");
}

#[cfg(unix)]
#[tokio::test]
async fn test_only_binary_frames_reach_transcoder() {
    let (addr, state) = serve(config_with_transcoder("cat", &[])).await;

    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws.send(Message::Text("not audio".into())).await.unwrap();
    ws.send(Message::Ping(vec![1u8, 2, 3].into())).await.unwrap();
    ws.send(Message::Binary(vec![4u8; 1000].into())).await.unwrap();
    ws.send(Message::Text("still not audio".into())).await.unwrap();

    let handle = wait_for_session(&state).await;
    for _ in 0..100 {
        if handle.stats().snapshot().bytes_out == 1000 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let stats = handle.stats().snapshot();
    assert_eq!(stats.bytes_in, 1000);
    assert_eq!(stats.chunks_in, 1);
    assert_eq!(stats.bytes_out, 1000);
    assert_eq!(handle.state(), SessionState::Streaming);

    ws.close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "done".into(),
    }))
    .await
    .unwrap();
    let frame = loop {
        match ws.next().await {
            Some(Ok(Message::Close(frame))) => break frame,
            Some(Ok(_)) => continue,
            other => panic!("expected close frame, got {:?}", other),
        }
    };
    assert_eq!(frame.map(|f| u16::from(f.code)), Some(1000));

    wait_for_no_sessions(&state).await;
    assert_eq!(handle.state(), SessionState::Closed);
    assert_eq!(handle.stats().snapshot().bytes_out, 1000);
}

#[tokio::test]
async fn test_session_limit_refuses_upgrade() {
    let config = ServerConfig {
        max_concurrent_sessions: Some(0),
        ..config_with_transcoder("cat", &[])
    };
    let (addr, _state) = serve(config).await;

    let err = connect_async(format!("ws://{}/ws", addr)).await.unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 503);
        }
        other => panic!("unexpected error: {other}"),
    }
}
