//! WebSocket bridge between a socket and the lobby
//!
//! Each upgraded socket becomes one lobby connection. Inbound text frames are
//! handed to [`Lobby::handle_frame`] in arrival order; a writer task drains
//! the connection's event channel back onto the socket as JSON text frames.
//! The socket is closed and the session removed once the writer stops.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{Sink, SinkExt, StreamExt};

use common::hub::EventReceiver;
use common::lobby::Lobby;
use common::session::ConnectionId;

use crate::ServiceState;

pub async fn handler(ws: WebSocketUpgrade, State(state): State<ServiceState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(socket: WebSocket, state: ServiceState) {
    let lobby = state.lobby().clone();
    let (connection_id, events) = lobby.connect();
    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        if let Err(e) = forward_events(events, &mut sink).await {
            tracing::debug!(connection = %connection_id, "socket writer stopped: {}", e);
        }
        let _ = sink.close().await;
    });

    let mut writer_done = false;
    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(message)) => {
                    if !handle_message(&lobby, connection_id, message).await {
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::debug!(connection = %connection_id, "socket read failed: {}", e);
                    break;
                }
                None => break,
            },
            _ = state.drained() => break,
            // the hub evicted a connection that fell behind
            _ = &mut writer => {
                writer_done = true;
                break;
            }
        }
    }

    // unregistering drops the event sender, which ends the writer
    lobby.disconnect(connection_id);
    if !writer_done {
        let _ = writer.await;
    }
}

/// Returns false once the peer has asked to close
async fn handle_message(lobby: &Lobby, connection_id: ConnectionId, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            lobby.handle_frame(connection_id, &text).await;
            true
        }
        Message::Close(_) => false,
        Message::Binary(_) => {
            tracing::warn!(connection = %connection_id, "ignoring binary frame");
            true
        }
        // pings are answered by axum
        Message::Ping(_) | Message::Pong(_) => true,
    }
}

/// Serialize every outbound event onto the socket until the channel closes
async fn forward_events<S>(events: EventReceiver, sink: &mut S) -> anyhow::Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    while let Ok(event) = events.recv_async().await {
        let text = serde_json::to_string(&event)?;
        sink.send(Message::Text(text)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use common::events::{JoinErrorPayload, OutboundEvent};
    use common::hub::{EventSink, Hub};
    use futures::channel::mpsc;

    use super::*;

    #[tokio::test]
    async fn test_forward_events_writes_json_until_unregistered() {
        let hub = Hub::new();
        let id = ConnectionId::new();
        let events = hub.register(id);

        hub.send_to(
            id,
            OutboundEvent::JoinError(JoinErrorPayload {
                message: "Invalid password".into(),
            }),
        );
        hub.broadcast(OutboundEvent::UserListUpdate(vec![]));
        hub.unregister(id);

        let (mut tx, rx) = mpsc::unbounded::<Message>();
        forward_events(events, &mut tx).await.unwrap();
        drop(tx);

        let frames: Vec<String> = rx
            .map(|m| match m {
                Message::Text(text) => text,
                other => panic!("unexpected frame {:?}", other),
            })
            .collect()
            .await;
        assert_eq!(
            frames,
            vec![
                r#"{"event":"joinError","data":{"message":"Invalid password"}}"#.to_string(),
                r#"{"event":"userListUpdate","data":[]}"#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_forward_events_stops_on_closed_socket() {
        let hub = Hub::new();
        let id = ConnectionId::new();
        let events = hub.register(id);
        hub.broadcast(OutboundEvent::UserListUpdate(vec![]));

        let (mut tx, rx) = mpsc::unbounded::<Message>();
        drop(rx);
        assert!(forward_events(events, &mut tx).await.is_err());
    }

    #[tokio::test]
    async fn test_handle_message_close_and_garbage() {
        let lobby = Lobby::new(
            common::credentials::CredentialLedger::with_cost(1024, 1).unwrap(),
            common::handshake::HandshakeConfig::default(),
        );
        let (id, _rx) = lobby.connect();

        assert!(handle_message(&lobby, id, Message::Text("not json".into())).await);
        assert!(handle_message(&lobby, id, Message::Binary(vec![1, 2, 3])).await);
        assert!(handle_message(&lobby, id, Message::Ping(vec![])).await);
        assert!(!handle_message(&lobby, id, Message::Close(None)).await);
        assert_eq!(lobby.live_count(), 0);
    }
}
