//! WebSocket endpoint.
//!
//! One task per connection: inbound frames are decoded into client events
//! and fed to the [`EventRouter`]; outbound envelopes arrive from the hub
//! topics the connection is subscribed to, multiplexed through a
//! `StreamMap`. Every connection starts with its own `conn:` topic and the
//! presence broadcast; authentication and `join_chat` add more.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamMap;
use tracing::debug;

use crate::common::ConnectionId;
use crate::domains::realtime::events::{self, ClientEvent, PRESENCE_TOPIC};
use crate::kernel::Envelope;
use crate::server::app::AppState;

pub async fn stream_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

type TopicStreams = StreamMap<String, BroadcastStream<Envelope>>;

async fn subscribe(state: &AppState, topics: &mut TopicStreams, topic: String) {
    if !topics.contains_key(&topic) {
        let rx = state.deps.hub.subscribe(&topic).await;
        topics.insert(topic, BroadcastStream::new(rx));
    }
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let connection = ConnectionId::new();
    debug!(connection = %connection, "websocket connected");

    let mut topics: TopicStreams = StreamMap::new();
    subscribe(&state, &mut topics, events::connection_topic(connection)).await;
    subscribe(&state, &mut topics, PRESENCE_TOPIC.to_string()).await;

    let (mut sink, mut inbound) = socket.split();
    loop {
        tokio::select! {
            frame = inbound.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => {
                            for topic in state.router.handle(connection, event).await {
                                subscribe(&state, &mut topics, topic).await;
                            }
                        }
                        Err(error) => {
                            debug!(connection = %connection, %error, "unparseable frame");
                            let reply = json!({
                                "event": "error",
                                "data": { "message": "Invalid event format" },
                            });
                            if sink.send(Message::Text(reply.to_string())).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // ping/pong/binary
                Some(Err(_)) => break,
            },
            envelope = topics.next() => {
                // A lagged subscriber just skips the dropped envelopes.
                let Some((_, Ok(envelope))) = envelope else { continue };
                if !envelope.delivers_to(connection) {
                    continue;
                }
                let frame = json!({ "event": envelope.event, "data": envelope.data });
                if sink.send(Message::Text(frame.to_string())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.router.disconnect(connection).await;
    debug!(connection = %connection, "websocket disconnected");
}
