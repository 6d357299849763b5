//! Inbound realtime event routing.
//!
//! One router instance serves every connection. Each inbound event is
//! handled in isolation: a failure publishes an `error` (or `auth_error`)
//! envelope to the caller's own topic and never tears down the connection.

use serde_json::json;
use tracing::{debug, warn};

use crate::common::{AppError, AppResult, ConnectionId};
use crate::domains::messages::actions as messages;
use crate::domains::messages::actions::SendMessageRequest;
use crate::domains::realtime::events::{
    self, AuthenticatePayload, ClientEvent, JoinChatPayload, SendMessagePayload,
    StatusUpdatePayload, SwapRequestPayload, SwapResponsePayload, TypingPayload, PRESENCE_TOPIC,
};
use crate::domains::swaps::actions as swaps;
use crate::domains::swaps::actions::CreateSwapRequest;
use crate::domains::swaps::machines::SwapAction;
use crate::domains::users::models::PublicUser;
use crate::kernel::{Envelope, ServerDeps, Session};

#[derive(Clone)]
pub struct EventRouter {
    deps: ServerDeps,
}

impl EventRouter {
    pub fn new(deps: ServerDeps) -> Self {
        Self { deps }
    }

    /// Handle one inbound event. Returns topics the connection should
    /// additionally subscribe to (personal topic after authentication,
    /// conversation topics after `join_chat`).
    pub async fn handle(&self, connection: ConnectionId, event: ClientEvent) -> Vec<String> {
        let (error_event, result) = match event {
            ClientEvent::Authenticate(payload) => {
                ("auth_error", self.authenticate(connection, payload).await)
            }
            ClientEvent::JoinChat(payload) => ("error", self.join_chat(connection, payload).await),
            ClientEvent::SendMessage(payload) => {
                ("error", self.send_message(connection, payload).await)
            }
            ClientEvent::Typing(payload) => ("error", self.typing(connection, payload).await),
            ClientEvent::SwapRequest(payload) => {
                ("error", self.swap_request(connection, payload).await)
            }
            ClientEvent::SwapResponse(payload) => {
                ("error", self.swap_response(connection, payload).await)
            }
            ClientEvent::StatusUpdate(payload) => {
                ("error", self.status_update(connection, payload).await)
            }
        };
        match result {
            Ok(subscriptions) => subscriptions,
            Err(error) => {
                debug!(connection = %connection, %error, "realtime event failed");
                self.emit(connection, error_event, json!({ "message": error.to_string() }))
                    .await;
                vec![]
            }
        }
    }

    /// Tear down a closed connection. Safe to call more than once; only the
    /// first call finds a session and emits `user_offline`.
    pub async fn disconnect(&self, connection: ConnectionId) {
        let Some(session) = self.deps.presence.unregister(connection).await else {
            return;
        };
        if !self.deps.presence.is_online(session.user_id).await {
            if let Err(error) = self.deps.users.set_online(session.user_id, false).await {
                warn!(user_id = %session.user_id, %error, "failed to mark user offline");
            }
            self.deps
                .hub
                .publish(
                    PRESENCE_TOPIC,
                    Envelope::new(
                        "user_offline",
                        json!({
                            "userId": session.user_id,
                            "user": {
                                "id": session.user_id,
                                "name": session.user.name,
                                "avatar": session.user.avatar,
                                "isOnline": false,
                            },
                        }),
                    )
                    .excluding(connection),
                )
                .await;
        }
        self.deps.hub.cleanup().await;
    }

    async fn emit(&self, connection: ConnectionId, event: &str, data: serde_json::Value) {
        self.deps
            .hub
            .publish(&events::connection_topic(connection), Envelope::new(event, data))
            .await;
    }

    async fn session(&self, connection: ConnectionId) -> AppResult<Session> {
        self.deps
            .presence
            .lookup(connection)
            .await
            .ok_or_else(|| AppError::Auth("Not authenticated".to_string()))
    }

    async fn authenticate(
        &self,
        connection: ConnectionId,
        payload: AuthenticatePayload,
    ) -> AppResult<Vec<String>> {
        let claims = self
            .deps
            .jwt
            .verify_token(&payload.token)
            .map_err(|_| AppError::Auth("Invalid token".to_string()))?;
        let user = self
            .deps
            .users
            .find_by_id(claims.user_id)
            .await?
            .ok_or_else(|| AppError::Auth("User not found".to_string()))?;

        // Best-effort flag flip; the in-memory session is authoritative for
        // this connection's lifetime.
        if let Err(error) = self.deps.users.set_online(user.id, true).await {
            warn!(user_id = %user.id, %error, "failed to mark user online");
        }
        let mut view = PublicUser::owned(&user);
        view.is_online = true;
        self.deps
            .presence
            .register(
                connection,
                Session {
                    user_id: user.id,
                    user: view.clone(),
                },
            )
            .await;

        self.deps
            .hub
            .publish(
                PRESENCE_TOPIC,
                Envelope::new(
                    "user_online",
                    json!({
                        "userId": user.id,
                        "user": {
                            "id": user.id,
                            "name": user.name,
                            "avatar": user.avatar,
                            "isOnline": true,
                        },
                    }),
                )
                .excluding(connection),
            )
            .await;
        self.emit(
            connection,
            "authenticated",
            json!({ "message": "Successfully authenticated", "user": view }),
        )
        .await;

        Ok(vec![events::personal_topic(user.id)])
    }

    async fn join_chat(
        &self,
        connection: ConnectionId,
        payload: JoinChatPayload,
    ) -> AppResult<Vec<String>> {
        let session = self.session(connection).await?;
        let topic = events::conversation_topic(session.user_id, payload.other_user_id);
        self.emit(
            connection,
            "joined_chat",
            json!({ "roomId": topic, "otherUserId": payload.other_user_id }),
        )
        .await;
        Ok(vec![topic])
    }

    async fn send_message(
        &self,
        connection: ConnectionId,
        payload: SendMessagePayload,
    ) -> AppResult<Vec<String>> {
        let session = self.session(connection).await?;
        let view = messages::send_message(
            &self.deps,
            session.user_id,
            SendMessageRequest {
                recipient: payload.recipient_id,
                content: payload.content,
                message_type: payload.message_type,
                swap_id: payload.swap_id,
                attachments: payload.attachments,
                reply_to: payload.reply_to,
            },
        )
        .await?;

        let topic = events::conversation_topic(session.user_id, payload.recipient_id);
        // The sender's connection receives this too, matching room delivery.
        self.deps
            .hub
            .publish(
                &topic,
                Envelope::new("new_message", json!({ "message": view, "roomId": topic }))
                    .from_connection(connection),
            )
            .await;
        self.deps
            .hub
            .publish(
                &events::personal_topic(payload.recipient_id),
                Envelope::new(
                    "message_notification",
                    json!({
                        "message": {
                            "id": view.id,
                            "content": view.content,
                            "sender": view.sender,
                            "createdAt": view.created_at,
                        },
                    }),
                ),
            )
            .await;
        Ok(vec![])
    }

    async fn typing(
        &self,
        connection: ConnectionId,
        payload: TypingPayload,
    ) -> AppResult<Vec<String>> {
        let session = self.session(connection).await?;
        let topic = events::conversation_topic(session.user_id, payload.recipient_id);
        self.deps
            .hub
            .publish(
                &topic,
                Envelope::new(
                    "user_typing",
                    json!({
                        "userId": session.user_id,
                        "isTyping": payload.is_typing,
                        "roomId": topic,
                    }),
                )
                .excluding(connection),
            )
            .await;
        Ok(vec![])
    }

    async fn swap_request(
        &self,
        connection: ConnectionId,
        payload: SwapRequestPayload,
    ) -> AppResult<Vec<String>> {
        let session = self.session(connection).await?;
        let view = swaps::create_swap(
            &self.deps,
            session.user_id,
            CreateSwapRequest {
                provider: payload.provider_id,
                requested_skill: payload.requested_skill,
                offered_skill: payload.offered_skill,
                message: payload.message,
                scheduled_date: payload.scheduled_date,
                location: payload.location,
                duration: payload.duration,
                is_remote: payload.is_remote.unwrap_or(false),
            },
        )
        .await?;

        self.deps
            .hub
            .publish(
                &events::personal_topic(payload.provider_id),
                Envelope::new(
                    "swap_request_received",
                    json!({ "swap": view, "requester": view.requester }),
                ),
            )
            .await;
        self.emit(
            connection,
            "swap_request_sent",
            json!({ "swap": view, "message": "Swap request sent successfully" }),
        )
        .await;
        Ok(vec![])
    }

    async fn swap_response(
        &self,
        connection: ConnectionId,
        payload: SwapResponsePayload,
    ) -> AppResult<Vec<String>> {
        let session = self.session(connection).await?;
        let action = match payload.action.as_str() {
            "accept" => SwapAction::Accept,
            "reject" => SwapAction::Reject,
            _ => return Err(AppError::invalid("action", "Action must be accept or reject")),
        };
        let view = swaps::apply_action(&self.deps, session.user_id, payload.swap_id, action).await?;

        self.deps
            .hub
            .publish(
                &events::personal_topic(view.requester.id),
                Envelope::new(
                    "swap_response_received",
                    json!({
                        "swap": view,
                        "action": payload.action,
                        "provider": view.provider,
                    }),
                ),
            )
            .await;
        self.emit(
            connection,
            "swap_response_sent",
            json!({ "swap": view, "action": payload.action }),
        )
        .await;
        Ok(vec![])
    }

    async fn status_update(
        &self,
        connection: ConnectionId,
        payload: StatusUpdatePayload,
    ) -> AppResult<Vec<String>> {
        let session = self.session(connection).await?;
        if let Err(error) = self
            .deps
            .users
            .set_online(session.user_id, payload.is_online)
            .await
        {
            warn!(user_id = %session.user_id, %error, "failed to persist status change");
        }
        self.deps
            .hub
            .publish(
                PRESENCE_TOPIC,
                Envelope::new(
                    "user_status_changed",
                    json!({
                        "userId": session.user_id,
                        "isOnline": payload.is_online,
                        "user": {
                            "id": session.user_id,
                            "name": session.user.name,
                            "avatar": session.user.avatar,
                        },
                    }),
                )
                .excluding(connection),
            )
            .await;
        Ok(vec![])
    }
}
