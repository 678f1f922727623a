use std::sync::Arc;

use actix_web::{get, http::header, web, HttpRequest, HttpResponse};
use actix_ws::Message;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::hub::{task_room, ConnectionId, NotificationHub, PushMessage};
use crate::auth::middleware::bearer_token;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SocketQuery {
    pub token: Option<String>,
}

/// Frames a client may send once connected.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    Join { task_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Leave { task_id: Uuid },
}

/// Applies a client frame and returns the reply to send back.
pub fn handle_frame(hub: &NotificationHub, conn: ConnectionId, text: &str) -> PushMessage {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Join { task_id }) => {
            let room = task_room(task_id);
            hub.join(conn, room.clone());
            PushMessage::new("joined", json!({ "room": room }))
        }
        Ok(ClientFrame::Leave { task_id }) => {
            let room = task_room(task_id);
            hub.leave(conn, &room);
            PushMessage::new("left", json!({ "room": room }))
        }
        Err(e) => PushMessage::new("error", json!({ "message": format!("invalid frame: {}", e) })),
    }
}

/// WebSocket endpoint for live notifications and task rooms.
///
/// The access token is read from `?token=` or from the `Authorization` header.
/// Mounted under the `/ws` scope.
#[get("/notifications")]
pub async fn notifications_socket(
    req: HttpRequest,
    body: web::Payload,
    query: web::Query<SocketQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    let header_token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token);
    let token = query
        .token
        .as_deref()
        .or(header_token)
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;
    let claims = state.jwt.verify_access(token)?;

    let (response, mut session, mut stream) = actix_ws::handle(&req, body)?;
    let hub = Arc::clone(&state.hub);
    let (conn, mut outbox) = hub.register(claims.sub);
    log::debug!(
        "socket {} opened for user {} ({} open)",
        conn,
        claims.sub,
        hub.connection_count()
    );

    actix_web::rt::spawn(async move {
        let mut close_reason = None;
        loop {
            tokio::select! {
                Some(push) = outbox.recv() => {
                    let Ok(text) = serde_json::to_string(&push) else { continue };
                    if session.text(text).await.is_err() {
                        break;
                    }
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_frame(&hub, conn, &text);
                        let Ok(text) = serde_json::to_string(&reply) else { continue };
                        if session.text(text).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(reason))) => {
                        close_reason = reason;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("socket {} protocol error: {}", conn, e);
                        break;
                    }
                    None => break,
                }
            }
        }
        hub.unregister(conn);
        let _ = session.close(close_reason).await;
    });

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_frames() {
        let task_id = Uuid::new_v4();
        let frame: ClientFrame =
            serde_json::from_str(&format!(r#"{{"action":"join","taskId":"{}"}}"#, task_id))
                .unwrap();
        assert_eq!(frame, ClientFrame::Join { task_id });
        assert!(serde_json::from_str::<ClientFrame>(r#"{"action":"dance"}"#).is_err());
    }

    #[test]
    fn test_handle_frame_joins_and_leaves_rooms() {
        let hub = NotificationHub::new();
        let (conn, mut rx) = hub.register(Uuid::new_v4());
        let task_id = Uuid::new_v4();
        let update = PushMessage::new("taskStatusChanged", json!({}));

        let reply = handle_frame(&hub, conn, &format!(r#"{{"action":"join","taskId":"{}"}}"#, task_id));
        assert_eq!(reply.event, "joined");
        assert_eq!(hub.emit_to_room(&task_room(task_id), &update), 1);
        assert_eq!(rx.try_recv().unwrap(), update);

        let reply = handle_frame(&hub, conn, &format!(r#"{{"action":"leave","taskId":"{}"}}"#, task_id));
        assert_eq!(reply.event, "left");
        assert_eq!(hub.emit_to_room(&task_room(task_id), &update), 0);

        assert_eq!(handle_frame(&hub, conn, "not json").event, "error");
    }
}
