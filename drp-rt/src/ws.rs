//! WebSocket client endpoint
//!
//! Protocol: connect, then send `join_disaster` / `leave_disaster` control
//! frames; the server pushes `online_users` on every connect/disconnect and
//! named events with their payload to room members. Disconnecting implicitly
//! leaves all rooms.

use crate::rooms::Rooms;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use drp_common::events::disaster_room;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Control frames accepted from clients
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ControlFrame {
    JoinDisaster { disaster_id: String },
    LeaveDisaster { disaster_id: String },
}

/// GET /ws - upgrade to the client protocol
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.rooms))
}

/// Runs for the lifetime of one client connection
async fn handle_socket(socket: WebSocket, rooms: Rooms) {
    let (mut sender, mut receiver) = socket.split();

    // Frames queue through an unbounded channel so multicast never blocks
    // on a slow socket
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let conn_id = rooms.connect(tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let recv_rooms = rooms.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => handle_control_frame(&recv_rooms, conn_id, &text),
                Message::Close(_) => break,
                // Ping/pong handled by axum; binary frames carry nothing here
                _ => {}
            }
        }
    });

    // Either half closing tears the connection down
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    rooms.disconnect(conn_id);
}

fn handle_control_frame(rooms: &Rooms, conn_id: Uuid, text: &str) {
    match serde_json::from_str::<ControlFrame>(text) {
        Ok(ControlFrame::JoinDisaster { disaster_id }) => {
            rooms.join(conn_id, &disaster_room(&disaster_id));
        }
        Ok(ControlFrame::LeaveDisaster { disaster_id }) => {
            rooms.leave(conn_id, &disaster_room(&disaster_id));
        }
        Err(e) => {
            // Malformed control frames are ignored, not fatal
            warn!(connection = %conn_id, "Ignoring unrecognized control frame: {}", e);
            debug!(frame = %text, "Unrecognized frame content");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_frames_parse() {
        let frame: ControlFrame =
            serde_json::from_str(r#"{"action":"join_disaster","disaster_id":"42"}"#).unwrap();
        assert!(matches!(frame, ControlFrame::JoinDisaster { ref disaster_id } if disaster_id == "42"));

        let frame: ControlFrame =
            serde_json::from_str(r#"{"action":"leave_disaster","disaster_id":"42"}"#).unwrap();
        assert!(matches!(frame, ControlFrame::LeaveDisaster { .. }));
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(serde_json::from_str::<ControlFrame>(r#"{"action":"subscribe"}"#).is_err());
    }
}
