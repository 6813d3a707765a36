//! End-to-end tests: real WebSocket clients against a running server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use sketchboard::prelude::*;
use tokio_tungstenite::tungstenite::Message;

struct TestAuth;

impl Authenticator for TestAuth {
    async fn authenticate(&self, token: &str) -> Result<ParticipantId, AuthError> {
        token
            .parse::<u64>()
            .map(ParticipantId)
            .map_err(|_| AuthError::Rejected("invalid token".into()))
    }
}

type ClientWs =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn start_server(areas: usize) -> (String, Vec<u64>) {
    let server = SketchBoardServerBuilder::new()
        .bind("127.0.0.1:0")
        .areas(areas)
        .build::<SketchBoard, _>(TestAuth)
        .await
        .unwrap();

    let addr = server.local_addr().unwrap().to_string();
    let area_ids = server.area_ids().await.into_iter().map(|id| id.0).collect();
    tokio::spawn(server.run());
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, area_ids)
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .unwrap();
    ws
}

async fn send(ws: &mut ClientWs, payload: Value) {
    let frame = json!({ "seq": 0, "timestamp": 0, "payload": payload });
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Next payload from the server. Fails the test after two seconds.
async fn recv(ws: &mut ClientWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .unwrap();
        let text = match msg {
            Message::Text(text) => text.as_str().to_string(),
            Message::Binary(bytes) => String::from_utf8(bytes.to_vec()).unwrap(),
            _ => continue,
        };
        let envelope: Value = serde_json::from_str(&text).unwrap();
        return envelope["payload"].clone();
    }
}

async fn assert_silent(ws: &mut ClientWs) {
    let next = tokio::time::timeout(Duration::from_millis(100), ws.next()).await;
    assert!(next.is_err(), "expected no frame, got {next:?}");
}

/// Connects and authenticates as `participant`.
async fn login(addr: &str, participant: u64) -> ClientWs {
    let mut ws = connect(addr).await;
    send(
        &mut ws,
        json!({ "type": "Handshake", "version": 1, "token": participant.to_string() }),
    )
    .await;
    let ack = recv(&mut ws).await;
    assert_eq!(ack["type"], "HandshakeAck");
    ws
}

async fn enter(ws: &mut ClientWs, area_id: u64) {
    send(ws, json!({ "type": "EnterArea", "area_id": area_id })).await;
    let reply = recv(ws).await;
    assert_eq!(reply["type"], "AreaEntered");
    assert_eq!(reply["area_id"], area_id);
}

fn command(area_id: u64, command: Value) -> Value {
    json!({ "type": "Command", "area_id": area_id, "command": command })
}

/// Joins the session and returns its id. Consumes the ack and the
/// snapshot that follows it.
async fn join(ws: &mut ClientWs, area_id: u64) -> String {
    send(ws, command(area_id, json!({ "type": "RequestJoin" }))).await;
    let ack = recv(ws).await;
    assert_eq!(ack["type"], "CommandAck", "{ack}");
    let session_id = ack["ack"]["sessionId"].as_str().unwrap().to_string();

    let snapshot = recv(ws).await;
    assert_eq!(snapshot["type"], "Snapshot");
    session_id
}

#[tokio::test]
async fn test_handshake_returns_participant_id() {
    let (addr, _) = start_server(1).await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({ "type": "Handshake", "version": 1, "token": "42" })).await;
    let ack = recv(&mut ws).await;

    assert_eq!(ack["type"], "HandshakeAck");
    assert_eq!(ack["participant_id"], 42);
}

#[tokio::test]
async fn test_handshake_version_mismatch_rejected() {
    let (addr, _) = start_server(1).await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({ "type": "Handshake", "version": 99, "token": "1" })).await;
    let reply = recv(&mut ws).await;

    assert_eq!(reply["type"], "Error");
    assert_eq!(reply["code"], 400);
    assert_eq!(reply["kind"], "VersionMismatch");
}

#[tokio::test]
async fn test_handshake_bad_token_rejected() {
    let (addr, _) = start_server(1).await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({ "type": "Handshake", "version": 1, "token": "nope" })).await;
    let reply = recv(&mut ws).await;

    assert_eq!(reply["type"], "Error");
    assert_eq!(reply["code"], 401);
}

#[tokio::test]
async fn test_first_message_must_be_handshake() {
    let (addr, _) = start_server(1).await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({ "type": "ListAreas" })).await;
    let reply = recv(&mut ws).await;

    assert_eq!(reply["type"], "Error");
    assert_eq!(reply["kind"], "InvalidMessage");
}

#[tokio::test]
async fn test_heartbeat_echoes_client_time() {
    let (addr, _) = start_server(1).await;
    let mut ws = login(&addr, 1).await;

    send(&mut ws, json!({ "type": "Heartbeat", "client_time": 1234 })).await;
    let reply = recv(&mut ws).await;

    assert_eq!(reply["type"], "HeartbeatAck");
    assert_eq!(reply["client_time"], 1234);
}

#[tokio::test]
async fn test_list_areas() {
    let (addr, area_ids) = start_server(2).await;
    let mut ws = login(&addr, 1).await;

    send(&mut ws, json!({ "type": "ListAreas" })).await;
    let reply = recv(&mut ws).await;

    assert_eq!(reply["type"], "AreaList");
    let areas = reply["areas"].as_array().unwrap();
    let listed: Vec<u64> = areas
        .iter()
        .map(|a| a["area_id"].as_u64().unwrap())
        .collect();
    assert_eq!(listed, area_ids);
    assert!(areas.iter().all(|a| a["session_id"].is_null()));
}

#[tokio::test]
async fn test_enter_unknown_area_is_not_found() {
    let (addr, _) = start_server(1).await;
    let mut ws = login(&addr, 1).await;

    send(&mut ws, json!({ "type": "EnterArea", "area_id": 999_999 })).await;
    let reply = recv(&mut ws).await;

    assert_eq!(reply["type"], "Error");
    assert_eq!(reply["code"], 404);
    assert_eq!(reply["kind"], "AreaNotFound");
}

#[tokio::test]
async fn test_join_then_draw_reaches_every_observer() {
    let (addr, area_ids) = start_server(1).await;
    let area = area_ids[0];

    let mut alice = login(&addr, 1).await;
    let mut bob = login(&addr, 2).await;
    enter(&mut alice, area).await;
    enter(&mut bob, area).await;

    let session_id = join(&mut alice, area).await;
    let pushed = recv(&mut bob).await;
    assert_eq!(pushed["type"], "Snapshot");
    assert_eq!(pushed["snapshot"]["sessionId"], session_id.as_str());
    assert_eq!(pushed["snapshot"]["participantIds"], json!([1]));
    assert_eq!(pushed["snapshot"]["state"]["leaderId"], 1);

    send(
        &mut alice,
        command(
            area,
            json!({
                "type": "BoardEdit",
                "sessionId": session_id,
                "payload": [{ "x": 0, "y": 0, "color": "#000000" }]
            }),
        ),
    )
    .await;
    assert_eq!(recv(&mut alice).await["type"], "CommandAck");

    for ws in [&mut alice, &mut bob] {
        let snapshot = recv(ws).await;
        assert_eq!(snapshot["type"], "Snapshot");
        assert_eq!(snapshot["snapshot"]["state"]["board"][0][0], "#000000");
        assert_eq!(snapshot["snapshot"]["state"]["board"][0][1], "#ffffff");
    }
}

#[tokio::test]
async fn test_entering_live_area_pushes_current_snapshot() {
    let (addr, area_ids) = start_server(1).await;
    let area = area_ids[0];

    let mut alice = login(&addr, 1).await;
    enter(&mut alice, area).await;
    let session_id = join(&mut alice, area).await;

    let mut bob = login(&addr, 2).await;
    enter(&mut bob, area).await;
    let snapshot = recv(&mut bob).await;

    assert_eq!(snapshot["type"], "Snapshot");
    assert_eq!(snapshot["snapshot"]["sessionId"], session_id.as_str());
}

#[tokio::test]
async fn test_non_leader_cannot_set_capacity() {
    let (addr, area_ids) = start_server(1).await;
    let area = area_ids[0];

    let mut alice = login(&addr, 1).await;
    let mut bob = login(&addr, 2).await;
    enter(&mut alice, area).await;
    enter(&mut bob, area).await;

    let session_id = join(&mut alice, area).await;
    recv(&mut bob).await;
    join(&mut bob, area).await;
    recv(&mut alice).await;

    send(
        &mut bob,
        command(
            area,
            json!({ "type": "SetCapacity", "sessionId": session_id, "payload": 2 }),
        ),
    )
    .await;
    let reply = recv(&mut bob).await;

    assert_eq!(reply["type"], "Error");
    assert_eq!(reply["code"], 403);
    assert_eq!(reply["kind"], "NotAuthorized");
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn test_stale_session_id_rejected() {
    let (addr, area_ids) = start_server(1).await;
    let area = area_ids[0];

    let mut alice = login(&addr, 1).await;
    enter(&mut alice, area).await;
    join(&mut alice, area).await;

    send(
        &mut alice,
        command(area, json!({ "type": "BoardReset", "sessionId": "stale" })),
    )
    .await;
    let reply = recv(&mut alice).await;

    assert_eq!(reply["code"], 409);
    assert_eq!(reply["kind"], "SessionIdMismatch");
}

#[tokio::test]
async fn test_disconnect_leaves_session_and_passes_leadership() {
    let (addr, area_ids) = start_server(1).await;
    let area = area_ids[0];

    let mut alice = login(&addr, 1).await;
    let mut bob = login(&addr, 2).await;
    enter(&mut alice, area).await;
    enter(&mut bob, area).await;

    join(&mut alice, area).await;
    recv(&mut bob).await;
    join(&mut bob, area).await;
    recv(&mut alice).await;

    send(&mut alice, json!({ "type": "Disconnect", "reason": "bye" })).await;

    let snapshot = recv(&mut bob).await;
    assert_eq!(snapshot["type"], "Snapshot");
    assert_eq!(snapshot["snapshot"]["participantIds"], json!([2]));
    assert_eq!(snapshot["snapshot"]["state"]["leaderId"], 2);
}

#[tokio::test]
async fn test_same_participant_cannot_enter_twice() {
    let (addr, area_ids) = start_server(2).await;

    let mut first = login(&addr, 7).await;
    enter(&mut first, area_ids[0]).await;

    let mut second = login(&addr, 7).await;
    send(&mut second, json!({ "type": "EnterArea", "area_id": area_ids[1] })).await;
    let reply = recv(&mut second).await;

    assert_eq!(reply["code"], 409);
    assert_eq!(reply["kind"], "AlreadyInArea");
}

#[tokio::test]
async fn test_exit_area_stops_snapshots() {
    let (addr, area_ids) = start_server(1).await;
    let area = area_ids[0];

    let mut alice = login(&addr, 1).await;
    let mut bob = login(&addr, 2).await;
    enter(&mut alice, area).await;
    enter(&mut bob, area).await;

    send(&mut bob, json!({ "type": "ExitArea" })).await;
    // ExitArea has no reply; a heartbeat round-trip orders it.
    send(&mut bob, json!({ "type": "Heartbeat", "client_time": 1 })).await;
    assert_eq!(recv(&mut bob).await["type"], "HeartbeatAck");

    join(&mut alice, area).await;
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn test_command_without_entering_is_rejected() {
    let (addr, area_ids) = start_server(2).await;

    let mut alice = login(&addr, 1).await;
    send(&mut alice, command(area_ids[0], json!({ "type": "RequestJoin" }))).await;
    let reply = recv(&mut alice).await;
    assert_eq!(reply["type"], "Error");
    assert_eq!(reply["code"], 400);
    assert_eq!(reply["kind"], "NotInArea");

    // Entered somewhere else still doesn't count.
    enter(&mut alice, area_ids[1]).await;
    send(&mut alice, command(area_ids[0], json!({ "type": "RequestJoin" }))).await;
    assert_eq!(recv(&mut alice).await["kind"], "NotInArea");
}

#[tokio::test]
async fn test_dropped_connection_holds_no_session_seat() {
    let (addr, area_ids) = start_server(1).await;
    let area = area_ids[0];

    let mut alice = login(&addr, 1).await;
    send(&mut alice, command(area, json!({ "type": "RequestJoin" }))).await;
    assert_eq!(recv(&mut alice).await["kind"], "NotInArea");
    alice.close(None).await.unwrap();
    drop(alice);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut bob = login(&addr, 2).await;
    enter(&mut bob, area).await;
    // No session was ever created, so entering pushes nothing.
    assert_silent(&mut bob).await;

    send(&mut bob, command(area, json!({ "type": "RequestJoin" }))).await;
    assert_eq!(recv(&mut bob).await["type"], "CommandAck");
    let snapshot = recv(&mut bob).await;
    assert_eq!(snapshot["snapshot"]["participantIds"], json!([2]));
    assert_eq!(snapshot["snapshot"]["state"]["leaderId"], 2);
}
