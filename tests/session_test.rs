//! Websocket session handling without a socket: frames in, replies out.

mod common;

use common::{tuesday_morning, Harness};
use gym_booking::core::{GenderBucket, ServerEvent, WeekdayName};
use gym_booking::runtime::{ServerMessage, SessionHandler};
use gym_booking::util::serde::SessionId;
use serde_json::json;

fn ack(reply: Option<ServerMessage>) -> (serde_json::Value, bool, String) {
    match reply {
        Some(ServerMessage::Ack {
            request_id,
            ok,
            message,
        }) => (request_id, ok, message),
        other => panic!("expected an ack, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_reserve_cancel_round() {
    let h = Harness::at(tuesday_morning());
    let slot = h.slot(WeekdayName::Martes, 18, 2, 2);
    let who = h.member(Some(GenderBucket::Male));

    let session = SessionId::new();
    let mut events = h.service.hub().connect(session);
    let handler = SessionHandler::new(session, who, h.service.clone());

    let join = json!({"type": "join", "activeDate": "2025-03-04"}).to_string();
    assert!(handler.handle_text(&join).await.is_none());
    assert_eq!(h.service.hub().room_of(session).as_deref(), Some("2025-03-04"));

    let reserve = json!({"type": "reserve", "requestId": "r-1", "slotId": slot.id.to_string()});
    let (id, ok, message) = ack(handler.handle_text(&reserve.to_string()).await);
    assert_eq!(id, json!("r-1"));
    assert!(ok);
    assert_eq!(message, "reserved");
    assert!(matches!(
        events.try_recv().unwrap(),
        ServerEvent::OccupancyChanged { free_a: 1, free_b: 2, .. }
    ));

    let (_, ok, message) = ack(handler.handle_text(&reserve.to_string()).await);
    assert!(!ok);
    assert_eq!(message, "already reserved here");

    let cancel = json!({"type": "cancel", "requestId": 9, "slotId": slot.id.to_string()});
    let (id, ok, message) = ack(handler.handle_text(&cancel.to_string()).await);
    assert_eq!(id, json!(9));
    assert!(ok);
    assert_eq!(message, "cancelled");

    let (_, ok, message) = ack(handler.handle_text(&cancel.to_string()).await);
    assert!(!ok);
    assert_eq!(message, "no reservation here");
}

#[tokio::test]
async fn test_missing_slot_id_still_gets_an_ack() {
    let h = Harness::at(tuesday_morning());
    let handler = SessionHandler::new(
        SessionId::new(),
        h.member(Some(GenderBucket::Female)),
        h.service.clone(),
    );
    let (id, ok, message) = ack(handler.handle_text(r#"{"type":"reserve"}"#).await);
    assert_eq!(id, serde_json::Value::Null);
    assert!(!ok);
    assert_eq!(message, "slotId is required");
}

#[tokio::test]
async fn test_malformed_frames_and_dates() {
    let h = Harness::at(tuesday_morning());
    let session = SessionId::new();
    let _events = h.service.hub().connect(session);
    let handler = SessionHandler::new(session, h.member(None), h.service.clone());

    assert!(matches!(
        handler.handle_text("not json").await,
        Some(ServerMessage::Error { .. })
    ));
    assert!(matches!(
        handler.handle_text(r#"{"type":"dance"}"#).await,
        Some(ServerMessage::Error { .. })
    ));

    let bad_join = json!({"type": "join", "activeDate": "04/03/2025"}).to_string();
    assert!(handler.handle_text(&bad_join).await.is_none());
    assert_eq!(h.service.hub().room_of(session), None);
}
