use super::*;
use serde_json::json;
use time::macros::datetime;

#[test]
fn deserialize_open() {
    let event: ClientEvent = serde_json::from_str(r#"{"type":"OPEN","data":{"room_id":42}}"#).expect("open");
    assert_eq!(event, ClientEvent::Open(OpenData { room_id: 42 }));
    assert_eq!(event.kind(), "OPEN");
    assert_eq!(event.room_id(), 42);
}

#[test]
fn deserialize_open_legacy_chat_id_string() {
    // Older clients send `chat_id` as a string.
    let event: ClientEvent = serde_json::from_str(r#"{"type":"OPEN","data":{"chat_id":"7"}}"#).expect("open");
    assert_eq!(event.room_id(), 7);
}

#[test]
fn deserialize_message_without_sender() {
    let event: ClientEvent =
        serde_json::from_str(r#"{"type":"MESSAGE","data":{"room_id":3,"text":"산책 가능해요"}}"#).expect("message");
    let ClientEvent::Message(data) = event else {
        panic!("expected MESSAGE");
    };
    assert_eq!(data.room_id, 3);
    assert_eq!(data.text, "산책 가능해요");
    assert!(data.sender_id.is_none());
}

#[test]
fn deserialize_read_legacy_shape() {
    let user = Uuid::new_v4();
    let raw = json!({"type": "READ", "data": {"id": 120, "chat_id": 42, "user_id": user}});
    let event: ClientEvent = serde_json::from_value(raw).expect("read");
    assert_eq!(event, ClientEvent::Read(ReadData { message_id: 120, room_id: 42, user_id: Some(user) }));
}

#[test]
fn deserialize_unknown_type_fails() {
    let result = serde_json::from_str::<ClientEvent>(r#"{"type":"TYPING","data":{"room_id":1}}"#);
    assert!(result.is_err());
}

#[test]
fn deserialize_non_numeric_id_fails() {
    let result = serde_json::from_str::<ClientEvent>(r#"{"type":"OPEN","data":{"room_id":"abc"}}"#);
    assert!(result.is_err());
}

#[test]
fn deserialize_empty_id_fails() {
    let result = serde_json::from_str::<ClientEvent>(r#"{"type":"OPEN","data":{"room_id":" "}}"#);
    assert!(result.is_err());
}

#[derive(Debug, Deserialize)]
struct OptionalId {
    #[serde(default, deserialize_with = "flexible_id_opt")]
    id: Option<i64>,
}

#[test]
fn optional_flexible_id_accepts_numbers_strings_and_absence() {
    let parse = |raw: &str| serde_json::from_str::<OptionalId>(raw).map(|v| v.id);
    assert_eq!(parse(r#"{"id":5}"#).unwrap(), Some(5));
    assert_eq!(parse(r#"{"id":" 5 "}"#).unwrap(), Some(5));
    assert_eq!(parse(r#"{"id":""}"#).unwrap(), None);
    assert_eq!(parse(r#"{"id":null}"#).unwrap(), None);
    assert_eq!(parse("{}").unwrap(), None);
    assert!(parse(r#"{"id":"five"}"#).is_err());
}

#[test]
fn deserialize_message_missing_text_fails() {
    let result = serde_json::from_str::<ClientEvent>(r#"{"type":"MESSAGE","data":{"room_id":1}}"#);
    assert!(result.is_err());
}

#[test]
fn server_message_event_shape() {
    let sender = Uuid::new_v4();
    let event = ServerEvent::Message(Message {
        id: 9,
        room_id: 2,
        sender_id: sender,
        text: "hi".into(),
        sent_at: datetime!(2024-05-01 10:00:00 UTC),
        is_read: false,
        is_blocked: false,
    });
    let value = serde_json::to_value(&event).expect("serialize");
    assert_eq!(value["type"], "MESSAGE");
    assert_eq!(value["data"]["id"], 9);
    assert_eq!(value["data"]["room_id"], 2);
    assert_eq!(value["data"]["sent_at"], "2024-05-01T10:00:00Z");
    assert_eq!(value["data"]["is_blocked"], false);
}

#[test]
fn server_read_event_shape() {
    let user = Uuid::new_v4();
    let event = ServerEvent::Read(ReadReceipt { message_id: 5, room_id: 1, user_id: user });
    let value = serde_json::to_value(&event).expect("serialize");
    assert_eq!(value, json!({"type": "READ", "data": {"message_id": 5, "room_id": 1, "user_id": user}}));
}

#[test]
fn server_opened_event_shape() {
    let value = serde_json::to_value(ServerEvent::Opened { room_id: 11 }).expect("serialize");
    assert_eq!(value, json!({"type": "OPENED", "data": {"room_id": 11}}));
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("slow store")]
    struct Slow;

    impl ErrorCode for Slow {
        fn error_code(&self) -> &'static str {
            "E_TIMEOUT"
        }

        fn retryable(&self) -> bool {
            true
        }
    }

    let event = ServerEvent::error_from(&Slow);
    assert_eq!(event.kind(), "ERROR");
    assert_eq!(
        event,
        ServerEvent::Error(ErrorData { code: "E_TIMEOUT".into(), message: "slow store".into(), retryable: true })
    );
}
