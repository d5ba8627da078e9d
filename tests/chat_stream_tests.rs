//! Streamed chat replies end to end: HTTP body, frame decoding, folding and
//! persistence.

mod common;

use common::{Canned, CannedServer, client_for};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use stylegpt::session::load_messages;
use stylegpt::stream::{FoldOutcome, StreamEvent};
use stylegpt::{ChatMode, ChatSession, MessageKind, Storage};

#[tokio::test]
async fn frames_split_across_writes_are_reassembled() {
    let server = CannedServer::start(vec![Canned::events(&[
        "data: {\"type\":\"chunk\",\"content\":\"Pair it \"}\n\ndata: {\"type\":\"chu",
        "nk\",\"content\":\"with loafers.\"}\n\n",
        "data: {\"type\":\"done\",\"selectedItems\":[{\"id\":3,\"category\":\"loafers\",\"style\":\"smart\",\"imageUrl\":\"/3.png\"}]}\n\n",
    ])])
    .await;
    let (api, _) = client_for(&server);

    let events: Vec<StreamEvent> = api
        .suggest_stream("shoes?", "s-1", None)
        .await
        .unwrap()
        .map(|event| event.unwrap())
        .collect()
        .await;

    assert_eq!(events.len(), 3);
    assert_eq!(
        events[1],
        StreamEvent::Chunk {
            content: "with loafers.".into()
        }
    );
    match &events[2] {
        StreamEvent::Done { selected_items, .. } => {
            assert_eq!(selected_items.as_ref().unwrap()[0].id, "3");
        }
        other => panic!("expected done, got {other:?}"),
    }
    assert_eq!(
        server.requests()[0].header("accept"),
        Some("text/event-stream")
    );
}

#[tokio::test]
async fn fashion_session_streams_reply_into_history() {
    let server = CannedServer::start(vec![Canned::events(&[
        "data: {\"type\":\"chunk\",\"content\":\"Go for earth tones. \"}\n\n",
        "data: {\"type\":\"chunk\",\"content\":\"Olive works with tan.\"}\n\n",
        "data: {\"type\":\"done\",\"avatar_preview_url\":\"https://render.example/p.png\"}\n\n",
    ])])
    .await;
    let (api, store) = client_for(&server);
    let session = ChatSession::open(&api, ChatMode::Fashion, "guest");
    let session_id = session.session_id();

    let outcome = session.send_streaming("autumn palette?", None).await.unwrap();
    assert!(matches!(outcome, FoldOutcome::Completed));

    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].kind, MessageKind::Ai);
    assert_eq!(messages[1].content, "Go for earth tones. Olive works with tan.");
    assert_eq!(
        messages[1].avatar_preview_url.as_deref(),
        Some("https://render.example/p.png")
    );
    assert_eq!(load_messages(store.as_ref(), "fashion_messages_guest"), messages);
    assert_eq!(store.get("fashion_session_id_guest"), Some(session_id.clone()));

    let request = &server.requests()[0];
    assert_eq!(request.target, "/chat/upload/stream");
    assert!(request.body.contains("name=\"session_id\""));
    assert!(request.body.contains(&session_id));
}

#[tokio::test]
async fn garbled_tail_is_trimmed_when_stream_ends() {
    let server = CannedServer::start(vec![Canned::events(&[
        "data: {\"type\":\"chunk\",\"content\":\"Wear the grey chinos.\"}\n\n",
        "data: {\"type\":\"chunk\",\"content\":\" Thisisgarbledfragment\"}\n\n",
    ])])
    .await;
    let (api, _) = client_for(&server);
    let session = ChatSession::open(&api, ChatMode::Wardrobe, "u1");

    session.send_streaming("trousers?", None).await.unwrap();
    assert_eq!(session.messages()[1].content, "Wear the grey chinos.");
}

#[tokio::test]
async fn rejected_stream_becomes_error_message() {
    let server = CannedServer::start(vec![Canned::json(
        401,
        serde_json::json!({"error": "No token provided"}),
    )])
    .await;
    let (api, _) = client_for(&server);
    let session = ChatSession::open(&api, ChatMode::Wardrobe, "u1");

    let outcome = session.send_streaming("hello", None).await.unwrap();
    assert!(matches!(outcome, FoldOutcome::Interrupted(_)));
    let reply = &session.messages()[1];
    assert!(reply.content.starts_with("HTTP error! status: 401"));
    assert!(!reply.is_streaming);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn cancelling_keeps_partial_reply() {
    let server = CannedServer::start(vec![
        Canned::events(&[
            "data: {\"type\":\"chunk\",\"content\":\"Start with a white tee.\"}\n\n",
            "data: {\"type\":\"chunk\",\"content\":\" Never arrives.\"}\n\n",
        ])
        .with_pause(Duration::from_secs(5)),
    ])
    .await;
    let (api, _) = client_for(&server);
    let session = Arc::new(ChatSession::open(&api, ChatMode::Fashion, "guest"));

    let mut updates = session.subscribe();
    let watcher = {
        let session = session.clone();
        tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let started = updates
                    .borrow_and_update()
                    .last()
                    .is_some_and(|m| m.kind == MessageKind::Ai && !m.content.is_empty());
                if started {
                    session.cancel_reply();
                    break;
                }
            }
        })
    };

    let outcome = tokio::time::timeout(
        Duration::from_secs(3),
        session.send_streaming("basics?", None),
    )
    .await
    .expect("cancel should end the stream")
    .unwrap();
    watcher.await.unwrap();

    assert!(matches!(outcome, FoldOutcome::Cancelled));
    let reply = &session.messages()[1];
    assert_eq!(reply.content, "Start with a white tee.");
    assert!(!reply.is_streaming);
}
