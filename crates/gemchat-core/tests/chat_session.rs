use std::sync::Arc;
use std::time::{Duration, Instant};

use gemchat_core::{
    dispatch, ApiError, ChatError, ChatRole, ChatSession, ConcurrencyMode, MockBackend, Notice,
    SessionSettings,
};

#[tokio::test]
async fn hello_gets_a_reply() {
    let backend = MockBackend::new();
    backend.push_reply("Hi there");

    let mut session = ChatSession::default();
    session.set_draft("Hello");
    session.send(&backend, None).await.unwrap();

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!((messages[0].role, messages[0].content.as_str()), (ChatRole::User, "Hello"));
    assert_eq!((messages[1].role, messages[1].content.as_str()), (ChatRole::Model, "Hi there"));
    assert!(messages.iter().all(|m| m.timestamp.is_some()));
    assert_eq!(session.draft(), "");
    assert!(!session.pending().is_any_pending());
}

#[tokio::test]
async fn empty_prompt_never_reaches_the_api() {
    let backend = MockBackend::new();
    let mut session = ChatSession::default();

    let err = session.send(&backend, None).await.unwrap_err();
    assert!(matches!(err, ChatError::Send(_)));
    assert_eq!(err.notice(), Some(Notice::PromptRequired));
    assert_eq!(backend.call_count(), 0);
    assert!(session.conversation().is_empty());
    assert!(!session.pending().is_any_pending());
}

#[tokio::test]
async fn n_sends_make_2n_alternating_messages() {
    let backend = MockBackend::new();
    let mut session = ChatSession::default();

    for i in 0..5 {
        backend.push_reply(&format!("reply {}", i));
        session.set_draft(format!("prompt {}", i));
        session.send(&backend, None).await.unwrap();
    }

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 10);
    for (i, pair) in messages.chunks(2).enumerate() {
        assert_eq!(pair[0].role, ChatRole::User);
        assert_eq!(pair[0].content, format!("prompt {}", i));
        assert_eq!(pair[1].role, ChatRole::Model);
        assert_eq!(pair[1].content, format!("reply {}", i));
    }
}

#[tokio::test]
async fn history_is_replayed_on_every_call() {
    let backend = MockBackend::new();
    let mut session = ChatSession::default();

    session.set_draft("first");
    session.send(&backend, None).await.unwrap();
    session.set_draft("second");
    session.send(&backend, None).await.unwrap();

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].history.is_empty());
    assert_eq!(requests[0].message, "first");
    assert_eq!(requests[1].history.len(), 2);
    assert_eq!(requests[1].history[0].content, "first");
    assert_eq!(requests[1].history[1].content, "Mock answer");
    assert_eq!(requests[1].message, "second");
    assert_eq!(requests[1].max_output_tokens, 1000);
}

#[tokio::test]
async fn api_failure_leaves_state_untouched() {
    let backend = MockBackend::new();
    backend.push_reply("Hi there");
    backend.push_error(ApiError::Status {
        status: 503,
        body: "unavailable".to_string(),
    });

    let mut session = ChatSession::default();
    session.set_draft("Hello");
    session.send(&backend, None).await.unwrap();

    session.set_draft("X");
    let err = session.send(&backend, None).await.unwrap_err();
    assert_eq!(err.notice(), Some(Notice::RequestFailed));
    assert_eq!(session.conversation().len(), 2);
    assert_eq!(session.draft(), "X");
    assert!(!session.pending().is_any_pending());
    assert!(session.can_send());
}

#[tokio::test]
async fn send_is_disabled_while_a_request_is_pending() {
    let backend = Arc::new(MockBackend::new().with_delay(Duration::from_millis(50)));
    let mut session = ChatSession::default();

    session.set_draft("first");
    let outgoing = session.begin_send().unwrap();
    assert!(!session.can_send());

    let task = {
        let backend = backend.clone();
        let request = outgoing.request.clone();
        tokio::spawn(async move { dispatch(backend.as_ref(), &request, None).await })
    };

    session.set_draft("X");
    assert!(session.begin_send().is_err());

    let outcome = task.await.unwrap();
    session.complete_send(outgoing.id, outcome, Instant::now()).unwrap();
    assert!(session.can_send());
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn multiple_mode_allows_concurrent_requests() {
    let backend = Arc::new(MockBackend::new());
    backend.push_reply("a");
    backend.push_reply("b");

    let mut session = ChatSession::new(SessionSettings {
        concurrency: ConcurrencyMode::Multiple,
        ..SessionSettings::default()
    });

    session.set_draft("one");
    let first = session.begin_send().unwrap();
    session.set_draft("two");
    let second = session.begin_send().unwrap();
    assert_eq!(session.pending().count(), 2);
    assert!(session.can_send());

    // Resolve out of order
    let second_reply = dispatch(backend.as_ref(), &second.request, None).await;
    let first_reply = dispatch(backend.as_ref(), &first.request, None).await;
    session.complete_send(second.id, second_reply, Instant::now()).unwrap();
    assert!(session.pending().is_pending(first.id));
    session.complete_send(first.id, first_reply, Instant::now()).unwrap();

    let contents: Vec<&str> = session
        .conversation()
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["two", "a", "one", "b"]);
    assert!(!session.pending().is_any_pending());
}

#[tokio::test]
async fn timeout_resolves_as_failure() {
    let backend = MockBackend::new().with_delay(Duration::from_secs(30));
    let mut session = ChatSession::default();
    session.set_draft("slow");

    let err = session
        .send(&backend, Some(Duration::from_millis(20)))
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Api(ApiError::Timeout(_))));
    assert_eq!(session.draft(), "slow");
    assert!(!session.pending().is_any_pending());
}
