use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use puckchat_client::{
    ApiError, ApiResult, ChatBackend, ChatError, ChatReply, ChatRequest,
    ConversationSessionClient, HealthStatus, RatingReply, RatingRequest,
};
use puckchat_config::WidgetConfig;
use puckchat_core::{Activity, MessageId, Rating};
use puckchat_session::{
    KeyValueStore, MemoryStore, SessionStore, StorageError, StorageResult, SESSION_ID_KEY,
};
use tokio::sync::Notify;

/// Backend that replays queued results and records every request
#[derive(Default)]
struct ScriptedBackend {
    chat_results: Mutex<VecDeque<ApiResult<ChatReply>>>,
    clear_results: Mutex<VecDeque<ApiResult<()>>>,
    rate_results: Mutex<VecDeque<ApiResult<RatingReply>>>,
    chat_requests: Mutex<Vec<ChatRequest>>,
    rate_requests: Mutex<Vec<RatingRequest>>,
    clear_calls: AtomicUsize,
    /// When set, `/chat` waits for a permit before answering
    gate: Option<Arc<Notify>>,
}

impl ScriptedBackend {
    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }

    fn reply(&self, response: &str, id: i64) {
        self.chat_results.lock().push_back(Ok(ChatReply {
            response: response.to_string(),
            message_id: Some(MessageId::Number(id)),
            ..Default::default()
        }));
    }

    fn fail_chat(&self, error: ApiError) {
        self.chat_results.lock().push_back(Err(error));
    }

    fn fail_clear(&self, error: ApiError) {
        self.clear_results.lock().push_back(Err(error));
    }

    fn fail_rate(&self, error: ApiError) {
        self.rate_results.lock().push_back(Err(error));
    }

    fn chat_count(&self) -> usize {
        self.chat_requests.lock().len()
    }

    fn sent_ratings(&self) -> Vec<Rating> {
        self.rate_requests.lock().iter().map(|r| r.rating).collect()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send_message(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
        self.chat_requests.lock().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.chat_results.lock().pop_front();
        next.unwrap_or_else(|| {
            Ok(ChatReply {
                response: "ok".to_string(),
                ..Default::default()
            })
        })
    }

    async fn clear_conversation(&self) -> ApiResult<()> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.clear_results.lock().pop_front();
        next.unwrap_or(Ok(()))
    }

    async fn rate_message(&self, request: &RatingRequest) -> ApiResult<RatingReply> {
        self.rate_requests.lock().push(request.clone());
        let next = self.rate_results.lock().pop_front();
        next.unwrap_or_else(|| Ok(RatingReply::default()))
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        Ok(HealthStatus {
            status: Some("healthy".to_string()),
            ..Default::default()
        })
    }
}

/// Storage whose writes fail once `read_only` is set
#[derive(Default)]
struct LockableStore {
    entries: MemoryStore,
    read_only: AtomicBool,
}

impl LockableStore {
    fn check_writable(&self) -> StorageResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "storage is read-only",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for LockableStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.entries.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check_writable()?;
        self.entries.set(key, value).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.check_writable()?;
        self.entries.remove(key).await
    }
}

struct Harness {
    backend: Arc<ScriptedBackend>,
    storage: Arc<MemoryStore>,
    client: ConversationSessionClient,
}

fn harness_with(backend: ScriptedBackend) -> Harness {
    let backend = Arc::new(backend);
    let storage = Arc::new(MemoryStore::new());
    let client = ConversationSessionClient::new(
        backend.clone(),
        SessionStore::new(storage.clone()),
        WidgetConfig::default(),
    );
    Harness {
        backend,
        storage,
        client,
    }
}

fn harness() -> Harness {
    harness_with(ScriptedBackend::default())
}

#[tokio::test]
async fn initialize_session_is_stable() {
    let h = harness();
    let first = h.client.initialize_session().await.unwrap();
    let second = h.client.initialize_session().await.unwrap();
    assert_eq!(first, second);

    // A second widget over the same storage picks up the same id
    let other = ConversationSessionClient::new(
        h.backend.clone(),
        SessionStore::new(h.storage.clone()),
        WidgetConfig::default(),
    );
    assert_eq!(other.initialize_session().await.unwrap(), first);
}

#[tokio::test]
async fn blank_input_is_not_sent() {
    let h = harness();
    let before = h.client.snapshot();

    for input in ["", "   ", "\n\t"] {
        let err = h.client.send_message(input).await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
    }

    assert_eq!(h.backend.chat_count(), 0);
    assert_eq!(h.client.snapshot(), before);
}

#[tokio::test]
async fn successful_send_appends_user_then_bot() {
    let h = harness();
    h.backend.reply("Ahoj, jak mohu pomoci?", 7);
    let session = h.client.initialize_session().await.unwrap();

    let reply = h.client.send_message("hi").await.unwrap();
    assert_eq!(reply.id, Some(MessageId::Number(7)));

    let state = h.client.snapshot();
    assert_eq!(state.messages.len(), 2);
    assert!(state.messages[0].is_user);
    assert_eq!(state.messages[0].content, "hi");
    assert!(!state.messages[1].is_user);
    assert_eq!(state.messages[1].content, "Ahoj, jak mohu pomoci?");
    assert!(!state.is_loading());
    assert!(state.error.is_none());

    let requests = h.backend.chat_requests.lock().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].message, "hi");
    assert_eq!(requests[0].session_id, session.as_str());
}

#[tokio::test]
async fn send_initializes_session_lazily() {
    let h = harness();
    h.client.send_message("hi").await.unwrap();

    let persisted = h.storage.get(SESSION_ID_KEY).await.unwrap().unwrap();
    assert_eq!(h.backend.chat_requests.lock()[0].session_id, persisted);
}

#[tokio::test]
async fn failed_send_appends_apology() {
    let h = harness();
    h.backend
        .fail_chat(ApiError::Transport("connection refused".to_string()));

    let err = h.client.send_message("hi").await.unwrap_err();
    assert!(matches!(err, ChatError::Api(ApiError::Transport(_))));

    let widget = WidgetConfig::default();
    let state = h.client.snapshot();
    assert_eq!(state.messages.len(), 2);
    assert!(state.messages[0].is_user);
    assert_eq!(state.messages[1].content, widget.apology_message);
    assert_eq!(state.messages[1].id, None);
    assert_eq!(state.error.as_deref(), Some(widget.send_failed_message.as_str()));
    assert!(!state.is_loading());
    assert_eq!(state.activity, Activity::Idle);
}

#[tokio::test]
async fn failed_send_surfaces_server_detail() {
    let h = harness();
    h.backend.fail_chat(ApiError::Status {
        status: 503,
        detail: Some("Chatbot not initialized".to_string()),
    });

    let _ = h.client.send_message("hi").await;
    assert_eq!(
        h.client.snapshot().error.as_deref(),
        Some("Chatbot not initialized")
    );
}

#[tokio::test]
async fn next_send_clears_previous_error() {
    let h = harness();
    h.backend.fail_chat(ApiError::Decode("bad json".to_string()));
    let _ = h.client.send_message("first").await;
    assert!(h.client.snapshot().error.is_some());

    h.client.send_message("second").await.unwrap();
    let state = h.client.snapshot();
    assert!(state.error.is_none());
    assert_eq!(state.messages.len(), 4);
}

#[tokio::test]
async fn rating_twice_resets_to_neutral() {
    let h = harness();
    h.backend.reply("answer", 3);
    h.client.send_message("q").await.unwrap();
    let id = MessageId::Number(3);

    assert_eq!(
        h.client.rate_message(&id, Rating::Positive).await.unwrap(),
        Rating::Positive
    );
    assert_eq!(
        h.client.rate_message(&id, Rating::Positive).await.unwrap(),
        Rating::Neutral
    );

    assert_eq!(
        h.backend.sent_ratings(),
        vec![Rating::Positive, Rating::Neutral]
    );
    let state = h.client.snapshot();
    assert_eq!(state.find_message(&id).unwrap().current_rating(), Rating::Neutral);
}

#[tokio::test]
async fn rating_switches_direction() {
    let h = harness();
    h.backend.reply("answer", 3);
    h.client.send_message("q").await.unwrap();
    let id = MessageId::Number(3);

    h.client.rate_message(&id, Rating::Positive).await.unwrap();
    let now = h.client.rate_message(&id, Rating::Negative).await.unwrap();
    assert_eq!(now, Rating::Negative);

    let body = serde_json::to_value(&h.backend.rate_requests.lock()[1]).unwrap();
    assert_eq!(body, serde_json::json!({"message_id": 3, "rating": -1}));
}

#[tokio::test]
async fn failed_rating_reverts_to_previous_value() {
    let h = harness();
    h.backend.reply("answer", 3);
    h.client.send_message("q").await.unwrap();
    let id = MessageId::Number(3);

    h.client.rate_message(&id, Rating::Positive).await.unwrap();
    h.backend.fail_rate(ApiError::Status {
        status: 500,
        detail: None,
    });

    assert!(h.client.rate_message(&id, Rating::Negative).await.is_err());

    let state = h.client.snapshot();
    assert_eq!(state.find_message(&id).unwrap().rating, Some(Rating::Positive));
    assert_eq!(
        state.error.as_deref(),
        Some(WidgetConfig::default().rate_failed_message.as_str())
    );
}

#[tokio::test]
async fn welcome_and_user_messages_are_not_rateable() {
    let h = harness();
    h.client.open_chat();
    h.client.send_message("q").await.unwrap();

    let state = h.client.snapshot();
    let user_id = state.messages[1].id.clone().unwrap();

    let err = h
        .client
        .rate_message(&MessageId::welcome(), Rating::Positive)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::NotRateable(_)));

    let err = h
        .client
        .rate_message(&user_id, Rating::Positive)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::NotRateable(_)));

    let err = h
        .client
        .rate_message(&MessageId::Number(404), Rating::Positive)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::UnknownMessage(_)));

    assert!(h.backend.rate_requests.lock().is_empty());
    assert_eq!(h.client.snapshot(), state);
}

#[tokio::test]
async fn clear_empties_and_rotates_session() {
    let h = harness();
    h.client.open_chat();
    let before = h.client.initialize_session().await.unwrap();
    h.client.send_message("q").await.unwrap();

    let after = h.client.clear_conversation().await.unwrap();
    assert_ne!(before, after);
    assert_eq!(h.client.session_id(), Some(after.clone()));
    assert_eq!(
        h.storage.get(SESSION_ID_KEY).await.unwrap(),
        Some(after.to_string())
    );

    let state = h.client.snapshot();
    assert!(state.messages.is_empty());
    assert!(!state.welcome_shown);
    assert_eq!(h.backend.clear_calls.load(Ordering::SeqCst), 1);

    h.client.send_message("again").await.unwrap();
    let requests = h.backend.chat_requests.lock().clone();
    assert_eq!(requests[1].session_id, after.as_str());
}

#[tokio::test]
async fn failed_clear_keeps_messages() {
    let h = harness();
    let before = h.client.initialize_session().await.unwrap();
    h.client.send_message("q").await.unwrap();
    h.backend
        .fail_clear(ApiError::Transport("timeout".to_string()));

    assert!(h.client.clear_conversation().await.is_err());

    let state = h.client.snapshot();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(
        state.error.as_deref(),
        Some(WidgetConfig::default().clear_failed_message.as_str())
    );
    assert_eq!(h.client.initialize_session().await.unwrap(), before);
}

#[tokio::test]
async fn clear_with_unwritable_storage_still_empties_conversation() {
    let backend = Arc::new(ScriptedBackend::default());
    let storage = Arc::new(LockableStore::default());
    let client = ConversationSessionClient::new(
        backend.clone(),
        SessionStore::new(storage.clone()),
        WidgetConfig::default(),
    );
    let original = client.initialize_session().await.unwrap();
    client.send_message("q").await.unwrap();

    storage.read_only.store(true, Ordering::SeqCst);
    let err = client.clear_conversation().await.unwrap_err();
    assert!(matches!(err, ChatError::Storage(_)));
    assert_eq!(backend.clear_calls.load(Ordering::SeqCst), 1);

    let state = client.snapshot();
    assert!(state.messages.is_empty());
    assert!(!state.welcome_shown);
    assert!(state.error.is_none());
    assert_eq!(state.activity, Activity::Idle);
    assert_eq!(client.session_id(), None);

    // The cached id is gone, so the next send re-reads what storage still holds
    client.send_message("again").await.unwrap();
    assert_eq!(client.session_id(), Some(original.clone()));
    let requests = backend.chat_requests.lock().clone();
    assert_eq!(requests[1].session_id, original.as_str());
}

#[tokio::test]
async fn welcome_is_only_reinserted_after_clear() {
    let h = harness();
    h.client.open_chat();
    h.client.send_message("q").await.unwrap();
    h.client.close_chat();
    h.client.open_chat();

    let welcomes = |h: &Harness| {
        h.client
            .snapshot()
            .messages
            .iter()
            .filter(|m| m.is_welcome())
            .count()
    };
    assert_eq!(welcomes(&h), 1);
    assert!(!h.client.ensure_welcome());

    h.client.clear_conversation().await.unwrap();
    assert_eq!(welcomes(&h), 0);

    assert!(h.client.ensure_welcome());
    assert!(!h.client.ensure_welcome());
    assert_eq!(welcomes(&h), 1);
}

#[tokio::test]
async fn overlapping_operations_are_rejected() {
    let gate = Arc::new(Notify::new());
    let h = harness_with(ScriptedBackend::gated(gate.clone()));
    h.backend.reply("slow answer", 9);

    let mut changes = h.client.subscribe();
    let sender = h.client.clone();
    let pending = tokio::spawn(async move { sender.send_message("slow").await });

    changes.wait_for(|state| state.is_loading()).await.unwrap();
    let during = h.client.snapshot();
    assert_eq!(during.messages.len(), 1);

    let err = h.client.clear_conversation().await.unwrap_err();
    assert!(matches!(
        err,
        ChatError::Busy {
            current: Activity::Sending
        }
    ));
    let err = h.client.send_message("second").await.unwrap_err();
    assert!(matches!(err, ChatError::Busy { .. }));
    assert_eq!(h.client.snapshot(), during);
    assert_eq!(h.backend.clear_calls.load(Ordering::SeqCst), 0);

    gate.notify_one();
    let reply = pending.await.unwrap().unwrap();
    assert_eq!(reply.content, "slow answer");

    let state = h.client.snapshot();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.activity, Activity::Idle);
    assert_eq!(h.backend.chat_count(), 1);
}

#[tokio::test]
async fn quick_options_send_their_query() {
    let h = harness();
    let option = h.client.quick_options()[1].clone();

    h.client.send_quick_option(1).await.unwrap();
    assert_eq!(h.backend.chat_requests.lock()[0].message, option.query);
    assert_eq!(h.client.snapshot().messages[0].content, option.query);
}

#[tokio::test]
async fn quick_options_collapse_is_persisted() {
    let h = harness();
    assert!(!h.client.quick_options_collapsed().await.unwrap());
    assert!(h.client.toggle_quick_options().await.unwrap());

    let reopened = SessionStore::new(h.storage.clone());
    assert!(reopened.quick_options_collapsed().await.unwrap());
    assert!(!h.client.toggle_quick_options().await.unwrap());
}

#[tokio::test]
async fn health_passes_through() {
    let h = harness();
    assert!(h.client.health().await.unwrap().is_healthy());
}
