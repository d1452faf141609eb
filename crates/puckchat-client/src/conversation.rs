//! Conversation session client.
//!
//! Owns the observable [`ConversationState`] of one chat widget and drives the
//! `/chat`, `/clear` and `/rate` round trips against a [`ChatBackend`]. At most
//! one of those operations runs at a time; overlapping calls fail with
//! [`ChatError::Busy`] and leave the state untouched.

use std::sync::Arc;

use parking_lot::Mutex;
use puckchat_config::{Config, WidgetConfig};
use puckchat_core::{
    Activity, ConversationState, Message, MessageId, QuickOption, Rating, SessionId,
};
use puckchat_session::{JsonFileStore, SessionStore};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ChatBackend, ChatRequest, HealthStatus, HttpChatBackend, RatingRequest};
use crate::error::{ChatError, ChatResult};

struct Inner {
    backend: Arc<dyn ChatBackend>,
    store: SessionStore,
    widget: WidgetConfig,
    state: Mutex<ConversationState>,
    session: Mutex<Option<SessionId>>,
    changes: watch::Sender<ConversationState>,
}

impl Inner {
    /// Apply `f` to the state and publish the result to subscribers
    fn update<R>(&self, f: impl FnOnce(&mut ConversationState) -> R) -> R {
        let mut state = self.state.lock();
        let result = f(&mut state);
        let snapshot = state.clone();
        drop(state);
        self.changes.send_replace(snapshot);
        result
    }

    /// Claim the activity slot.
    ///
    /// `prepare` runs under the same lock as the busy check, so its edits are
    /// only applied when the slot was free.
    fn begin<R>(
        &self,
        activity: Activity,
        prepare: impl FnOnce(&mut ConversationState) -> ChatResult<R>,
    ) -> ChatResult<(ActivityGuard<'_>, R)> {
        let result = {
            let mut state = self.state.lock();
            if state.is_busy() {
                debug!("Rejecting {} while {}", activity, state.activity);
                return Err(ChatError::Busy {
                    current: state.activity,
                });
            }
            let prepared = prepare(&mut state)?;
            state.activity = activity;
            let snapshot = state.clone();
            drop(state);
            self.changes.send_replace(snapshot);
            prepared
        };

        Ok((
            ActivityGuard {
                inner: self,
                finished: false,
            },
            result,
        ))
    }
}

/// Returns the state to idle when the operation ends, even if its future is dropped
struct ActivityGuard<'a> {
    inner: &'a Inner,
    finished: bool,
}

impl ActivityGuard<'_> {
    fn finish(mut self, f: impl FnOnce(&mut ConversationState)) {
        self.finished = true;
        self.inner.update(|state| {
            state.activity = Activity::Idle;
            f(state);
        });
    }
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.inner.update(|state| state.activity = Activity::Idle);
        }
    }
}

/// Handle to one chat conversation; clones share the same state
#[derive(Clone)]
pub struct ConversationSessionClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ConversationSessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSessionClient")
            .field("session", &*self.inner.session.lock())
            .field("state", &*self.inner.state.lock())
            .finish_non_exhaustive()
    }
}

impl ConversationSessionClient {
    pub fn new(backend: Arc<dyn ChatBackend>, store: SessionStore, widget: WidgetConfig) -> Self {
        let state = ConversationState::default();
        let (changes, _) = watch::channel(state.clone());
        Self {
            inner: Arc::new(Inner {
                backend,
                store,
                widget,
                state: Mutex::new(state),
                session: Mutex::new(None),
                changes,
            }),
        }
    }

    /// Build the HTTP backend and file storage described by `config`
    pub fn from_config(config: &Config) -> ChatResult<Self> {
        let backend = HttpChatBackend::from_config(&config.api)?;
        let store = SessionStore::new(Arc::new(JsonFileStore::new(&config.storage.path)));
        debug!(
            "Conversation client for {} (storage {})",
            backend.base_url(),
            config.storage.path
        );
        Ok(Self::new(Arc::new(backend), store, config.widget.clone()))
    }

    pub fn widget(&self) -> &WidgetConfig {
        &self.inner.widget
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    /// Load the persisted session id, creating one if storage has none.
    ///
    /// Repeated calls return the same id until a successful clear rotates it.
    pub async fn initialize_session(&self) -> ChatResult<SessionId> {
        let cached = self.inner.session.lock().clone();
        if let Some(id) = cached {
            return Ok(id);
        }

        let id = self.inner.store.initialize_session().await?;
        *self.inner.session.lock() = Some(id.clone());
        Ok(id)
    }

    /// Session id currently in use, if one was initialised
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.session.lock().clone()
    }

    /// Send a user message and append the backend's reply.
    ///
    /// The user message is appended before the request is made. On failure an
    /// apology is appended instead of a reply and `error` is set; the returned
    /// error carries the cause.
    pub async fn send_message(&self, text: &str) -> ChatResult<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let inner = &*self.inner;
        let (guard, ()) = inner.begin(Activity::Sending, |state| {
            state.messages.push(Message::user(text));
            state.error = None;
            Ok(())
        })?;

        let session_id = match self.initialize_session().await {
            Ok(id) => id,
            Err(e) => {
                warn!("No session id available for send: {}", e);
                guard.finish(|state| {
                    state.messages.push(Message::apology(&inner.widget.apology_message));
                    state.error = Some(inner.widget.send_failed_message.clone());
                });
                return Err(e);
            }
        };

        let request = ChatRequest {
            message: text.to_string(),
            session_id: session_id.to_string(),
        };
        debug!("Sending message in session {}", session_id.short());

        match inner.backend.send_message(&request).await {
            Ok(reply) => {
                let message = Message::bot(reply.response, reply.message_id);
                let appended = message.clone();
                guard.finish(move |state| state.messages.push(appended));
                Ok(message)
            }
            Err(e) => {
                warn!("Send failed: {}", e);
                let error = e.user_message(&inner.widget.send_failed_message);
                guard.finish(|state| {
                    state.messages.push(Message::apology(&inner.widget.apology_message));
                    state.error = Some(error);
                });
                Err(e.into())
            }
        }
    }

    /// Send the query behind the quick option at `index`
    pub async fn send_quick_option(&self, index: usize) -> ChatResult<Message> {
        let option = self
            .inner
            .widget
            .quick_options
            .get(index)
            .cloned()
            .ok_or(ChatError::UnknownQuickOption(index))?;
        self.send_message(&option.query).await
    }

    /// Reset server side history, then empty the local conversation and
    /// rotate the session id. Returns the new session id.
    ///
    /// On failure the messages are kept and `error` is set.
    pub async fn clear_conversation(&self) -> ChatResult<SessionId> {
        let inner = &*self.inner;
        let (guard, ()) = inner.begin(Activity::Clearing, |state| {
            state.error = None;
            Ok(())
        })?;

        if let Err(e) = inner.backend.clear_conversation().await {
            warn!("Clear failed: {}", e);
            let error = e.user_message(&inner.widget.clear_failed_message);
            guard.finish(|state| state.error = Some(error));
            return Err(e.into());
        }

        let rotated = inner.store.rotate_session().await;
        guard.finish(|state| {
            state.messages.clear();
            state.welcome_shown = false;
        });

        match rotated {
            Ok(id) => {
                info!("Conversation cleared, session {}", id.short());
                *inner.session.lock() = Some(id.clone());
                Ok(id)
            }
            Err(e) => {
                warn!("Conversation cleared but session rotation failed: {}", e);
                *inner.session.lock() = None;
                Err(e.into())
            }
        }
    }

    /// Rate a bot reply, returning the rating now in effect.
    ///
    /// Requesting the rating the message already has resets it to neutral.
    /// The new rating is shown immediately and reverted if the backend
    /// rejects it.
    pub async fn rate_message(&self, id: &MessageId, requested: Rating) -> ChatResult<Rating> {
        let inner = &*self.inner;
        let (guard, (previous, next)) = inner.begin(Activity::Rating, |state| {
            let message = state
                .find_message_mut(id)
                .ok_or_else(|| ChatError::UnknownMessage(id.clone()))?;
            if !message.is_rateable() {
                return Err(ChatError::NotRateable(id.clone()));
            }
            let previous = message.rating;
            let next = Rating::toggled(message.current_rating(), requested);
            message.rating = Some(next);
            state.error = None;
            Ok((previous, next))
        })?;

        let request = RatingRequest {
            message_id: id.clone(),
            rating: next,
        };
        match inner.backend.rate_message(&request).await {
            Ok(_) => {
                debug!("Rated message {} as {}", id, next.value());
                guard.finish(|_| {});
                Ok(next)
            }
            Err(e) => {
                warn!("Rating message {} failed: {}", id, e);
                let error = e.user_message(&inner.widget.rate_failed_message);
                guard.finish(|state| {
                    if let Some(message) = state.find_message_mut(id) {
                        message.rating = previous;
                    }
                    state.error = Some(error);
                });
                Err(e.into())
            }
        }
    }

    pub async fn health(&self) -> ChatResult<HealthStatus> {
        Ok(self.inner.backend.health().await?)
    }

    /// Insert the welcome message unless it was already shown since the last clear.
    ///
    /// Returns whether a message was inserted.
    pub fn ensure_welcome(&self) -> bool {
        let welcome = &self.inner.widget.welcome_message;
        self.inner.update(|state| {
            if state.welcome_shown {
                return false;
            }
            state.messages.push(Message::welcome(welcome));
            state.welcome_shown = true;
            true
        })
    }

    pub fn open_chat(&self) {
        self.inner.update(|state| state.is_open = true);
        self.ensure_welcome();
    }

    pub fn close_chat(&self) {
        self.inner.update(|state| state.is_open = false);
    }

    /// Flip the open state, returning whether the chat is now open
    pub fn toggle_chat(&self) -> bool {
        let open = !self.inner.state.lock().is_open;
        if open {
            self.open_chat();
        } else {
            self.close_chat();
        }
        open
    }

    pub fn dismiss_error(&self) {
        self.inner.update(|state| state.error = None);
    }

    pub fn quick_options(&self) -> &[QuickOption] {
        &self.inner.widget.quick_options
    }

    pub async fn quick_options_collapsed(&self) -> ChatResult<bool> {
        Ok(self.inner.store.quick_options_collapsed().await?)
    }

    /// Flip and persist the quick options panel state, returning the new value
    pub async fn toggle_quick_options(&self) -> ChatResult<bool> {
        let collapsed = !self.inner.store.quick_options_collapsed().await?;
        self.inner.store.set_quick_options_collapsed(collapsed).await?;
        Ok(collapsed)
    }

    pub fn snapshot(&self) -> ConversationState {
        self.inner.state.lock().clone()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.inner.changes.subscribe()
    }
}
