use std::future::Future;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use puckchat_client::ConversationSessionClient;
use puckchat_core::{ConversationState, Rating};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use unicode_width::UnicodeWidthStr;

/// Input box never grows past this many text rows
pub const MAX_INPUT_ROWS: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Checking,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "● Online"),
            ConnectionStatus::Disconnected => write!(f, "○ Offline"),
            ConnectionStatus::Checking => write!(f, "◐ Connecting"),
        }
    }
}

pub struct App {
    pub client: ConversationSessionClient,
    /// Latest state published by the client
    pub state: ConversationState,
    changes: watch::Receiver<ConversationState>,
    pub input: String,
    pub status: ConnectionStatus,
    /// Index into `state.messages` of the bot reply selected for rating
    pub selected: Option<usize>,
    pub quick_options_collapsed: bool,
    pub tick: usize,
    tasks: Vec<JoinHandle<()>>,
}

impl App {
    pub async fn new(client: ConversationSessionClient) -> anyhow::Result<Self> {
        client.initialize_session().await?;
        let quick_options_collapsed = client.quick_options_collapsed().await?;
        let changes = client.subscribe();
        let state = client.snapshot();

        Ok(Self {
            client,
            state,
            changes,
            input: String::new(),
            status: ConnectionStatus::Disconnected,
            selected: None,
            quick_options_collapsed,
            tick: 0,
            tasks: Vec::new(),
        })
    }

    pub async fn check_connection(&mut self) {
        self.status = ConnectionStatus::Checking;
        self.status = match self.client.health().await {
            Ok(health) if health.is_healthy() => ConnectionStatus::Connected,
            Ok(health) => {
                warn!("Backend reports status {:?}", health.status);
                ConnectionStatus::Disconnected
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                ConnectionStatus::Disconnected
            }
        };
    }

    /// Pick up state changes made by background operations
    pub fn sync_state(&mut self) {
        if self.changes.has_changed().unwrap_or(false) {
            self.state = self.changes.borrow_and_update().clone();
            self.fix_selection();
        }
        self.tasks.retain(|task| !task.is_finished());
    }

    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    /// A send, clear or rate is still running
    pub fn is_busy(&self) -> bool {
        self.state.is_busy() || self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Handle one key press, returning true when the app should quit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => return true,
            KeyCode::Char('o') if ctrl => self.toggle_chat(),
            _ if !self.state.is_open => {
                if key.code == KeyCode::Enter {
                    self.toggle_chat();
                }
            }
            KeyCode::Char('l') if ctrl => self.clear_conversation(),
            KeyCode::Char('k') if ctrl => self.toggle_quick_options(),
            KeyCode::Char('u') if ctrl => self.rate_selected(Rating::Positive),
            KeyCode::Char('d') if ctrl => self.rate_selected(Rating::Negative),
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => self.input.push('\n'),
            KeyCode::Enter => self.send_input(),
            KeyCode::F(n @ 1..=9) => {
                let index = usize::from(n) - 1;
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.fill_quick_option(index);
                } else {
                    self.send_quick_option(index);
                }
            }
            KeyCode::Up => self.select_previous(),
            KeyCode::Down => self.select_next(),
            KeyCode::Esc => self.escape(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) if !ctrl => self.input.push(c),
            _ => {}
        }
        false
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(tokio::spawn(task));
    }

    fn toggle_chat(&mut self) {
        self.client.toggle_chat();
        self.sync_state();
    }

    fn escape(&mut self) {
        if self.state.error.is_some() {
            self.client.dismiss_error();
        } else if self.selected.is_some() {
            self.selected = None;
        } else {
            self.client.close_chat();
        }
        self.sync_state();
    }

    pub fn send_input(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() || self.is_busy() {
            return;
        }

        self.input.clear();
        self.selected = None;
        let client = self.client.clone();
        self.spawn(async move {
            if let Err(e) = client.send_message(&text).await {
                debug!("Send finished with error: {}", e);
            }
        });
    }

    fn send_quick_option(&mut self, index: usize) {
        if self.quick_options_collapsed
            || index >= self.client.quick_options().len()
            || self.is_busy()
        {
            return;
        }

        self.selected = None;
        let client = self.client.clone();
        self.spawn(async move {
            if let Err(e) = client.send_quick_option(index).await {
                debug!("Quick option finished with error: {}", e);
            }
        });
    }

    /// Put the option's caption, minus emoji, into the input box
    fn fill_quick_option(&mut self, index: usize) {
        if self.quick_options_collapsed {
            return;
        }
        if let Some(option) = self.client.quick_options().get(index) {
            self.input = option.plain_label();
        }
    }

    fn clear_conversation(&mut self) {
        if self.is_busy() {
            return;
        }

        self.selected = None;
        let client = self.client.clone();
        self.spawn(async move {
            match client.clear_conversation().await {
                Ok(_) => {
                    if client.snapshot().is_open {
                        client.ensure_welcome();
                    }
                }
                Err(e) => debug!("Clear finished with error: {}", e),
            }
        });
    }

    fn toggle_quick_options(&mut self) {
        self.quick_options_collapsed = !self.quick_options_collapsed;
        let collapsed = self.quick_options_collapsed;
        let store = self.client.store().clone();
        self.spawn(async move {
            if let Err(e) = store.set_quick_options_collapsed(collapsed).await {
                warn!("Failed to persist quick options state: {}", e);
            }
        });
    }

    fn rate_selected(&mut self, rating: Rating) {
        if self.is_busy() {
            return;
        }
        let Some(id) = self
            .selected
            .and_then(|idx| self.state.messages.get(idx))
            .and_then(|message| message.id.clone())
        else {
            return;
        };

        let client = self.client.clone();
        self.spawn(async move {
            if let Err(e) = client.rate_message(&id, rating).await {
                debug!("Rating finished with error: {}", e);
            }
        });
    }

    fn select_previous(&mut self) {
        let rateable = self.state.rateable_indexes();
        self.selected = match self.selected {
            None => rateable.last().copied(),
            Some(current) => rateable
                .iter()
                .rev()
                .find(|&&idx| idx < current)
                .copied()
                .or(Some(current)),
        };
    }

    fn select_next(&mut self) {
        let rateable = self.state.rateable_indexes();
        // Moving past the newest reply returns focus to the input
        self.selected = self
            .selected
            .and_then(|current| rateable.iter().find(|&&idx| idx > current).copied());
    }

    fn fix_selection(&mut self) {
        if let Some(idx) = self.selected {
            let still_rateable = self
                .state
                .messages
                .get(idx)
                .map(|message| message.is_rateable())
                .unwrap_or(false);
            if !still_rateable {
                self.selected = None;
            }
        }
    }

    /// Text rows the input box needs at `width` columns, between 1 and [`MAX_INPUT_ROWS`]
    pub fn input_rows(&self, width: u16) -> u16 {
        let width = usize::from(width.max(1));
        let rows: usize = self
            .input
            .split('\n')
            .map(|line| (line.width() + 1).div_ceil(width).max(1))
            .sum();
        rows.clamp(1, usize::from(MAX_INPUT_ROWS)) as u16
    }

    /// Wait for every background operation and pick up the result
    #[cfg(test)]
    pub async fn wait_idle(&mut self) {
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        self.sync_state();
    }
}
