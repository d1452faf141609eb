use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use puckchat_client::ConversationSessionClient;
use puckchat_config::ConfigManager;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

mod app;
mod ui;

use app::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let manager = ConfigManager::load_default().await?;
    let config = manager.snapshot().await;

    // The terminal belongs to the UI, so logs only ever go to a file
    let mut logging = puckchat_observability::LoggingConfig::from(&config.logging);
    if logging.file_path.is_none() {
        logging.file_path = puckchat_config::default_log_path();
    }
    let _log_manager = match logging.file_path {
        Some(_) => Some(puckchat_observability::LogManager::init(&logging)?),
        None => None,
    };

    let client = ConversationSessionClient::from_config(&config)?;
    let mut app = App::new(client).await?;
    tracing::info!(
        "Starting puckchat-tui against {} (session {:?})",
        config.api.base_url,
        app.client.session_id().map(|id| id.short().to_string())
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.check_connection().await;

    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    let mut last_tick = tokio::time::Instant::now();
    let tick_rate = tokio::time::Duration::from_millis(100);

    loop {
        app.sync_state();
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| tokio::time::Duration::from_secs(0));

        // Short poll so spawned operations get runtime time between frames
        if crossterm::event::poll(timeout.min(tokio::time::Duration::from_millis(20)))? {
            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key) {
                    return Ok(());
                }
            }
        }
        tokio::task::yield_now().await;

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = tokio::time::Instant::now();
        }
    }
}
