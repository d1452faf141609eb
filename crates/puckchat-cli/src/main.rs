use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use puckchat_client::{
    ChatBackend, ConversationSessionClient, HttpChatBackend, RatingRequest,
};
use puckchat_config::{Config, ConfigManager};
use puckchat_core::{parse_fragments, Fragment, Message, MessageId, Rating};
use puckchat_observability::{create_session_span, LogManager, LoggingConfig};
use puckchat_session::{JsonFileStore, SessionStore};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

#[derive(Parser)]
#[command(name = "puckchat")]
#[command(about = "Command line client for the puckchat hockey assistant")]
#[command(version)]
struct Cli {
    /// Override the backend base URL for this run
    #[arg(long)]
    api_url: Option<String>,

    /// Log debug output to stderr
    #[arg(long, short, default_value = "false")]
    debug: bool,

    /// Config file path
    #[arg(long, env = "PUCKCHAT_CONFIG", default_value = "~/.puckchat/config.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动交互式聊天
    Chat,
    /// 发送单条消息
    Send {
        /// 消息内容
        message: String,
    },
    /// 清空服务器端对话并轮换会话 ID
    Clear,
    /// 评价一条机器人回复
    Rate {
        /// 消息 ID
        message_id: String,
        /// 评价: up / down / none 或 1 / -1 / 0
        #[arg(allow_negative_numbers = true)]
        rating: Rating,
    },
    /// 检查后端状态
    Health,
    /// 本地会话管理
    Session(SessionArgs),
    /// 配置管理命令
    Config(ConfigArgs),
}

#[derive(Args, Clone)]
struct SessionArgs {
    #[command(subcommand)]
    command: SessionCommands,
}

#[derive(Subcommand, Clone)]
enum SessionCommands {
    /// 显示当前会话 ID
    Show,
    /// 仅在本地生成新的会话 ID
    Reset,
}

#[derive(Args, Clone)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// 获取配置值
    Get {
        /// 配置键 (如: api.base_url, logging.level)
        key: String,
    },
    /// 设置配置值
    Set {
        /// 配置键 (如: api.base_url, logging.level)
        key: String,
        /// 配置值
        value: String,
    },
    /// 初始化默认配置
    Init {
        /// 强制覆盖已有配置
        #[arg(long, default_value = "false")]
        force: bool,
    },
    /// 显示当前配置
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = puckchat_config::expand_tilde(&cli.config);

    if let Commands::Config(args) = &cli.command {
        return handle_config(args.clone(), config_path, cli.debug).await;
    }

    let manager = ConfigManager::load(&config_path).await?;
    let mut config = manager.snapshot().await;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.trim_end_matches('/').to_string();
    }

    let _log_manager = init_logging(&config, cli.debug)?;

    if cli.debug {
        eprintln!("{}", format!("[DEBUG] Config path: {:?}", config_path).dimmed());
        eprintln!("{}", format!("[DEBUG] API URL: {}", config.api.base_url).dimmed());
    }

    match cli.command {
        Commands::Chat => run_interactive_chat(&config).await,
        Commands::Send { message } => send_message(&config, &message).await,
        Commands::Clear => clear_conversation(&config).await,
        Commands::Rate { message_id, rating } => rate_message(&config, &message_id, rating).await,
        Commands::Health => check_health(&config).await,
        Commands::Session(args) => handle_session(args, &config).await,
        Commands::Config(_) => Ok(()),
    }
}

fn init_logging(config: &Config, debug: bool) -> anyhow::Result<Option<LogManager>> {
    let logging = if debug {
        LoggingConfig::default()
            .with_log_level("debug")
            .with_module_level("hyper", "warn")
    } else {
        match LoggingConfig::from(&config.logging) {
            // Without a log file the CLI stays quiet
            logging if logging.file_path.is_none() => return Ok(None),
            logging => logging,
        }
    };
    Ok(Some(LogManager::init(&logging)?))
}

fn session_store(config: &Config) -> SessionStore {
    SessionStore::new(Arc::new(JsonFileStore::new(&config.storage.path)))
}

/// Render bold and link fragments for the terminal
fn render(content: &str) -> String {
    parse_fragments(content)
        .into_iter()
        .map(|fragment| match fragment {
            Fragment::Text(text) => text,
            Fragment::Bold(text) => text.bold().to_string(),
            Fragment::Link { text, url } => {
                format!("{} ({})", text.underline().blue(), url.dimmed())
            }
        })
        .collect()
}

fn print_bot_message(message: &Message) {
    let id = message
        .id
        .as_ref()
        .map(|id| format!(" [#{}]", id))
        .unwrap_or_default();
    println!("{}{}", "🏒 Asistent:".green().bold(), id.dimmed());
    println!("{}", render(&message.content));
}

async fn send_message(config: &Config, message: &str) -> anyhow::Result<()> {
    let client = ConversationSessionClient::from_config(config)?;
    let session = client.initialize_session().await?;
    tracing::debug!("Sending one-shot message in session {}", session.short());

    println!("{}", format!("🚀 Sending message: {}", message).cyan());
    let start = Instant::now();
    match client.send_message(message).await {
        Ok(reply) => {
            print_bot_message(&reply);
            println!(
                "{}",
                format!("✅ Session {} ({:?})", session.short(), start.elapsed()).dimmed()
            );
            Ok(())
        }
        Err(e) => {
            let state = client.snapshot();
            if let Some(last) = state.messages.last() {
                println!("{}", last.content.yellow());
            }
            let shown = state.error.unwrap_or_else(|| e.to_string());
            println!("{}", format!("❌ {}", shown).red());
            Err(e.into())
        }
    }
}

async fn clear_conversation(config: &Config) -> anyhow::Result<()> {
    let client = ConversationSessionClient::from_config(config)?;
    let before = client.initialize_session().await?;

    match client.clear_conversation().await {
        Ok(after) => {
            println!("{}", "🧹 Conversation cleared".green());
            println!(
                "{}",
                format!("Session {} → {}", before.short(), after.short()).dimmed()
            );
            Ok(())
        }
        Err(e) => {
            let shown = client.snapshot().error.unwrap_or_else(|| e.to_string());
            println!("{}", format!("❌ {}", shown).red());
            Err(e.into())
        }
    }
}

/// Rating from the command line has no local history to toggle against,
/// so the value is sent exactly as given.
async fn rate_message(config: &Config, message_id: &str, rating: Rating) -> anyhow::Result<()> {
    let backend = HttpChatBackend::from_config(&config.api)?;
    let request = RatingRequest {
        message_id: MessageId::parse(message_id),
        rating,
    };

    match backend.rate_message(&request).await {
        Ok(reply) => {
            println!(
                "{}",
                format!("✅ Rated message {} with {}", request.message_id, rating).green()
            );
            if let Some(note) = reply.response_message.filter(|n| !n.is_empty()) {
                println!("   {}", note.dimmed());
            }
            Ok(())
        }
        Err(e) => {
            let shown = e.user_message(&config.widget.rate_failed_message);
            println!("{}", format!("❌ {}", shown).red());
            Err(e.into())
        }
    }
}

async fn check_health(config: &Config) -> anyhow::Result<()> {
    let backend = HttpChatBackend::from_config(&config.api)?;
    let start = Instant::now();
    let health = backend.health().await?;
    let elapsed = start.elapsed();

    let status = health.status.as_deref().unwrap_or("unknown");
    if health.is_healthy() {
        println!("{}", format!("● {} ({:?})", status, elapsed).green());
    } else {
        println!("{}", format!("✗ {} ({:?})", status, elapsed).red());
    }
    if let Some(version) = &health.version {
        println!("{}", format!("version: {}", version).dimmed());
    }
    if !health.extra.is_empty() {
        println!("{}", serde_json::to_string_pretty(&health.extra)?);
    }
    Ok(())
}

async fn handle_session(args: SessionArgs, config: &Config) -> anyhow::Result<()> {
    let store = session_store(config);
    match args.command {
        SessionCommands::Show => match store.session_id().await? {
            Some(id) => println!("{}", id),
            None => println!("{}", "No session yet; one is created on first send".dimmed()),
        },
        SessionCommands::Reset => {
            let id = store.rotate_session().await?;
            println!("{}", format!("✅ New session: {}", id).green());
        }
    }
    Ok(())
}

async fn run_interactive_chat(config: &Config) -> anyhow::Result<()> {
    let client = ConversationSessionClient::from_config(config)?;
    let session = client.initialize_session().await?;

    println!("{}", "🏒 Hokejový Chatbot".cyan().bold());
    println!("{}", format!("Session ID: {}", session).dimmed());
    println!(
        "{}",
        "Commands: /clear, /rate <id> <up|down>, /options, /health, exit".dimmed()
    );
    println!();

    client.open_chat();
    for message in client.snapshot().messages {
        print_bot_message(&message);
    }
    println!();

    let span = create_session_span(session.short());
    chat_loop(&client).instrument(span).await
}

async fn chat_loop(client: &ConversationSessionClient) -> anyhow::Result<()> {
    loop {
        print!("{} ", "Vy:".cyan().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("{}", "👋 Na shledanou!".cyan());
            break;
        }
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            run_chat_command(client, command).await;
        } else {
            match client.send_message(input).await {
                Ok(reply) => print_bot_message(&reply),
                Err(e) => {
                    tracing::debug!("Send failed: {}", e);
                    if let Some(last) = client.snapshot().messages.last() {
                        println!("{}", last.content.yellow());
                    }
                }
            }
        }

        if let Some(error) = client.snapshot().error {
            println!("{}", format!("❌ {}", error).red());
            client.dismiss_error();
        }
        println!();
    }

    Ok(())
}

async fn run_chat_command(client: &ConversationSessionClient, command: &str) {
    let parts: Vec<&str> = command.split_whitespace().collect();
    match parts.as_slice() {
        ["clear"] => {
            if let Ok(after) = client.clear_conversation().await {
                println!("{}", format!("🧹 Cleared, session {}", after.short()).green());
                client.ensure_welcome();
                if let Some(welcome) = client.snapshot().messages.first() {
                    print_bot_message(welcome);
                }
            }
        }
        ["rate", id, value] => match value.parse::<Rating>() {
            Ok(requested) => match client.rate_message(&MessageId::parse(id), requested).await {
                Ok(now) => println!("{}", format!("Rating of #{} is now {}", id, now).green()),
                Err(e) => println!("{}", format!("❌ {}", e).red()),
            },
            Err(e) => println!("{}", format!("❌ {}", e).red()),
        },
        ["options"] => {
            for (idx, option) in client.quick_options().iter().enumerate() {
                println!("{}", format!("  /ask {}  {}", idx + 1, option.label).dimmed());
            }
        }
        ["ask", n] => match n.parse::<usize>() {
            Ok(n) if n >= 1 => match client.send_quick_option(n - 1).await {
                Ok(reply) => print_bot_message(&reply),
                Err(e) => println!("{}", format!("❌ {}", e).red()),
            },
            _ => println!("{}", "Usage: /ask <number>".yellow()),
        },
        ["health"] => match client.health().await {
            Ok(health) => println!(
                "{}",
                format!("● {}", health.status.as_deref().unwrap_or("unknown")).green()
            ),
            Err(e) => println!("{}", format!("❌ {}", e).red()),
        },
        _ => println!("{}", format!("Unknown command: /{}", command).yellow()),
    }
}

async fn handle_config(args: ConfigArgs, config_path: PathBuf, debug: bool) -> anyhow::Result<()> {
    if debug {
        eprintln!("{}", format!("[DEBUG] Config path: {:?}", config_path).dimmed());
    }

    match args.command {
        ConfigCommands::Get { key } => {
            let manager = ConfigManager::load(&config_path).await?;
            let config = manager.snapshot().await;

            match config.get_value(&key) {
                Some(value) => {
                    println!("{}", format!("{} = {}", key, value).green());
                }
                None => {
                    println!("{}", format!("❌ Key not found: {}", key).red());
                    std::process::exit(1);
                }
            }
        }
        ConfigCommands::Set { key, value } => {
            let manager = ConfigManager::load(&config_path).await?;
            if let Err(e) = manager.update(|config| config.set_value(&key, &value)).await {
                eprintln!("{}", format!("❌ Failed to set value: {}", e).red());
                std::process::exit(1);
            }
            println!("{}", format!("✅ Set {} = {}", key, value).green());
        }
        ConfigCommands::Init { force } => {
            if config_path.exists() && !force {
                println!("{}", format!("⚠️  Config already exists at {:?}", config_path).yellow());
                println!("{}", "Use --force to overwrite".dimmed());
                return Ok(());
            }

            // 初始化目录
            puckchat_config::init_puckchat_dirs().await?;

            // 创建默认配置
            let manager = ConfigManager::new(Config::default(), config_path.clone());
            manager.save().await?;

            println!("{}", format!("✅ Config initialized at {:?}", config_path).green());
            println!("{}", "You can edit this file to customize your settings".dimmed());
        }
        ConfigCommands::Show => {
            let manager = ConfigManager::load(&config_path).await?;
            let config = manager.snapshot().await;

            println!("{}", "📋 Current Configuration:".cyan().bold());
            println!();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
