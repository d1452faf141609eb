use chrono::Local;
use puckchat_core::{parse_fragments, Fragment, Message, Rating};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, ConnectionStatus};

const TYPING_FRAMES: [&str; 3] = ["●○○", "○●○", "○○●"];

pub fn draw(f: &mut Frame, app: &App) {
    if app.state.is_open {
        draw_chat(f, app);
    } else {
        draw_bubble(f, f.size());
    }
}

/// Closed widget: only the launcher bubble in the bottom right corner
fn draw_bubble(f: &mut Frame, area: Rect) {
    let width = 30.min(area.width);
    let height = 3.min(area.height);
    let bubble = Rect {
        x: area.x + area.width - width,
        y: area.y + area.height - height,
        width,
        height,
    };

    let text = Line::from(vec![
        Span::styled("💬 ", Style::default()),
        Span::styled(
            "Ctrl+O",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" otevřít chat"),
    ]);
    let widget = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        );
    f.render_widget(widget, bubble);
}

fn draw_chat(f: &mut Frame, app: &App) {
    let area = f.size();
    let input_rows = app.input_rows(area.width.saturating_sub(4));
    let quick_rows = if app.quick_options_collapsed {
        1
    } else {
        1 + app.client.quick_options().len() as u16
    };
    let error_rows = if app.state.error.is_some() { 1 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(3),              // Header
            Constraint::Min(5),                 // Messages
            Constraint::Length(error_rows),     // Error banner
            Constraint::Length(quick_rows),     // Quick options
            Constraint::Length(input_rows + 2), // Input
            Constraint::Length(1),              // Status bar
        ])
        .split(area);

    draw_header(f, app, chunks[0]);
    draw_messages(f, app, chunks[1]);
    if let Some(error) = &app.state.error {
        draw_error(f, error, chunks[2]);
    }
    draw_quick_options(f, app, chunks[3]);
    draw_input(f, app, chunks[4]);
    draw_status_bar(f, app, chunks[5]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let status_color = match app.status {
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Disconnected => Color::Red,
        ConnectionStatus::Checking => Color::Yellow,
    };

    let mut spans = vec![
        Span::styled(" 🏒 ", Style::default()),
        Span::styled(
            "Hokejový Chatbot",
            Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan),
        ),
        Span::styled("  |  ", Style::default().fg(Color::Gray)),
        Span::styled(app.status.to_string(), Style::default().fg(status_color)),
    ];
    if let Some(session) = app.client.session_id() {
        spans.push(Span::styled("  |  ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(
            format!("session {}", session.short()),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Left);

    f.render_widget(header, area);
}

fn draw_messages(f: &mut Frame, app: &App, area: Rect) {
    let inner_width = area.width.saturating_sub(2).max(1);
    let mut lines: Vec<Line> = Vec::new();
    let mut selected_start = None;

    for (idx, message) in app.state.messages.iter().enumerate() {
        let selected = app.selected == Some(idx);
        if selected {
            selected_start = Some(wrapped_height(&lines, inner_width));
        }
        lines.extend(format_message(message, selected));
    }

    if app.state.is_loading() {
        let frame = TYPING_FRAMES[(app.tick / 3) % TYPING_FRAMES.len()];
        lines.push(Line::from(vec![
            Span::styled("🏒 ", Style::default().fg(Color::Green)),
            Span::styled(frame, Style::default().fg(Color::Green)),
        ]));
    }

    // Stick to the newest message unless a selected one would scroll out of view
    let visible = area.height.saturating_sub(2);
    let total = wrapped_height(&lines, inner_width);
    let mut offset = total.saturating_sub(visible);
    if let Some(start) = selected_start {
        offset = offset.min(start);
    }

    let messages = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));

    f.render_widget(messages, area);
}

fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn format_message(msg: &Message, selected: bool) -> Vec<Line<'static>> {
    let (prefix, style) = if msg.is_user {
        ("👤 ", Style::default().fg(Color::Cyan))
    } else {
        ("🏒 ", Style::default().fg(Color::Green))
    };

    let mut lines = content_lines(&msg.content, style);
    if let Some(first) = lines.first_mut() {
        first.spans.insert(0, Span::styled(prefix, style));
    }

    let timestamp = msg.timestamp.with_timezone(&Local).format("%H:%M").to_string();
    let mut footer = vec![Span::styled(
        format!("   └─ {} ", timestamp),
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )];
    if msg.is_rateable() {
        footer.push(rating_span(msg.current_rating(), Rating::Positive));
        footer.push(Span::raw(" "));
        footer.push(rating_span(msg.current_rating(), Rating::Negative));
    }
    if selected {
        footer.push(Span::styled(
            "  ◀ Ctrl+U / Ctrl+D",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::REVERSED),
        ));
    }
    lines.push(Line::from(footer));
    lines.push(Line::from(""));
    lines
}

fn rating_span(current: Rating, button: Rating) -> Span<'static> {
    let style = if current == button {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(button.to_string(), style)
}

/// Split message content into styled lines, honouring `**bold**` and `[links](url)`
fn content_lines(content: &str, base: Style) -> Vec<Line<'static>> {
    let mut lines = vec![Vec::new()];

    for fragment in parse_fragments(content) {
        let (text, style) = match fragment {
            Fragment::Text(text) => (text, base),
            Fragment::Bold(text) => (text, base.add_modifier(Modifier::BOLD)),
            Fragment::Link { text, url } => (
                format!("{} ({})", text, url),
                Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            ),
        };

        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                lines.push(Vec::new());
            }
            if !part.is_empty() {
                if let Some(current) = lines.last_mut() {
                    current.push(Span::styled(part.to_string(), style));
                }
            }
        }
    }

    lines.into_iter().map(Line::from).collect()
}

fn draw_error(f: &mut Frame, error: &str, area: Rect) {
    let banner = Paragraph::new(Line::from(vec![
        Span::styled(" ⚠ ", Style::default().fg(Color::White)),
        Span::raw(error.to_string()),
        Span::styled("  [Esc]", Style::default().add_modifier(Modifier::DIM)),
    ]))
    .style(Style::default().fg(Color::White).bg(Color::Red));
    f.render_widget(banner, area);
}

fn draw_quick_options(f: &mut Frame, app: &App, area: Rect) {
    let arrow = if app.quick_options_collapsed { "▲" } else { "▼" };
    let mut lines = vec![Line::from(vec![
        Span::styled(" Časté dotazy ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("[Ctrl+K {}]", arrow),
            Style::default().fg(Color::DarkGray),
        ),
    ])];

    if !app.quick_options_collapsed {
        for (idx, option) in app.client.quick_options().iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  [F{}] ", idx + 1),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(option.label.clone()),
            ]));
        }
    }

    f.render_widget(Paragraph::new(lines), area);
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let loading = app.state.is_loading();
    let (title, border) = if loading {
        ("Čekám na odpověď...", Color::Yellow)
    } else {
        ("Zpráva", Color::Blue)
    };

    let text: Vec<Line> = if app.input.is_empty() {
        vec![Line::from(Span::styled(
            "Napište zprávu a stiskněte Enter...",
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        ))]
    } else {
        app.input
            .split('\n')
            .map(|line| Line::from(line.to_string()))
            .collect()
    };

    let inner_width = area.width.saturating_sub(2).max(1);
    let total = wrapped_height(&text, inner_width);
    let visible = area.height.saturating_sub(2);

    let input = Paragraph::new(text)
        .style(if loading {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(border)),
        )
        .wrap(Wrap { trim: false })
        .scroll((total.saturating_sub(visible), 0));

    f.render_widget(input, area);

    if !loading {
        let last = app.input.rsplit('\n').next().unwrap_or("");
        let col = u16::try_from(last.width()).unwrap_or(u16::MAX) % inner_width;
        let row = total.min(visible).saturating_sub(1);
        f.set_cursor(area.x + 1 + col, area.y + 1 + row);
    }
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = if app.selected.is_some() {
        "[Ctrl+U] 👍  [Ctrl+D] 👎  [↑/↓] Select  [Esc] Back"
    } else {
        "[Enter] Send  [Alt+Enter] Newline  [Ctrl+L] Clear  [↑] Rate  [Ctrl+O] Close  [Ctrl+C] Quit"
    };

    let status = format!(" Messages: {} | {}", app.state.messages.len(), help_text);
    let status_bar = Paragraph::new(status)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::REVERSED));

    f.render_widget(status_bar, area);
}
