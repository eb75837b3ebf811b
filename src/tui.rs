#![cfg(feature = "tui")]

use crate::client::CompletionClient;
use crate::conversation::{Role, Turn};
use crate::session::{ChatSession, Preset};
use anyhow::Context;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const HELP: &str =
    "Commands: /clear, /system <text>, /system, /preset general|engineering, /quit  Keys: F2 clear, F5/F6 presets";

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Everything `draw` needs. Built from the session, or from a snapshot
/// while a request holds the session.
struct View<'a> {
    title: &'a str,
    turns: &'a [Turn],
    status: &'a str,
    system: &'a str,
    notice: Option<&'a str>,
    input: &'a str,
    working: Option<usize>,
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    None,
    Quit,
    Submit(String),
}

pub async fn run_tui(client: &CompletionClient, system: Option<String>) -> anyhow::Result<()> {
    let mut session = ChatSession::new(client);
    session.set_system_message(system);
    let title = format!("azchat — {}", client.describe());

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel::<Event>();
    std::thread::spawn(move || {
        while let Ok(ev) = crossterm::event::read() {
            if ev_tx.send(ev).is_err() {
                break;
            }
        }
    });

    let mut input = String::new();
    let mut notice: Option<String> = Some(HELP.to_string());
    let mut ticker = tokio::time::interval(Duration::from_millis(50));

    let res: anyhow::Result<()> = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = session.status_line();
                let view = View {
                    title: &title,
                    turns: session.history(),
                    status: &status,
                    system: session.system_message(),
                    notice: notice.as_deref(),
                    input: &input,
                    working: None,
                };
                if let Err(e) = draw(&mut terminal, &view) {
                    break Err(e);
                }
            }
            Some(ev) = ev_rx.recv() => {
                let Event::Key(key) = ev else { continue };
                match handle_key(key, &mut input, &mut session, &mut notice) {
                    Action::Quit => break Ok(()),
                    Action::Submit(prompt) => {
                        if let Err(e) = submit_with_spinner(&mut terminal, &title, &mut session, &prompt).await {
                            break Err(e);
                        }
                        // Keystrokes typed while waiting are dropped.
                        while ev_rx.try_recv().is_ok() {}
                    }
                    Action::None => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

/// Await one reply, redrawing the working indicator until it arrives.
async fn submit_with_spinner(
    terminal: &mut Term,
    title: &str,
    session: &mut ChatSession<'_>,
    prompt: &str,
) -> anyhow::Result<()> {
    let mut shown = session.history().to_vec();
    shown.push(Turn::new(Role::User, prompt));
    let status = session.status_line();
    let system = session.system_message().to_string();

    let pending = session.submit(prompt);
    tokio::pin!(pending);

    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let mut frame = 0usize;
    loop {
        tokio::select! {
            _ = &mut pending => return Ok(()),
            _ = ticker.tick() => {
                let view = View {
                    title,
                    turns: &shown,
                    status: &status,
                    system: &system,
                    notice: None,
                    input: "",
                    working: Some(frame),
                };
                draw(terminal, &view)?;
                frame = frame.wrapping_add(1);
            }
        }
    }
}

fn handle_key(
    key: KeyEvent,
    input: &mut String,
    session: &mut ChatSession<'_>,
    notice: &mut Option<String>,
) -> Action {
    if key.kind == KeyEventKind::Release {
        return Action::None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Esc => return Action::Quit,
        KeyCode::F(2) => {
            session.clear();
            *notice = Some("chat cleared".to_string());
        }
        KeyCode::F(5) => {
            session.apply_preset(Preset::General);
            *notice = Some("preset: general".to_string());
        }
        KeyCode::F(6) => {
            session.apply_preset(Preset::Engineering);
            *notice = Some("preset: engineering".to_string());
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.push(c),
        KeyCode::Backspace => {
            input.pop();
        }
        KeyCode::Enter => {
            let msg = input.trim().to_string();
            input.clear();
            if msg.is_empty() {
                return Action::None;
            }
            return run_command(&msg, session, notice);
        }
        _ => {}
    }

    Action::None
}

/// Slash commands act locally; anything else is a prompt.
fn run_command(msg: &str, session: &mut ChatSession<'_>, notice: &mut Option<String>) -> Action {
    if !msg.starts_with('/') {
        *notice = None;
        return Action::Submit(msg.to_string());
    }

    let (cmd, rest) = msg.split_once(' ').unwrap_or((msg, ""));
    let rest = rest.trim();
    *notice = Some(match cmd {
        "/quit" => return Action::Quit,
        "/clear" => {
            session.clear();
            "chat cleared".to_string()
        }
        "/system" if rest.is_empty() => {
            session.set_system_message(None);
            "system message reset to default".to_string()
        }
        "/system" => {
            session.set_system_message(Some(rest.to_string()));
            "system message updated".to_string()
        }
        "/preset" => match Preset::parse(rest) {
            Some(p) => {
                session.apply_preset(p);
                format!("preset: {rest}")
            }
            None => format!("unknown preset: {rest}"),
        },
        "/help" => HELP.to_string(),
        other => format!("unknown command: {other}"),
    });
    Action::None
}

fn role_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan),
        Role::Assistant => Style::default().add_modifier(Modifier::BOLD).fg(Color::Green),
        Role::System => Style::default().add_modifier(Modifier::DIM),
    }
}

fn transcript(turns: &[Turn]) -> Text<'static> {
    let mut text = Text::default();
    for t in turns {
        text.lines.push(Line::styled(format!("{}: ", t.role), role_style(t.role)));
        text.lines.extend(Text::from(t.content.clone()).lines);
        text.lines.push(Line::from(""));
    }
    text
}

/// Rows `text` occupies when wrapped at `width` columns.
fn wrapped_height(text: &Text<'_>, width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = text
        .lines
        .iter()
        .map(|l| l.width().max(1).div_ceil(width))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn status_text(view: &View<'_>) -> String {
    let mut s = view.status.to_string();
    if let Some(frame) = view.working {
        s.push_str(&format!("  {} working…", SPINNER[frame % SPINNER.len()]));
    }
    let system: String = view.system.chars().take(40).collect();
    s.push_str(&format!("  | system: {system}"));
    if view.system.chars().count() > 40 {
        s.push('…');
    }
    if let Some(n) = view.notice {
        s.push_str(&format!("  | {n}"));
    }
    s
}

fn draw(terminal: &mut Term, view: &View<'_>) -> anyhow::Result<()> {
    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1), Constraint::Length(3)])
            .split(f.area());

        let text = if view.turns.is_empty() {
            Text::from("No messages yet. What's on your mind?")
        } else {
            transcript(view.turns)
        };
        let inner = chunks[0].height.saturating_sub(2);
        let scroll = wrapped_height(&text, chunks[0].width.saturating_sub(2)).saturating_sub(inner);

        let chat = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(view.title))
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0));

        let status = Paragraph::new(status_text(view)).style(Style::default().add_modifier(Modifier::REVERSED));

        let input_title = if view.working.is_some() { "waiting for reply" } else { "input" };
        let input_w = Paragraph::new(view.input.to_string())
            .block(Block::default().borders(Borders::ALL).title(input_title));

        f.render_widget(chat, chunks[0]);
        f.render_widget(status, chunks[1]);
        f.render_widget(input_w, chunks[2]);

        if view.working.is_none() {
            f.set_cursor_position(cursor_position(chunks[2], view.input));
        }
    })?;
    Ok(())
}

/// Cursor after the typed text, clamped inside the input box border.
fn cursor_position(area: Rect, input: &str) -> (u16, u16) {
    let typed = u16::try_from(input.chars().count()).unwrap_or(u16::MAX);
    let x = area.x.saturating_add(1).saturating_add(typed);
    let right = area.x.saturating_add(area.width.saturating_sub(2));
    (x.min(right), area.y.saturating_add(1))
}
