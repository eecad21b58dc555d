use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};

use scanfeed_core::highlight::{HighlightRun, Highlighter};
use scanfeed_core::state::sidebar_keywords;
use scanfeed_core::{
    reduce, CacheStore, DisplayField, FeedAction, FeedEffect, FeedState, FeedView, Focus,
    LoadStatus, Notice, NoticeLevel, SyncAction, UserAction, ViewPreferences,
};
use scanfeed_sync::worker;
use scanfeed_sync::{DataSync, FeedBackend, SyncCommand};

use crate::render::{message_prefix, message_text};

const SIDEBAR_WIDTH: u16 = 34;
const POLL_INPUT: Duration = Duration::from_millis(100);

#[derive(Clone, Copy)]
struct UiPalette {
    accent: Color,
    success: Color,
    warning: Color,
    danger: Color,
    muted: Color,
    border: Color,
    selected_bg: Color,
    search_bg: Color,
}

const PALETTE: UiPalette = UiPalette {
    accent: Color::Cyan,
    success: Color::Green,
    warning: Color::Yellow,
    danger: Color::Red,
    muted: Color::DarkGray,
    border: Color::Gray,
    selected_bg: Color::Rgb(18, 28, 42),
    search_bg: Color::Yellow,
};

struct TuiGuard;

impl Drop for TuiGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

/// Runs the sync worker on its own thread and the dashboard on this one
/// until the user quits.
pub fn run<B: FeedBackend + 'static>(
    sync: DataSync<B>,
    cache: CacheStore,
    prefs: ViewPreferences,
    poll_interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let sync = Arc::new(sync);
    // Detached: an in-flight request is abandoned when the process exits.
    thread::Builder::new()
        .name("scanfeed-sync".to_string())
        .spawn(move || {
            match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => {
                    runtime.block_on(worker::run(sync, poll_interval, command_rx, event_tx))
                }
                Err(err) => error!(error = %err, "sync runtime failed to start"),
            }
        })?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, crossterm::cursor::Hide)?;
    let guard = TuiGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut state = FeedState::new(prefs, Utc::now().trunc_subsecs(0));
    info!("dashboard started");

    let result = run_app(&mut terminal, &mut state, &cache, &command_tx, event_rx);
    drop(guard);

    let _ = command_tx.send(SyncCommand::Shutdown);
    state.prefs.save(&cache);
    cache.flush();
    info!("dashboard closed");
    result.map_err(Into::into)
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    state: &mut FeedState,
    cache: &CacheStore,
    commands: &UnboundedSender<SyncCommand>,
    mut events: UnboundedReceiver<SyncAction>,
) -> io::Result<()> {
    let mut dirty = true;
    loop {
        let mut effects = reduce(
            state,
            FeedAction::Sync(SyncAction::ClockTick(Utc::now().trunc_subsecs(0))),
        );
        while let Ok(action) = events.try_recv() {
            effects.extend(reduce(state, FeedAction::Sync(action)));
        }
        dirty |= apply_effects(state, cache, commands, effects);

        if dirty {
            terminal.draw(|f| ui(f, state))?;
            dirty = false;
        }

        if !event::poll(POLL_INPUT)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match map_key(state, key) {
                KeyOutcome::Quit => return Ok(()),
                KeyOutcome::Action(action) => {
                    let effects = reduce(state, FeedAction::User(action));
                    dirty |= apply_effects(state, cache, commands, effects);
                }
                KeyOutcome::Ignored => {}
            },
            Event::Resize(_, _) => dirty = true,
            _ => {}
        }
    }
}

/// Carries out reducer effects; true when a redraw is due.
fn apply_effects(
    state: &mut FeedState,
    cache: &CacheStore,
    commands: &UnboundedSender<SyncCommand>,
    effects: Vec<FeedEffect>,
) -> bool {
    let mut redraw = false;
    for effect in effects {
        match effect {
            FeedEffect::RequestFrame => redraw = true,
            FeedEffect::PersistPreferences => state.prefs.save(cache),
            FeedEffect::Refresh => send(commands, SyncCommand::RefreshNow),
            FeedEffect::DeleteMessage(id) => send(commands, SyncCommand::Delete(id)),
            FeedEffect::CopyToClipboard(text) => {
                let copied = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text));
                state.notice = Some(match copied {
                    Ok(()) => Notice::new(NoticeLevel::Info, "copied to clipboard"),
                    Err(err) => {
                        warn!(error = %err, "clipboard unavailable");
                        Notice::new(NoticeLevel::Warning, format!("copy failed: {err}"))
                    }
                });
                redraw = true;
            }
        }
    }
    redraw
}

fn send(commands: &UnboundedSender<SyncCommand>, command: SyncCommand) {
    if commands.send(command).is_err() {
        warn!("sync worker is gone, command dropped");
    }
}

#[derive(Debug, PartialEq)]
enum KeyOutcome {
    Quit,
    Action(UserAction),
    Ignored,
}

fn map_key(state: &FeedState, key: KeyEvent) -> KeyOutcome {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }
    if state.interaction.editing_query {
        return match key.code {
            KeyCode::Esc | KeyCode::Enter => KeyOutcome::Action(UserAction::EndQueryEdit),
            KeyCode::Backspace => KeyOutcome::Action(UserAction::QueryBackspace),
            KeyCode::Char(c) => KeyOutcome::Action(UserAction::QueryInput(c)),
            _ => KeyOutcome::Ignored,
        };
    }

    let action = match key.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Char('/') => UserAction::BeginQueryEdit,
        KeyCode::Char('x') => UserAction::SetQuery(String::new()),
        KeyCode::Tab => UserAction::FocusNext,
        KeyCode::Up | KeyCode::Char('k') => UserAction::CursorUp,
        KeyCode::Down | KeyCode::Char('j') => UserAction::CursorDown,
        KeyCode::Enter | KeyCode::Char(' ') => UserAction::ActivateSelection,
        KeyCode::Left | KeyCode::Char('n') => UserAction::NewerPage,
        KeyCode::Right | KeyCode::Char('o') => UserAction::OlderPage,
        KeyCode::Char('w') => UserAction::CycleTimeWindow,
        KeyCode::Char('p') => UserAction::CycleRecordsPerPage,
        KeyCode::Char(digit @ '1'..='4') => {
            let index = digit as usize - '1' as usize;
            UserAction::ToggleField(DisplayField::ALL[index])
        }
        KeyCode::Char('d') | KeyCode::Delete if state.interaction.focus == Focus::Messages => {
            UserAction::DeleteSelected
        }
        KeyCode::Char('y') => UserAction::CopySelected,
        KeyCode::Char('r') => UserAction::RefreshNow,
        KeyCode::Esc => UserAction::DismissNotice,
        _ => return KeyOutcome::Ignored,
    };
    KeyOutcome::Action(action)
}

fn spinner(state: &FeedState) -> &'static str {
    let frames = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
    let index = state.now.timestamp().rem_euclid(frames.len() as i64) as usize;
    frames[index]
}

fn ui(f: &mut ratatui::Frame, state: &FeedState) {
    let view = state.view();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Top bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Footer
        ])
        .split(f.area());

    render_top_bar(f, chunks[0], state);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(chunks[1]);
    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(content[0]);

    render_channels(f, sidebar[0], state, &view);
    render_keywords(f, sidebar[1], state, &view);
    render_messages(f, content[1], state, &view);
    render_footer(f, chunks[2], state, &view);
}

fn render_top_bar(f: &mut ratatui::Frame, area: Rect, state: &FeedState) {
    let palette = PALETTE;
    let status = match &state.load {
        LoadStatus::Loading => Span::styled(
            format!("{} loading", spinner(state)),
            Style::default().fg(palette.warning),
        ),
        LoadStatus::Ready => Span::styled("live", Style::default().fg(palette.success)),
        LoadStatus::Failed(_) => Span::styled("offline", Style::default().fg(palette.danger)),
    };

    let mut spans = vec![
        Span::styled(
            "scanfeed ",
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
        status,
        Span::styled(" | ", Style::default().fg(palette.muted)),
        Span::raw(state.prefs.time_window.label()),
        Span::styled(" | search ", Style::default().fg(palette.muted)),
    ];
    let query_style = if state.interaction.editing_query {
        Style::default().fg(palette.accent)
    } else {
        Style::default()
    };
    let mut query = format!("/{}", state.prefs.query);
    if state.interaction.editing_query {
        query.push('▏');
    }
    spans.push(Span::styled(query, query_style));

    if state.new_since_last_refresh > 0 {
        spans.push(Span::styled(" | ", Style::default().fg(palette.muted)));
        spans.push(Span::styled(
            format!("{} new", state.new_since_last_refresh),
            Style::default()
                .fg(palette.success)
                .add_modifier(Modifier::BOLD),
        ));
    }
    if let Some(notice) = &state.notice {
        let color = match notice.level {
            NoticeLevel::Info => palette.accent,
            NoticeLevel::Warning => palette.warning,
            NoticeLevel::Error => palette.danger,
        };
        spans.push(Span::styled(" | ", Style::default().fg(palette.muted)));
        spans.push(Span::styled(notice.message.clone(), Style::default().fg(color)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border));
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn panel(title: String, focused: bool) -> Block<'static> {
    let border = if focused { PALETTE.accent } else { PALETTE.border };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title)
}

fn checkbox(on: bool) -> &'static str {
    if on {
        "[x] "
    } else {
        "[ ] "
    }
}

fn render_channels(f: &mut ratatui::Frame, area: Rect, state: &FeedState, view: &FeedView<'_>) {
    let palette = PALETTE;
    let items: Vec<ListItem> = state
        .channel_order()
        .into_iter()
        .map(|channel| {
            let active = state.is_channel_active(&channel.id);
            let count = view.channel_counts.get(&channel.id).copied().unwrap_or(0);
            let dot = if channel.status.is_recording() {
                Span::styled("● ", Style::default().fg(palette.danger))
            } else {
                Span::styled("○ ", Style::default().fg(palette.muted))
            };
            let name_style = if active {
                Style::default()
            } else {
                Style::default().fg(palette.muted)
            };
            ListItem::new(Line::from(vec![
                Span::raw(checkbox(active)),
                dot,
                Span::styled(channel.label(&state.prefs.fields), name_style),
                Span::styled(format!(" {count}"), Style::default().fg(palette.accent)),
            ]))
        })
        .collect();

    let focused = state.interaction.focus == Focus::Channels;
    render_list(f, area, items, panel("Channels".to_string(), focused), focused, state.interaction.channel_cursor);
}

fn render_keywords(f: &mut ratatui::Frame, area: Rect, state: &FeedState, view: &FeedView<'_>) {
    let palette = PALETTE;
    let items: Vec<ListItem> = sidebar_keywords(&state.snapshot.keywords, &view.keyword_counts)
        .into_iter()
        .map(|(keyword, count)| {
            let active = state.prefs.active_keywords.contains(&keyword);
            ListItem::new(Line::from(vec![
                Span::raw(checkbox(active)),
                Span::raw(keyword),
                Span::styled(format!(" {count}"), Style::default().fg(palette.accent)),
            ]))
        })
        .collect();

    let focused = state.interaction.focus == Focus::Keywords;
    render_list(f, area, items, panel("Keywords".to_string(), focused), focused, state.interaction.keyword_cursor);
}

fn render_list(
    f: &mut ratatui::Frame,
    area: Rect,
    items: Vec<ListItem<'_>>,
    block: Block<'_>,
    focused: bool,
    cursor: usize,
) {
    let empty = items.is_empty();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(PALETTE.selected_bg));
    let mut list_state = ListState::default();
    if focused && !empty {
        list_state.select(Some(cursor));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn highlighted_spans(runs: Vec<HighlightRun<'_>>) -> Vec<Span<'static>> {
    runs.into_iter()
        .map(|run| {
            let mut style = Style::default();
            if run.marks.keyword {
                style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            }
            if run.marks.search {
                style = style.bg(PALETTE.search_bg).fg(Color::Black);
            }
            Span::styled(run.text.to_string(), style)
        })
        .collect()
}

fn render_messages(f: &mut ratatui::Frame, area: Rect, state: &FeedState, view: &FeedView<'_>) {
    let palette = PALETTE;
    let focused = state.interaction.focus == Focus::Messages;
    let block = panel(format!("Messages ({})", view.summary.total), focused);

    if view.page.is_empty() {
        let text = match &state.load {
            LoadStatus::Failed(reason) => format!("failed to load feed: {reason}"),
            LoadStatus::Loading if state.snapshot.is_empty() => "loading feed...".to_string(),
            _ => "no messages match the current filters".to_string(),
        };
        let p = Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(p, area);
        return;
    }

    let search = (!state.prefs.query.is_empty()).then_some(state.prefs.query.as_str());
    let highlighter = Highlighter::new(&state.snapshot.keywords, search);
    let items: Vec<ListItem> = view
        .newest_first()
        .map(|message| {
            let prefix = message_prefix(message, &state.snapshot, &state.prefs.fields, state.now);
            let mut spans = Vec::new();
            if !prefix.is_empty() {
                spans.push(Span::styled(format!("{prefix} "), Style::default().fg(palette.muted)));
            }
            spans.extend(highlighted_spans(highlighter.highlight(message_text(message))));
            ListItem::new(Line::from(spans))
        })
        .collect();

    render_list(f, area, items, block, focused, state.interaction.message_cursor);
}

fn render_footer(f: &mut ratatui::Frame, area: Rect, state: &FeedState, view: &FeedView<'_>) {
    let palette = PALETTE;
    let summary = view.summary;
    let line = Line::from(vec![
        Span::raw(summary.to_string()),
        Span::styled(" | page ", Style::default().fg(palette.muted)),
        Span::raw(format!("{}/{}", summary.page, summary.total_pages.max(1))),
        Span::styled(" | per page ", Style::default().fg(palette.muted)),
        Span::raw(state.prefs.records_per_page.to_string()),
        Span::styled(
            " | ←/n newer →/o older  w window  p size  / search  1-4 fields  d delete  y copy  r refresh  q quit",
            Style::default().fg(palette.muted),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}
