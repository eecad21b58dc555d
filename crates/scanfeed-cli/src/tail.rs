//! One-shot printing of a single feed page.

use std::collections::BTreeSet;
use std::io;
use std::io::Write;

use chrono::DateTime;
use chrono::Utc;
use crossterm::style::style;
use crossterm::style::Color;
use crossterm::style::Stylize;
use scanfeed_core::aggregate::ranked_keyword_counts;
use scanfeed_core::highlight::Highlighter;
use scanfeed_core::state::derive_view;
use scanfeed_core::FeedSnapshot;
use scanfeed_core::FeedView;
use scanfeed_core::TimeWindow;
use scanfeed_core::ViewPreferences;
use serde_json::json;
use serde_json::Value;

use crate::render::channel_label;
use crate::render::message_prefix;
use crate::render::message_text;

#[derive(Debug, Clone, Default)]
pub struct TailOptions {
    pub page: usize,
    pub per_page: Option<usize>,
    pub search: Option<String>,
    pub keywords: Vec<String>,
    pub channels: Vec<String>,
    pub window: Option<TimeWindow>,
}

impl TailOptions {
    /// Stored preferences with the command-line overrides applied.
    pub fn apply(&self, mut prefs: ViewPreferences, snapshot: &FeedSnapshot) -> ViewPreferences {
        if let Some(window) = self.window {
            prefs.time_window = window;
        }
        if let Some(size) = self.per_page {
            prefs.records_per_page = size;
        }
        if let Some(search) = &self.search {
            prefs.query = search.clone();
        }
        if !self.keywords.is_empty() {
            prefs.active_keywords = self.keywords.iter().cloned().collect::<BTreeSet<_>>();
        }
        if !self.channels.is_empty() {
            prefs.channel_visibility = snapshot
                .channels
                .keys()
                .map(|id| (id.clone(), self.channels.contains(id)))
                .collect();
        }
        prefs.current_page = self.page;
        prefs.sanitized()
    }
}

pub fn view_json(
    view: &FeedView<'_>,
    snapshot: &FeedSnapshot,
    prefs: &ViewPreferences,
    now: DateTime<Utc>,
) -> Value {
    let messages: Vec<Value> = view
        .newest_first()
        .map(|message| {
            json!({
                "id": message.id,
                "channel": message.channel,
                "label": channel_label(message, snapshot, &prefs.fields),
                "time": message.time,
                "shown_time": crate::render::time_column(message, snapshot, now),
                "text": message.text,
                "status": message.status.as_str(),
                "url": message.url,
            })
        })
        .collect();
    let keyword_counts: Vec<Value> = ranked_keyword_counts(&view.keyword_counts)
        .into_iter()
        .map(|(keyword, count)| json!({ "keyword": keyword, "count": count }))
        .collect();
    json!({
        "window": prefs.time_window.label(),
        "page": view.summary.page,
        "total_pages": view.summary.total_pages,
        "total": view.summary.total,
        "summary": view.summary.to_string(),
        "channel_counts": view.channel_counts,
        "keyword_counts": keyword_counts,
        "messages": messages,
    })
}

/// Highlighted runs as terminal text. Keyword runs are bold and underlined,
/// search runs sit on a yellow background.
pub fn styled_text(highlighter: &Highlighter, text: &str, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    highlighter
        .highlight(text)
        .into_iter()
        .map(|run| {
            if run.marks.is_plain() {
                return run.text.to_string();
            }
            let mut styled = style(run.text);
            if run.marks.keyword {
                styled = styled.bold().underlined();
            }
            if run.marks.search {
                styled = styled.on(Color::Yellow).with(Color::Black);
            }
            styled.to_string()
        })
        .collect()
}

pub fn write_text(
    out: &mut impl Write,
    view: &FeedView<'_>,
    snapshot: &FeedSnapshot,
    prefs: &ViewPreferences,
    now: DateTime<Utc>,
    color: bool,
) -> io::Result<()> {
    let search = (!prefs.query.is_empty()).then_some(prefs.query.as_str());
    let highlighter = Highlighter::new(&snapshot.keywords, search);

    if view.page.is_empty() {
        writeln!(out, "no messages")?;
    }
    for message in view.newest_first() {
        let prefix = message_prefix(message, snapshot, &prefs.fields, now);
        let text = styled_text(&highlighter, message_text(message), color);
        match (prefix.is_empty(), color) {
            (true, _) => writeln!(out, "{text}")?,
            (false, true) => writeln!(out, "{} {text}", style(prefix).dark_grey())?,
            (false, false) => writeln!(out, "{prefix} {text}")?,
        }
    }
    writeln!(
        out,
        "{} | page {}/{} | {}",
        view.summary,
        view.summary.page,
        view.summary.total_pages.max(1),
        prefs.time_window
    )
}

pub fn print(
    snapshot: &FeedSnapshot,
    prefs: &ViewPreferences,
    now: DateTime<Utc>,
    as_json: bool,
    color: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let view = derive_view(snapshot, prefs, &BTreeSet::new(), now);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if as_json {
        serde_json::to_writer_pretty(&mut out, &view_json(&view, snapshot, prefs, now))?;
        writeln!(out)?;
    } else {
        write_text(&mut out, &view, snapshot, prefs, now, color)?;
    }
    Ok(())
}
