//! UI rendering helpers for the terminal user interface.
//!
//! This module renders the meditation view using `ratatui`. It only reads
//! the `App` model; every state change goes through the audio engine.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock};

use crate::app::App;
use crate::audio::format_time;
use crate::catalog::display_from_fields;
use crate::config::UiSettings;

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "up/down");
    map.insert("enter", "play selected track");
    map.insert("space/p", "play/pause");
    map.insert("h/l", "prev/next track");
    map.insert("m", "mute");
    map.insert("q", "quit");
    map
});

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Render the controls help text.
fn controls_text() -> String {
    let order = ["j/k", "enter", "space/p", "h/l", "m", "q"];
    order
        .iter()
        .filter_map(|k| CONTROLS_MAP.get(k).map(|v| format!("[{}] {}", k, v)))
        .collect::<Vec<String>>()
        .join(" | ")
}

/// A pulse travelling back and forth across `width` cells.
fn indeterminate_bar(width: u16, frame: usize) -> String {
    let width = width as usize;
    let pulse = 6.min(width);
    if width == 0 {
        return String::new();
    }
    let span = width - pulse;
    let pos = if span == 0 {
        0
    } else {
        let cycle = frame % (span * 2);
        if cycle > span { span * 2 - cycle } else { cycle }
    };
    let mut bar = String::with_capacity(width * 3);
    for i in 0..width {
        bar.push(if i >= pos && i < pos + pulse { '█' } else { '░' });
    }
    bar
}

fn now_playing_lines(app: &App) -> Vec<Line<'static>> {
    let session = &app.session;
    let Some(track) = app.current_track() else {
        return vec![Line::from("Select a track to begin.").italic()];
    };

    let mut title = vec![Span::from(track.title.clone()).bold()];
    if session.on_fallback {
        title.push(Span::from(" (Calming Tone)").italic());
    }

    let mut status = Vec::new();
    if session.is_loading() {
        status.push(Span::from(format!(
            "{} ",
            SPINNER[app.frame % SPINNER.len()]
        )));
    }
    status.push(Span::from(app.status_label()));
    if session.muted {
        status.push(Span::from(" • muted"));
    }
    if let Some(err) = session.last_error {
        status.push(Span::from(format!(" • {}", err.label())).italic());
    }

    vec![
        Line::from(title),
        Line::from(format!("{} • {}", track.category, track.display_duration)),
        Line::from(status),
    ]
}

fn draw_progress(frame: &mut Frame, app: &App, area: Rect) {
    let session = &app.session;
    if session.on_fallback {
        let bar = if session.is_playing() {
            indeterminate_bar(area.width, app.frame)
        } else {
            String::new()
        };
        frame.render_widget(Paragraph::new(bar), area);
        return;
    }

    let ratio = (session.progress_percentage() / 100.0).clamp(0.0, 1.0);
    let label = format!(
        "{} / {}",
        format_time(session.elapsed_seconds),
        format_time(session.duration_seconds)
    );
    let gauge = Gauge::default()
        .ratio(ratio)
        .label(label)
        .gauge_style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(gauge, area);
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(frame: &mut Frame, app: &App, ui_settings: &UiSettings) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Length(4),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" stillpoint ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Now playing
    let np_block = Block::bordered()
        .padding(Padding {
            left: 1,
            right: 1,
            top: 0,
            bottom: 0,
        })
        .title(" now playing ");
    let np_inner = np_block.inner(chunks[1]);
    frame.render_widget(np_block, chunks[1]);

    let np_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1)])
        .split(np_inner);
    frame.render_widget(Paragraph::new(now_playing_lines(app)), np_rows[0]);
    if app.current_track().is_some() {
        draw_progress(frame, app, np_rows[1]);
    }

    // Quote
    let quote = Paragraph::new(app.current_quote().unwrap_or_default())
        .italic()
        .alignment(Alignment::Center)
        .block(Block::bordered())
        .wrap(Wrap { trim: true });
    frame.render_widget(quote, chunks[2]);

    // Playlist
    let current = app
        .current_track()
        .map(|_| app.session.current_track_index);
    let items: Vec<ListItem> = app
        .catalog
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let text = display_from_fields(
                track,
                &ui_settings.track_fields,
                &ui_settings.track_separator,
            );
            if Some(i) == current {
                ListItem::new(format!("♪ {}", text)).bold()
            } else {
                ListItem::new(format!("  {}", text))
            }
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" tracks "))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if app.has_tracks() {
        state.select(Some(app.selected));
    }
    frame.render_stateful_widget(list, chunks[3], &mut state);

    let footer = Paragraph::new(controls_text())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[4]);
}
