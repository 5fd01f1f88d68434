use super::helper::*;
use super::{draw_filter_bar, list_footer};

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::source::ChainSource;
use crate::status::FetchStatus;
use crate::views::{ExtrinsicDetailView, ExtrinsicListView};

pub fn draw_extrinsic_list<S: ChainSource>(
    frame: &mut Frame,
    app: &App<S>,
    view: &ExtrinsicListView<S>,
    area: Rect,
) {
    let chunks = Layout::vertical([
        Constraint::Length(3), // Filters
        Constraint::Min(0),    // List
        Constraint::Length(1), // Footer
    ])
    .split(area);

    draw_filter_bar(frame, app, chunks[0], view.choices_status());

    let mut title = vec![Span::raw(format!(" Extrinsics ({}) ", view.items().len()))];
    if view.subscription_status() == Some(FetchStatus::Error) {
        title.push(Span::styled(" live updates off ", Style::default().fg(Color::Red)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(title));

    let visible_count = chunks[1].height.saturating_sub(3) as usize; // -2 borders, -1 header
    let start = scroll_start(app.selected_index, visible_count);

    let mut items: Vec<ListItem> = vec![format_extrinsic_list_header()];
    items.extend(
        view.items()
            .iter()
            .enumerate()
            .skip(start)
            .take(visible_count)
            .map(|(i, extrinsic)| format_extrinsic_list_item(extrinsic, i == app.selected_index)),
    );
    frame.render_widget(List::new(items).block(block), chunks[1]);

    let footer = list_footer(view.fetch_status(), view.has_more(), view.items().len());
    frame.render_widget(Paragraph::new(footer), chunks[2]);
}

pub fn draw_extrinsic_detail<S: ChainSource>(
    frame: &mut Frame,
    app: &App<S>,
    view: &ExtrinsicDetailView<S>,
    area: Rect,
) {
    let title = match view.key() {
        Some(key) => format!(" 🧾 Extrinsic {key} "),
        None => " 🧾 Extrinsic ".to_string(),
    };

    let chunks = Layout::vertical([
        Constraint::Length(11), // Info
        Constraint::Length(6),  // Call arguments
        Constraint::Min(0),     // Events
    ])
    .split(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let lines = match (view.extrinsic_status(), view.extrinsic().value()) {
        (Some(FetchStatus::Loading), _) => vec![Line::from("Loading extrinsic…").fg(Color::Yellow)],
        (Some(FetchStatus::Error), _) | (None, None) => {
            vec![Line::from("Extrinsic not found").fg(Color::Red)]
        }
        (None, Some(extrinsic)) => {
            let mut lines = vec![
                format_kv("Block", &extrinsic.block_number.to_string()),
                format_kv("Index", &extrinsic.extrinsic_idx.to_string()),
                format_kv("Hash", extrinsic.hash.as_deref().unwrap_or("—")),
                format_kv("Pallet", &extrinsic.call_module),
                format_kv("Call", &extrinsic.call_name),
                format_kv("Signed", if extrinsic.is_signed() { "yes" } else { "no" }),
            ];
            if let Some(account) = &extrinsic.multi_address_account_id {
                lines.push(format_kv("Account", account));
            }
            lines.push(format_kv(
                "Time",
                &format_datetime(extrinsic.block_datetime.as_deref()),
            ));
            if let Some(spec) = extrinsic.spec_version {
                lines.push(format_kv("Spec Version", &spec.to_string()));
            }
            lines
        }
    };
    frame.render_widget(Paragraph::new(lines).block(block), chunks[0]);

    let args_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Call Arguments ");
    let args = Paragraph::new(view.call_arguments())
        .block(args_block)
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: false });
    frame.render_widget(args, chunks[1]);

    let events = view.events().value().map(Vec::as_slice).unwrap_or(&[]);
    let events_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Line::from(vec![
            Span::raw(format!(" Events ({}) ", events.len())),
            format_status(view.events_status()),
        ]));

    if events.is_empty() {
        let message = match view.events_status() {
            Some(FetchStatus::Loading) => "Loading events…",
            Some(FetchStatus::Error) => "Failed to load events",
            None => "No events",
        };
        let empty = Paragraph::new(message)
            .block(events_block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, chunks[2]);
        return;
    }

    let visible_count = chunks[2].height.saturating_sub(3) as usize;
    let start = scroll_start(app.selected_index, visible_count);
    let mut items: Vec<ListItem> = vec![format_event_list_header()];
    items.extend(
        events
            .iter()
            .enumerate()
            .skip(start)
            .take(visible_count)
            .map(|(i, event)| format_event_list_item(event, i == app.selected_index)),
    );
    frame.render_widget(List::new(items).block(events_block), chunks[2]);
}
