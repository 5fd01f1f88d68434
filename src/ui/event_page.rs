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
use crate::views::{EventDetailView, EventListView};

pub fn draw_event_list<S: ChainSource>(
    frame: &mut Frame,
    app: &App<S>,
    view: &EventListView<S>,
    area: Rect,
) {
    let chunks = Layout::vertical([
        Constraint::Length(3), // Filters
        Constraint::Min(0),    // List
        Constraint::Length(1), // Footer
    ])
    .split(area);

    draw_filter_bar(frame, app, chunks[0], view.choices_status());

    let mut title = vec![Span::raw(format!(" Events ({}) ", view.items().len()))];
    if view.subscription_status() == Some(FetchStatus::Error) {
        title.push(Span::styled(" live updates off ", Style::default().fg(Color::Red)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(title));

    let visible_count = chunks[1].height.saturating_sub(3) as usize;
    let start = scroll_start(app.selected_index, visible_count);

    let mut items: Vec<ListItem> = vec![format_event_list_header()];
    items.extend(
        view.items()
            .iter()
            .enumerate()
            .skip(start)
            .take(visible_count)
            .map(|(i, event)| format_event_list_item(event, i == app.selected_index)),
    );
    frame.render_widget(List::new(items).block(block), chunks[1]);

    let footer = list_footer(view.fetch_status(), view.has_more(), view.items().len());
    frame.render_widget(Paragraph::new(footer), chunks[2]);
}

pub fn draw_event_detail<S: ChainSource>(
    frame: &mut Frame,
    view: &EventDetailView<S>,
    area: Rect,
) {
    let title = match view.key() {
        Some(key) => format!(" ⚡ Event {key} "),
        None => " ⚡ Event ".to_string(),
    };

    let chunks = Layout::vertical([
        Constraint::Length(9), // Info
        Constraint::Min(0),    // Attributes
    ])
    .split(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let lines = match (view.event_status(), view.event().value()) {
        (Some(FetchStatus::Loading), _) => vec![Line::from("Loading event…").fg(Color::Yellow)],
        (Some(FetchStatus::Error), _) | (None, None) => {
            vec![Line::from("Event not found").fg(Color::Red)]
        }
        (None, Some(event)) => {
            let mut lines = vec![
                format_kv("Block", &event.block_number.to_string()),
                format_kv("Index", &event.event_idx.to_string()),
                format_kv("Pallet", &event.event_module),
                format_kv("Event", &event.event_name),
            ];
            match event.extrinsic_idx {
                Some(idx) => lines.push(format_kv_link(
                    "Extrinsic",
                    &format!("{}-{idx}", event.block_number),
                    true,
                )),
                None => lines.push(format_kv("Extrinsic", "—")),
            }
            lines.push(format_kv(
                "Time",
                &format_datetime(event.block_datetime.as_deref()),
            ));
            if let Some(spec) = event.spec_version {
                lines.push(format_kv("Spec Version", &spec.to_string()));
            }
            lines
        }
    };
    frame.render_widget(Paragraph::new(lines).block(block), chunks[0]);

    let attributes_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Attributes ");
    let attributes = Paragraph::new(view.attributes())
        .block(attributes_block)
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: false });
    frame.render_widget(attributes, chunks[1]);
}
