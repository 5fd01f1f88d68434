mod event_page;
mod extrinsic_page;
mod helper;

use event_page::{draw_event_detail, draw_event_list};
use extrinsic_page::{draw_extrinsic_detail, draw_extrinsic_list};
use helper::*;

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, Focus, Route, Screen};
use crate::filters::FilterField;
use crate::source::ChainSource;
use crate::status::FetchStatus;

const LIST_HELP: &str =
    "↑↓ navigate • Enter open • m more • p/c/a filter • [] pallet • {} call • x clear • n network • Tab page • Esc quit";
const DETAIL_HELP: &str = "↑↓ navigate • Enter open • b back • n network • Esc quit";
const EDIT_HELP: &str = "Enter apply • Esc cancel";

pub fn draw<S: ChainSource>(frame: &mut Frame, app: &App<S>) {
    let area = padded_rect(frame.area(), 1);

    let chunks = Layout::vertical([
        Constraint::Length(1), // Header
        Constraint::Min(0),    // Page
        Constraint::Length(1), // Help
    ])
    .split(area);

    draw_header(frame, app, chunks[0]);

    if !app.has_network() {
        draw_no_network(frame, chunks[1]);
    } else {
        match &app.screen {
            Screen::ExtrinsicList(view) => draw_extrinsic_list(frame, app, view, chunks[1]),
            Screen::EventList(view) => draw_event_list(frame, app, view, chunks[1]),
            Screen::ExtrinsicDetail(view) => draw_extrinsic_detail(frame, app, view, chunks[1]),
            Screen::EventDetail(view) => draw_event_detail(frame, view, chunks[1]),
        }
    }

    let help_text = if app.is_editing() {
        EDIT_HELP
    } else if matches!(app.route, Route::Extrinsics | Route::Events) {
        LIST_HELP
    } else {
        DETAIL_HELP
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, chunks[2]);
}

fn draw_header<S: ChainSource>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let tab = |label: &'static str, active: bool| {
        if active {
            Span::styled(format!(" {label} "), Style::default().fg(Color::Black).bg(Color::Cyan))
        } else {
            Span::styled(format!(" {label} "), Style::default().fg(Color::Gray))
        }
    };
    let on_events = matches!(app.route, Route::Events | Route::Event(_));

    let network = match app.properties() {
        Some(props) if !props.token_symbol.is_empty() => {
            format!("{} ({})", props.name, props.token_symbol)
        }
        Some(props) => props.name,
        None => "none".to_string(),
    };

    let line = Line::from(vec![
        Span::styled("subex", Style::default().fg(Color::Cyan).bold()),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled("Network: ", Style::default().fg(Color::DarkGray)),
        Span::styled(network, Style::default().fg(Color::Green)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        tab("Extrinsics", !on_events),
        tab("Events", on_events),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_no_network(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" ⚡ No Network Configured ");

    let lines = vec![
        Line::from("Add a [[networks]] entry with a name and api_url to the config file:"),
        Line::from(""),
        Line::from("  ~/.config/subex/config.toml").fg(Color::Cyan),
    ];
    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, centered_rect(80, area));
}

/// Filter fields of a list page, with the field being edited shown as an input
fn draw_filter_bar<S: ChainSource>(
    frame: &mut Frame,
    app: &App<S>,
    area: Rect,
    choices_status: Option<FetchStatus>,
) {
    let mut title = vec![Span::raw(" Filters ")];
    if choices_status.is_some() {
        title.push(Span::styled("choices", Style::default().fg(Color::DarkGray)));
        title.push(format_status(choices_status));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.is_editing() {
            Color::Yellow
        } else {
            Color::DarkGray
        }))
        .title(Line::from(title));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Focus::Filter(field) = app.focus {
        let label = format!("{}: ", field.label());
        let label_width = label.len() as u16;
        let width = inner.width.saturating_sub(label_width) as usize;
        let scroll = app.filter_input.visual_scroll(width);

        let line = Line::from(vec![
            Span::styled(label, Style::default().fg(Color::Yellow)),
            Span::styled(
                app.filter_input.value().to_string(),
                Style::default().fg(Color::White),
            ),
        ]);
        frame.render_widget(Paragraph::new(line).scroll((0, scroll as u16)), inner);

        let cursor_x = inner.x
            + label_width
            + (app.filter_input.visual_cursor().saturating_sub(scroll)) as u16;
        if cursor_x < inner.x + inner.width {
            frame.set_cursor_position((cursor_x, inner.y));
        }
        return;
    }

    let mut spans = Vec::new();
    for field in app.filter_fields() {
        let value = app.filter_value(field);
        spans.push(Span::styled(
            format!("{}: ", field.label()),
            Style::default().fg(Color::DarkGray),
        ));
        let display = if value.is_empty() {
            Span::styled("any", Style::default().fg(Color::DarkGray).italic())
        } else if field == FilterField::Address {
            Span::styled(truncate_hash(&value), Style::default().fg(Color::Cyan))
        } else {
            Span::styled(value, Style::default().fg(Color::Cyan))
        };
        spans.push(display);
        spans.push(Span::raw("   "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}

/// Footer line of a list: pagination state
fn list_footer(status: Option<FetchStatus>, has_more: bool, count: usize) -> Line<'static> {
    match status {
        Some(FetchStatus::Loading) => Line::from("Loading…").fg(Color::Yellow),
        Some(FetchStatus::Error) if has_more => {
            Line::from("Failed to load more. Press m to retry").fg(Color::Red)
        }
        Some(FetchStatus::Error) => Line::from("Failed to load").fg(Color::Red),
        None if count == 0 => Line::from("No items match these filters").fg(Color::DarkGray),
        None if has_more => Line::from("Press m for more").fg(Color::DarkGray),
        None => Line::from("End of list").fg(Color::DarkGray),
    }
}
