use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::ListItem,
};

use crate::source::{Event, Extrinsic};
use crate::status::FetchStatus;

// ============================================================================
// Helper Functions
// ============================================================================

pub fn truncate_hash(hash: &str) -> String {
    if hash.len() > 20 {
        format!("{}...{}", &hash[..10], &hash[hash.len() - 6..])
    } else {
        hash.to_string()
    }
}

/// Cut `text` to at most `width` characters, marking the cut with an ellipsis
pub fn truncate_text(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// `2024-05-01T12:30:00+00:00` -> `2024-05-01 12:30:00`
pub fn format_datetime(datetime: Option<&str>) -> String {
    match datetime {
        Some(dt) => dt.replacen('T', " ", 1).chars().take(19).collect(),
        None => "—".to_string(),
    }
}

pub fn format_status(status: Option<FetchStatus>) -> Span<'static> {
    match status {
        Some(FetchStatus::Loading) => {
            Span::styled(" loading… ", Style::default().fg(Color::Yellow))
        }
        Some(FetchStatus::Error) => Span::styled(" error ", Style::default().fg(Color::Red)),
        None => Span::raw(""),
    }
}

pub fn format_extrinsic_list_header<'a>() -> ListItem<'a> {
    let line = Line::from(vec![
        Span::styled(format!("{:<14}", "Extrinsic"), Style::default().fg(Color::DarkGray)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{:<28}", "Call"), Style::default().fg(Color::DarkGray)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{:^6}", "Signed"), Style::default().fg(Color::DarkGray)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{:<19}", "Time"), Style::default().fg(Color::DarkGray)),
    ]);

    ListItem::new(line).style(Style::default())
}

pub fn format_extrinsic_list_item<'a>(extrinsic: &Extrinsic, selected: bool) -> ListItem<'a> {
    let id = format!("{}-{}", extrinsic.block_number, extrinsic.extrinsic_idx);
    let call = truncate_text(
        &format!("{}.{}", extrinsic.call_module, extrinsic.call_name),
        28,
    );
    let signed = if extrinsic.is_signed() { "✓" } else { "" };

    let line = Line::from(vec![
        Span::styled(format!("{id:<14}"), Style::default().fg(Color::Cyan)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{call:<28}"), Style::default().fg(Color::White)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{signed:^6}"), Style::default().fg(Color::Green)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format_datetime(extrinsic.block_datetime.as_deref()),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let style = if selected {
        Style::default().bg(Color::Cyan).fg(Color::Black)
    } else {
        Style::default()
    };

    ListItem::new(line).style(style)
}

pub fn format_event_list_header<'a>() -> ListItem<'a> {
    let line = Line::from(vec![
        Span::styled(format!("{:<14}", "Event"), Style::default().fg(Color::DarkGray)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{:<28}", "Name"), Style::default().fg(Color::DarkGray)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{:<9}", "Extrinsic"), Style::default().fg(Color::DarkGray)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{:<19}", "Time"), Style::default().fg(Color::DarkGray)),
    ]);

    ListItem::new(line).style(Style::default())
}

pub fn format_event_list_item<'a>(event: &Event, selected: bool) -> ListItem<'a> {
    let id = format!("{}-{}", event.block_number, event.event_idx);
    let name = truncate_text(&format!("{}.{}", event.event_module, event.event_name), 28);
    let extrinsic = event
        .extrinsic_idx
        .map(|idx| idx.to_string())
        .unwrap_or_else(|| "—".to_string());

    let line = Line::from(vec![
        Span::styled(format!("{id:<14}"), Style::default().fg(Color::Cyan)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{name:<28}"), Style::default().fg(Color::White)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{extrinsic:<9}"), Style::default().fg(Color::Gray)),
        Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format_datetime(event.block_datetime.as_deref()),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let style = if selected {
        Style::default().bg(Color::Cyan).fg(Color::Black)
    } else {
        Style::default()
    };

    ListItem::new(line).style(style)
}

pub fn format_kv(key: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{key}: "), Style::default().fg(Color::DarkGray)),
        Span::styled(value.to_string(), Style::default().fg(Color::White)),
    ])
}

pub fn format_kv_link(key: &str, value: &str, selected: bool) -> Line<'static> {
    let style = if selected {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::UNDERLINED)
    };

    Line::from(vec![
        Span::styled(format!("{key}: "), Style::default().fg(Color::DarkGray)),
        Span::styled(value.to_string(), style),
    ])
}

pub fn centered_rect(percent_x: u16, area: Rect) -> Rect {
    let popup_layout = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(area);

    popup_layout[1]
}

pub fn padded_rect(area: Rect, padding: u16) -> Rect {
    Rect {
        x: area.x + padding,
        y: area.y + padding,
        width: area.width.saturating_sub(padding * 2),
        height: area.height.saturating_sub(padding * 2),
    }
}

/// First row to draw so that `selected` stays in view
pub fn scroll_start(selected: usize, visible: usize) -> usize {
    selected.saturating_sub(visible / 2)
}
