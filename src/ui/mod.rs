mod theme;

use crate::app::AppModel;
use crate::domain::{CommandOutcome, ListLayout, MenuItem, MenuState, OutcomeKind, two_column_rows};
use ratatui::prelude::*;
use ratatui::widgets::*;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

const LIVE_MARKER: &str = " ●";

pub fn render(frame: &mut Frame, model: &AppModel) {
    let full_area = frame.area();
    if full_area.width == 0 || full_area.height == 0 {
        return;
    }

    render_menu_bar(frame, full_area, model);

    let content_area = if full_area.height > 1 {
        Rect {
            x: full_area.x,
            y: full_area.y.saturating_add(1),
            width: full_area.width,
            height: full_area.height.saturating_sub(1),
        }
    } else {
        full_area
    };
    let area = inner_area(content_area);

    let input_height = if model.state == MenuState::SetupProject {
        3
    } else {
        0
    };
    let outcome_height = model
        .outcome
        .as_ref()
        .map(|outcome| outcome_height(outcome, area.height))
        .unwrap_or(0);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(input_height),
            Constraint::Min(3),
            Constraint::Length(outcome_height),
            Constraint::Length(1),
        ])
        .split(area);

    if model.state == MenuState::SetupProject {
        render_name_input(frame, chunks[0], model);
    }

    let items = model.items();
    match model.layout() {
        ListLayout::Flat => render_flat_menu(frame, chunks[1], model, &items),
        ListLayout::TwoColumn => render_two_column_menu(frame, chunks[1], model, &items),
    }

    if let Some(outcome) = &model.outcome {
        render_outcome(frame, chunks[2], outcome);
    }

    frame.render_widget(footer_line(model), chunks[3]);
}

fn render_menu_bar(frame: &mut Frame, area: Rect, model: &AppModel) {
    let bar_area = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: 1,
    };

    let base_style = Style::default().fg(theme::FG).bg(theme::BAR_BG);
    let hint_style = Style::default().fg(theme::MUTED).bg(theme::BAR_BG);
    let title_style = Style::default()
        .fg(theme::ACCENT)
        .bg(theme::BAR_BG)
        .add_modifier(Modifier::BOLD);

    let title = " commandy ";
    let mut host = format!(" {}", model.config.host.name);
    if model.config.host.inside_tmux {
        host.push_str(" (tmux)");
    }

    let used_width = UnicodeWidthStr::width(title) + UnicodeWidthStr::width(host.as_str());
    let remaining = (bar_area.width as usize).saturating_sub(used_width);

    let spans = vec![
        Span::styled(title.to_string(), title_style),
        Span::styled(host, hint_style),
        Span::styled(" ".repeat(remaining), base_style),
    ];

    frame.render_widget(Paragraph::new(Line::from(spans)).style(base_style), bar_area);
}

fn render_name_input(frame: &mut Frame, area: Rect, model: &AppModel) {
    let value = model.name_input.value();
    let text = if value.is_empty() {
        Text::from(Line::from(Span::styled(
            "my-project",
            Style::default().fg(theme::DIM),
        )))
    } else {
        Text::from(value)
    };
    let input = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .padding(Padding::horizontal(1))
            .title("Enter new project name"),
    );
    frame.render_widget(input, area);

    let prefix: String = value.chars().take(model.name_input.cursor_col()).collect();
    let cursor_x = area
        .x
        .saturating_add(2)
        .saturating_add(UnicodeWidthStr::width(prefix.as_str()) as u16);
    if cursor_x < area.x.saturating_add(area.width.saturating_sub(1)) {
        frame.set_cursor_position((cursor_x, area.y.saturating_add(1)));
    }
}

fn menu_block(model: &AppModel) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .padding(Padding::horizontal(1))
        .title(model.title())
}

fn highlight_style() -> Style {
    Style::default()
        .fg(theme::ACCENT)
        .add_modifier(Modifier::BOLD)
}

fn render_flat_menu(frame: &mut Frame, area: Rect, model: &AppModel, items: &[MenuItem]) {
    let block = menu_block(model);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut list_area = inner;
    if model.state == MenuState::Sessions && model.active_sessions.is_empty() {
        let empty = Paragraph::new("No active tmux sessions").style(Style::default().fg(theme::DIM));
        frame.render_widget(empty, Rect { height: 1, ..inner });
        list_area = Rect {
            y: inner.y.saturating_add(2),
            height: inner.height.saturating_sub(2),
            ..inner
        };
    }

    let max_width = (list_area.width as usize).saturating_sub(6);
    let list_items = items
        .iter()
        .enumerate()
        .map(|(index, item)| menu_list_item(index, item, max_width))
        .collect::<Vec<_>>();

    let list = List::new(list_items)
        .highlight_style(highlight_style())
        .highlight_symbol("▸ ");
    let mut state = ListState::default();
    if !items.is_empty() {
        state.select(Some(model.cursor.min(items.len() - 1)));
    }
    frame.render_stateful_widget(list, list_area, &mut state);
}

fn render_two_column_menu(frame: &mut Frame, area: Rect, model: &AppModel, items: &[MenuItem]) {
    let block = menu_block(model);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let rows = two_column_rows(items.len());
    let (left, right) = items.split_at(rows.min(items.len()));

    for (column, (area, column_items)) in [(columns[0], left), (columns[1], right)]
        .into_iter()
        .enumerate()
    {
        let offset = column * rows;
        let max_width = (area.width as usize).saturating_sub(8);
        let list_items = column_items
            .iter()
            .enumerate()
            .map(|(row, item)| menu_list_item(offset + row, item, max_width))
            .collect::<Vec<_>>();

        let list = List::new(list_items)
            .highlight_style(highlight_style())
            .highlight_symbol("▸ ");
        let mut state = ListState::default();
        if model.cursor >= offset && model.cursor < offset + column_items.len() {
            state.select(Some(model.cursor - offset));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }
}

fn menu_list_item(index: usize, item: &MenuItem, max_width: usize) -> ListItem<'static> {
    let marker_width = if item.live {
        UnicodeWidthStr::width(LIVE_MARKER)
    } else {
        0
    };
    let label = truncate_end(&item.label, max_width.saturating_sub(marker_width));

    let mut spans = vec![
        Span::styled(format!("{:>2}) ", index + 1), Style::default().fg(theme::DIM)),
        Span::raw(label),
    ];
    if item.live {
        spans.push(Span::styled(
            LIVE_MARKER.to_string(),
            Style::default().fg(theme::SUCCESS),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn outcome_style(kind: OutcomeKind) -> Style {
    match kind {
        OutcomeKind::Success => Style::default().fg(theme::SUCCESS),
        OutcomeKind::Error => Style::default().fg(theme::ERROR),
        OutcomeKind::Info => Style::default().fg(theme::INFO),
    }
}

fn outcome_height(outcome: &CommandOutcome, available: u16) -> u16 {
    let lines = u16::try_from(outcome.text.lines().count().max(1)).unwrap_or(u16::MAX);
    let cap = (available / 2).max(3);
    lines.saturating_add(2).min(cap)
}

/// Long command output keeps its tail, where results and errors usually end.
fn render_outcome(frame: &mut Frame, area: Rect, outcome: &CommandOutcome) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines = outcome.text.lines().collect::<Vec<_>>();
    let skip = lines.len().saturating_sub(visible);
    let text = lines[skip..].join("\n");

    let title = match outcome.kind {
        OutcomeKind::Success => "Result",
        OutcomeKind::Error => "Error",
        OutcomeKind::Info => "Info",
    };
    let panel = Paragraph::new(text).style(outcome_style(outcome.kind)).block(
        Block::default()
            .borders(Borders::ALL)
            .padding(Padding::horizontal(1))
            .title(title),
    );
    frame.render_widget(panel, area);
}

fn footer_line(model: &AppModel) -> Paragraph<'static> {
    let keys = match model.state {
        MenuState::SetupProject => "Keys: type name  ↑/↓=move  Enter=select  Esc=cancel",
        MenuState::BrowseProjects | MenuState::SelectProject => {
            "Keys: ←/→=columns  ↑/↓=move  Enter=select  1-9=pick  q/Esc=back"
        }
        MenuState::Main => "Keys: ↑/↓=move  Enter=select  1-9=pick  q=quit",
        _ => "Keys: ↑/↓=move  Enter=select  1-9=pick  q/Esc=back",
    };

    let mut spans: Vec<Span<'static>> = vec![Span::raw(keys.to_string())];
    if !model.jobs_in_flight.is_empty() {
        let running = model
            .jobs_in_flight
            .values()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        spans.push(Span::raw("  ·  "));
        spans.push(Span::styled(
            format!("● {running}"),
            Style::default()
                .fg(theme::SUCCESS)
                .add_modifier(Modifier::BOLD),
        ));
    }

    Paragraph::new(Line::from(spans)).style(Style::default().fg(theme::DIM))
}

fn truncate_end(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let ellipsis = "…";
    let available = max_width.saturating_sub(UnicodeWidthStr::width(ellipsis));
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + width > available {
            break;
        }
        used += width;
        out.push(ch);
    }
    out.push_str(ellipsis);
    out
}

fn inner_area(area: Rect) -> Rect {
    if area.width < 40 || area.height < 12 {
        return area;
    }
    area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    })
}
