use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use super::app::{App, InputMode};
use crate::models::{Priority, Task};

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

fn task_row(t: &Task) -> Row<'static> {
    let date = t.effective_date().map(|d| d.format("%a %Y-%m-%d").to_string()).unwrap_or_default();
    let repeat = match (&t.recurrence_info, &t.recurrence_settings) {
        (Some(info), Some(settings)) => format!("#{} {}", info.sequence, settings.kind),
        (None, Some(settings)) => settings.kind.to_string(),
        _ => String::new(),
    };
    let (mark, text_style) = if t.completed {
        ("[x]", Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT))
    } else {
        ("[ ]", Style::default())
    };

    Row::new(vec![
        Cell::from(mark),
        Cell::from(t.id.clone()),
        Cell::from(t.text.clone()).style(text_style),
        Cell::from(t.priority.to_string()).style(Style::default().fg(priority_color(t.priority))),
        Cell::from(t.category.clone().unwrap_or_default()),
        Cell::from(date),
        Cell::from(repeat),
    ])
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Stats
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Status / help
        ])
        .split(f.area());

    let stats = Paragraph::new(Line::from(vec![
        Span::raw(format!("Total {}  ", app.stats.total)),
        Span::styled(format!("Completed {}  ", app.stats.completed), Style::default().fg(Color::Green)),
        Span::styled(format!("Pending {}  ", app.stats.pending), Style::default().fg(Color::Blue)),
        Span::styled(format!("Showing: {}", app.filter.label()), Style::default().fg(Color::Cyan)),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Tideline"));
    f.render_widget(stats, chunks[0]);

    let rows: Vec<Row> = app.tasks.iter().map(task_row).collect();
    let widths = [
        Constraint::Length(3),
        Constraint::Length(8),
        Constraint::Min(20),
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Length(16),
        Constraint::Length(12),
    ];
    let title = if app.tasks.is_empty() {
        "Tasks - none yet, press 'a' to add one".to_string()
    } else {
        format!("Tasks ({})", app.tasks.len())
    };
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["", "ID", "Task", "Priority", "Category", "Date", "Repeat"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, chunks[1], &mut app.state);

    let footer = match (&app.notice, app.input_mode) {
        (Some(notice), InputMode::Normal) => Paragraph::new(notice.message.as_str()).style(
            Style::default().fg(if notice.is_error { Color::Red } else { Color::Green }),
        ),
        _ => {
            let help_text = match app.input_mode {
                InputMode::Normal => "q: Quit | a: Add | Space: Done | e: Edit | p: Priority | d: Del | f: Filter | x: Clear Done",
                InputMode::Editing => "Enter: Save | Esc: Cancel",
                InputMode::Adding => "Enter: Next Step | Esc: Cancel",
            };
            Paragraph::new(help_text).style(Style::default().fg(Color::Gray))
        }
    };
    f.render_widget(footer.block(Block::default().borders(Borders::ALL)), chunks[2]);

    if app.input_mode != InputMode::Normal {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);
        let mut block = Block::default().borders(Borders::ALL).title(app.prompt());
        if let Some(notice) = app.notice.as_ref().filter(|n| n.is_error) {
            block = block.title_bottom(Line::from(notice.message.as_str()).style(Style::default().fg(Color::Red)));
        }
        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(block);
        f.render_widget(input, area);
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
