//! Process table with per-cell coloring, keyboard scrolling and a scrollbar.

use crossterm::event::{KeyCode, KeyEvent};
use proctop_agent::ProcessSnapshot;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::ui::util::{format_elapsed, load_color, truncate_middle};

const SB_TRACK: Color = Color::Rgb(170, 170, 180);
const SB_THUMB: Color = Color::Rgb(170, 170, 180);

const COLS: [Constraint; 6] = [
    Constraint::Length(7),  // PID
    Constraint::Length(10), // USER
    Constraint::Length(6),  // CPU%
    Constraint::Length(9),  // RAM[MB]
    Constraint::Length(9),  // TIME+
    Constraint::Min(10),    // COMMAND
];

/// Rows visible below the header inside the bordered pane.
pub fn viewport_rows(area: Rect) -> usize {
    area.height.saturating_sub(3) as usize
}

pub fn processes_clamp(offset: &mut usize, total_rows: usize, viewport: usize) {
    let max_off = total_rows.saturating_sub(viewport);
    if *offset > max_off {
        *offset = max_off;
    }
}

/// Up/Down/PageUp/PageDown/Home/End. End overshoots; callers clamp.
pub fn processes_handle_key(offset: &mut usize, key: KeyEvent, page_size: usize) {
    let page = page_size.max(1);
    match key.code {
        KeyCode::Up => *offset = offset.saturating_sub(1),
        KeyCode::Down => *offset = offset.saturating_add(1),
        KeyCode::PageUp => *offset = offset.saturating_sub(page),
        KeyCode::PageDown => *offset = offset.saturating_add(page),
        KeyCode::Home => *offset = 0,
        KeyCode::End => *offset = usize::MAX,
        _ => {}
    }
}

fn row<'a>(p: &ProcessSnapshot, cmd_width: usize) -> Row<'a> {
    let cpu = (p.cpu_utilization * 100.0).clamp(0.0, 100.0);
    Row::new(vec![
        Cell::from(p.pid.to_string()).style(Style::default().fg(Color::DarkGray)),
        Cell::from(truncate_middle(&p.user, 10)),
        Cell::from(format!("{cpu:>5.1}")).style(Style::default().fg(load_color(cpu))),
        Cell::from(p.ram()),
        Cell::from(format_elapsed(p.uptime_secs)),
        Cell::from(truncate_middle(&p.command, cmd_width)),
    ])
}

pub fn draw_processes(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    procs: &[&ProcessSnapshot],
    scroll_offset: usize,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Processes ({} tracked)", procs.len()));
    f.render_widget(block, area);

    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    if inner.height < 2 || inner.width < 3 {
        return;
    }
    // two columns reserved for the scrollbar
    let content = Rect {
        width: inner.width.saturating_sub(2),
        ..inner
    };

    let total_rows = procs.len();
    let viewport = viewport_rows(area);
    let mut offset = scroll_offset;
    processes_clamp(&mut offset, total_rows, viewport);

    let fixed: u16 = 7 + 10 + 6 + 9 + 9 + 5;
    let cmd_width = content.width.saturating_sub(fixed).max(10) as usize;
    let rows = procs
        .iter()
        .skip(offset)
        .take(viewport)
        .map(|p| row(p, cmd_width));

    let header = Row::new(vec!["PID", "USER", "CPU%", "RAM[MB]", "TIME+", "COMMAND"]).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    let table = Table::new(rows, COLS).header(header).column_spacing(1);
    f.render_widget(table, content);

    let bar = Rect {
        x: inner.x + inner.width.saturating_sub(1),
        y: inner.y,
        width: 1,
        height: inner.height,
    };
    f.render_widget(Paragraph::new(scrollbar(bar.height as usize, total_rows, viewport, offset)), bar);
}

fn scrollbar(track: usize, total: usize, viewport: usize, offset: usize) -> Vec<Line<'static>> {
    let total = total.max(1);
    let view = viewport.clamp(1, total);
    let max_off = total.saturating_sub(view);
    let thumb_len = (track * view).div_ceil(total).clamp(1, track.max(1));
    let thumb_top = if max_off == 0 {
        0
    } else {
        (track.saturating_sub(thumb_len) * offset + max_off / 2) / max_off
    };
    (0..track)
        .map(|i| {
            if i >= thumb_top && i < thumb_top + thumb_len {
                Line::from(Span::styled("█", Style::default().fg(SB_THUMB)))
            } else {
                Line::from(Span::styled("│", Style::default().fg(SB_TRACK)))
            }
        })
        .collect()
}
