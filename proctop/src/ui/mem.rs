//! Memory gauge.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Gauge},
};

pub fn draw_mem(f: &mut ratatui::Frame<'_>, area: Rect, ratio: Option<f32>) {
    let pct = ratio.map(|r| (r * 100.0).clamp(0.0, 100.0)).unwrap_or(0.0);
    let label = match ratio {
        Some(_) => format!("{pct:.1}% used"),
        None => "N/A".into(),
    };
    let g = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Memory"))
        .gauge_style(Style::default().fg(Color::Magenta))
        .percent(pct.round() as u16)
        .label(label);
    f.render_widget(g, area);
}
