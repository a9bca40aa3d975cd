//! Aggregate CPU sparkline.

use std::collections::VecDeque;

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Sparkline},
};

use crate::history::tail;
use crate::ui::util::load_color;

/// `hist` holds whole percents (0..=100), `now` is the latest ratio.
pub fn draw_cpu_graph(f: &mut ratatui::Frame<'_>, area: Rect, hist: &VecDeque<u64>, now: Option<f32>) {
    let title = match now {
        Some(r) => format!("CPU (now: {:>5.1}%)", r * 100.0),
        None => "CPU".into(),
    };
    let data = tail(hist, area.width.saturating_sub(2) as usize);
    let spark = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(&data)
        .max(100)
        .style(Style::default().fg(load_color(now.unwrap_or(0.0) * 100.0)));
    f.render_widget(spark, area);
}
