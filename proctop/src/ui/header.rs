//! Top header with OS, kernel, uptime and process counts.

use proctop_agent::SystemSummary;
use ratatui::{
    layout::Rect,
    widgets::{Block, Borders},
};

use crate::ui::util::format_elapsed;

pub fn header_title(s: Option<&SystemSummary>) -> String {
    match s {
        Some(s) => format!(
            "proctop | {} | kernel {} | up {} | {} procs, {} running  (press 'q' to quit)",
            s.os_name,
            s.kernel,
            format_elapsed(s.uptime_secs as i64),
            s.total_processes,
            s.running_processes
        ),
        None => "proctop | sampling... (press 'q' to quit)".into(),
    }
}

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, s: Option<&SystemSummary>) {
    f.render_widget(
        Block::default().title(header_title(s)).borders(Borders::BOTTOM),
        area,
    );
}
