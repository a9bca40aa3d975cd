//! Small UI helpers: elapsed time, truncation, load colors.

use ratatui::style::Color;

/// Seconds as `HH:MM:SS`; hours keep growing past 99, negatives show as zero.
pub fn format_elapsed(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

pub fn truncate_middle(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    if max <= 3 {
        return "...".into();
    }
    let keep = max - 3;
    let left = keep / 2;
    let right = keep - left;
    let head: String = s.chars().take(left).collect();
    let tail: String = s.chars().skip(len - right).collect();
    format!("{head}...{tail}")
}

/// Green / yellow / red by percent busy.
pub fn load_color(pct: f32) -> Color {
    match pct {
        x if x < 25.0 => Color::Green,
        x if x < 60.0 => Color::Yellow,
        _ => Color::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_pads_each_part() {
        assert_eq!(format_elapsed(0), "00:00:00");
        assert_eq!(format_elapsed(59), "00:00:59");
        assert_eq!(format_elapsed(3_661), "01:01:01");
        assert_eq!(format_elapsed(360_000), "100:00:00");
        assert_eq!(format_elapsed(-5), "00:00:00");
    }

    #[test]
    fn truncate_keeps_both_ends() {
        assert_eq!(truncate_middle("short", 10), "short");
        assert_eq!(truncate_middle("/usr/bin/very-long-name", 11), "/usr...name");
        assert_eq!(truncate_middle("abcdef", 2), "...");
        assert_eq!(truncate_middle("ééééééé", 5), "é...é");
    }

    #[test]
    fn colors_by_threshold() {
        assert_eq!(load_color(10.0), Color::Green);
        assert_eq!(load_color(30.0), Color::Yellow);
        assert_eq!(load_color(90.0), Color::Red);
    }
}
