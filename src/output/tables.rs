use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use pipelens::Status;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn color_coded_status_cell(status: Status, progress: Option<u8>) -> Cell {
    let text = match progress {
        Some(percent) => format!("{status} {percent}%"),
        None => status.to_string(),
    };
    Cell::new(text).fg(status_color(status))
}

pub fn status_color(status: Status) -> TableColor {
    match status {
        Status::Idle => TableColor::Grey,
        Status::Queued => TableColor::Magenta,
        Status::Running => TableColor::Cyan,
        Status::Success => TableColor::Green,
        Status::Unstable => TableColor::Yellow,
        Status::Failed => TableColor::Red,
    }
}

/// Current duration against the previous run's: slower than before shows red, faster green.
pub fn color_coded_duration_cell(duration_millis: Option<u64>, previous_millis: i64) -> Cell {
    let Some(millis) = duration_millis else {
        return Cell::new("-").fg(TableColor::Grey);
    };
    let text = format_duration(millis);
    match u64::try_from(previous_millis) {
        Ok(previous) if millis > previous => Cell::new(text).fg(TableColor::Red),
        Ok(_) => Cell::new(text).fg(TableColor::Green),
        Err(_) => Cell::new(text),
    }
}

/// Formats milliseconds as `850ms`, `12.3s` or `4m 05s`.
pub fn format_duration(millis: u64) -> String {
    if millis < 1_000 {
        return format!("{millis}ms");
    }
    let seconds = millis / 1_000;
    if seconds < 60 {
        #[allow(clippy::cast_precision_loss)]
        let precise = millis as f64 / 1_000.0;
        return format!("{precise:.1}s");
    }
    format!("{}m {:02}s", seconds / 60, seconds % 60)
}

/// Formats a previous-run duration, where negative values mean unknown.
pub fn format_previous_duration(previous_millis: i64) -> String {
    u64::try_from(previous_millis).map_or_else(|_| "-".to_string(), format_duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_millis() {
        assert_eq!(format_duration(850), "850ms");
    }

    #[test]
    fn test_format_duration_seconds() {
        assert_eq!(format_duration(12_345), "12.3s");
    }

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration(245_000), "4m 05s");
    }

    #[test]
    fn test_format_previous_duration_unknown() {
        assert_eq!(format_previous_duration(-1), "-");
        assert_eq!(format_previous_duration(900), "900ms");
    }

    #[test]
    fn test_status_cell_shows_progress() {
        let cell = color_coded_status_cell(Status::Running, Some(40));
        assert_eq!(cell.content(), "RUNNING 40%");
    }
}
