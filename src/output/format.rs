use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, TableComponent,
    modifiers::UTF8_SOLID_INNER_BORDERS, presets::UTF8_FULL,
};

use crate::core::{Level, Notification};

/// Longest message shown in a table cell before truncation
pub(super) const MESSAGE_WIDTH: usize = 60;

pub(super) fn level_color(level: Level) -> Option<Color> {
    match level {
        Level::Critical => Some(Color::Magenta),
        Level::Error => Some(Color::Red),
        Level::Warning => Some(Color::Yellow),
        Level::Info => None,
    }
}

/// `session:window.pane`, skipping empty parts; `-` when there is no origin.
pub(super) fn format_origin(n: &Notification) -> String {
    let mut out = n.session.clone();
    if !n.window.is_empty() {
        if !out.is_empty() {
            out.push(':');
        }
        out.push_str(&n.window);
    }
    if !n.pane.is_empty() {
        if !out.is_empty() {
            out.push('.');
        }
        out.push_str(&n.pane);
    }
    if out.is_empty() { "-".to_string() } else { out }
}

/// Single-line message clipped to `max` characters.
pub(super) fn truncate_message(message: &str, max: usize) -> String {
    let flat = message.replace(['\n', '\t'], " ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut out: String = flat.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

pub(super) fn styled_cell(text: &str, color: Option<Color>, bold: bool) -> Cell {
    let mut cell = Cell::new(text);
    if let Some(c) = color {
        cell = cell.fg(c);
    }
    if bold {
        cell = cell.add_attribute(Attribute::Bold);
    }
    cell
}

pub(super) fn header_cell(text: &str, use_color: bool) -> Cell {
    let mut cell = Cell::new(text).add_attribute(Attribute::Bold);
    if use_color {
        cell = cell.fg(Color::Cyan);
    }
    cell
}

/// Replace the double-line header separator (╞═╪═╡) with single-line (├─┼─┤)
fn normalize_header_separator(table: &mut Table) {
    table.set_style(TableComponent::HeaderLines, '─');
    table.set_style(TableComponent::LeftHeaderIntersection, '├');
    table.set_style(TableComponent::MiddleHeaderIntersections, '┼');
    table.set_style(TableComponent::RightHeaderIntersection, '┤');
}

/// Create a table with the standard preset, inner borders, and normalized header separator.
pub(super) fn create_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    normalize_header_separator(&mut table);
    table
}

pub(super) fn right_cell(text: &str, color: Option<Color>, bold: bool) -> Cell {
    let mut cell = Cell::new(text).set_alignment(CellAlignment::Right);
    if let Some(c) = color {
        cell = cell.fg(c);
    }
    if bold {
        cell = cell.add_attribute(Attribute::Bold);
    }
    cell
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::notif;

    #[test]
    fn origin_joins_present_parts() {
        let mut n = notif(1, "2025-01-01T00:00:00Z");
        n.session.clear();
        n.window.clear();
        n.pane.clear();
        assert_eq!(format_origin(&n), "-");
        n.session = "$1".to_string();
        assert_eq!(format_origin(&n), "$1");
        n.window = "@2".to_string();
        n.pane = "%3".to_string();
        assert_eq!(format_origin(&n), "$1:@2.%3");
        n.session.clear();
        assert_eq!(format_origin(&n), "@2.%3");
    }

    #[test]
    fn truncate_short_message_untouched() {
        assert_eq!(truncate_message("hello", 10), "hello");
    }

    #[test]
    fn truncate_long_message_and_flatten() {
        assert_eq!(truncate_message("line one\nline two", 10), "line on...");
        assert_eq!(truncate_message("ééééééé", 5), "éé...");
    }

    #[test]
    fn info_has_no_color() {
        assert_eq!(level_color(Level::Info), None);
        assert_eq!(level_color(Level::Error), Some(Color::Red));
    }
}
