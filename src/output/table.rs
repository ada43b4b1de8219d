use comfy_table::{Cell, Color, Table};

use crate::core::{Deduplicated, GroupResult, Notification, State};
use crate::output::format::{
    MESSAGE_WIDTH, create_styled_table, format_origin, header_cell, level_color, right_cell,
    styled_cell, truncate_message,
};

#[derive(Debug, Clone, Copy)]
pub(crate) struct TableOptions {
    pub(crate) use_color: bool,
    /// Show the State column (only useful when dismissed rows are listed)
    pub(crate) show_state: bool,
}

fn build_header(opts: &TableOptions, with_count: bool) -> Vec<Cell> {
    let c = opts.use_color;
    let mut h = vec![header_cell("ID", c)];
    if with_count {
        h.push(header_cell("Count", c));
    }
    h.extend([
        header_cell("Time", c),
        header_cell("Level", c),
        header_cell("Origin", c),
    ]);
    if opts.show_state {
        h.push(header_cell("State", c));
    }
    h.extend([header_cell("Read", c), header_cell("Message", c)]);
    h
}

fn build_row(n: &Notification, count: Option<usize>, opts: &TableOptions) -> Vec<Cell> {
    let color = |c: Option<Color>| if opts.use_color { c } else { None };
    let unread = !n.is_read();
    let mut row = vec![right_cell(&n.id.to_string(), None, false)];
    if let Some(count) = count {
        row.push(right_cell(&count.to_string(), None, count > 1));
    }
    row.extend([
        Cell::new(&n.timestamp),
        styled_cell(n.level.as_str(), color(level_color(n.level)), false),
        Cell::new(format_origin(n)),
    ]);
    if opts.show_state {
        let state_color = (n.state == State::Dismissed).then_some(Color::DarkGrey);
        row.push(styled_cell(n.state.as_str(), color(state_color), false));
    }
    row.extend([
        Cell::new(if unread { "unread" } else { "read" }),
        styled_cell(&truncate_message(&n.message, MESSAGE_WIDTH), None, unread && opts.use_color),
    ]);
    row
}

fn notification_table(notifs: &[Notification], opts: &TableOptions) -> Table {
    let mut table = create_styled_table();
    table.set_header(build_header(opts, false));
    for n in notifs {
        table.add_row(build_row(n, None, opts));
    }
    table
}

fn dedup_table(entries: &[Deduplicated], opts: &TableOptions) -> Table {
    let mut table = create_styled_table();
    table.set_header(build_header(opts, true));
    for entry in entries {
        table.add_row(build_row(&entry.notification, Some(entry.count), opts));
    }
    table
}

pub(crate) fn print_notification_table(notifs: &[Notification], opts: &TableOptions) {
    if notifs.is_empty() {
        println!("No notifications found.");
        return;
    }
    println!("{}", notification_table(notifs, opts));
    println!("  {} notification(s)", notifs.len());
}

pub(crate) fn print_dedup_table(entries: &[Deduplicated], opts: &TableOptions) {
    if entries.is_empty() {
        println!("No notifications found.");
        return;
    }
    let total: usize = entries.iter().map(|e| e.count).sum();
    println!("{}", dedup_table(entries, opts));
    println!("  {} unique of {} notification(s)", entries.len(), total);
}

/// One heading plus table per group.
pub(crate) fn print_group_tables(result: &GroupResult, opts: &TableOptions) {
    if result.groups.is_empty() {
        println!("No notifications found.");
        return;
    }
    for group in &result.groups {
        let heading = format!(
            "{} ({} total, {} unread)",
            group.display_name, group.count, group.unread_count
        );
        if opts.use_color {
            println!("\x1b[1m{heading}\x1b[0m");
        } else {
            println!("{heading}");
        }
        println!("{}", notification_table(&group.notifications, opts));
    }
    println!(
        "  {} group(s), {} notification(s), {} unread",
        result.groups.len(),
        result.total_count,
        result.total_unread
    );
}
