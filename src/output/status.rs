use comfy_table::{Cell, Table};
use std::collections::BTreeMap;

use crate::core::GroupMode;
use crate::output::format::{create_styled_table, header_cell, right_cell};
use crate::storage::Backend;

pub(crate) struct StatusView<'a> {
    pub(crate) backend: Backend,
    pub(crate) active: usize,
    pub(crate) unread: usize,
    pub(crate) mode: GroupMode,
    pub(crate) counts: &'a BTreeMap<String, usize>,
}

fn counts_table(
    mode: GroupMode,
    counts: &BTreeMap<String, usize>,
    count_label: &str,
    use_color: bool,
) -> Table {
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell(mode.label(), use_color),
        header_cell(count_label, use_color),
    ]);
    for (name, count) in counts {
        table.add_row(vec![Cell::new(name), right_cell(&count.to_string(), None, false)]);
    }
    table
}

pub(crate) fn print_status(view: &StatusView<'_>, use_color: bool) {
    println!(
        "{} active notification(s), {} unread ({} backend)",
        view.active, view.unread, view.backend
    );
    if !view.counts.is_empty() {
        println!("{}", counts_table(view.mode, view.counts, "Active", use_color));
    }
}

/// Counts only, as printed by `list --group-count`.
pub(crate) fn print_group_counts(mode: GroupMode, counts: &BTreeMap<String, usize>, use_color: bool) {
    if counts.is_empty() {
        println!("No notifications found.");
        return;
    }
    println!("{}", counts_table(mode, counts, "Count", use_color));
}
