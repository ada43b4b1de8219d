mod format;
mod json;
mod status;
mod table;

pub(crate) use json::{group_counts_json, status_json, to_json};
pub(crate) use status::{StatusView, print_group_counts, print_status};
pub(crate) use table::{TableOptions, print_dedup_table, print_group_tables, print_notification_table};
