//! Core module - notification entity and the query engines over it

mod dedup;
pub(crate) mod escape;
mod filter;
mod group;
mod sort;
mod types;

pub(crate) use dedup::{DedupCriteria, DedupOptions, Deduplicated, deduplicate};
pub(crate) use filter::{Filter, FilterOptions, ReadFilter, filter_notifications, search_notifications};
pub(crate) use group::{GroupMode, GroupResult, get_group_counts, group_notifications};
pub(crate) use sort::{SortOptions, sort_notifications, sort_with_unread_first};
pub(crate) use types::{Level, NewNotification, Notification, State};

#[cfg(test)]
pub(crate) use sort::{SortField, SortOrder};
#[cfg(test)]
pub(crate) use types::fixtures;
