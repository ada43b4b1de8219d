//! Sort engine
//!
//! All sorts are stable and return a new vector; the input is never
//! reordered. Unknown field names fall back to `timestamp` and unknown
//! directions to `desc`; the fallback is chosen by the caller through
//! [`SortOptions::from_names`], never inside the comparator.

use std::cmp::Ordering;

use serde::Serialize;

use crate::core::types::Notification;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SortField {
    Id,
    #[default]
    Timestamp,
    State,
    Level,
    Session,
    Message,
    ReadStatus,
}

impl SortField {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "id" => Some(SortField::Id),
            "timestamp" => Some(SortField::Timestamp),
            "state" => Some(SortField::State),
            "level" => Some(SortField::Level),
            "session" => Some(SortField::Session),
            "message" => Some(SortField::Message),
            "read_status" => Some(SortField::ReadStatus),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SortOptions {
    pub(crate) field: SortField,
    pub(crate) order: SortOrder,
    pub(crate) case_insensitive: bool,
}

impl SortOptions {
    /// Build options from user-supplied names, substituting defaults for
    /// anything unrecognised.
    pub(crate) fn from_names(field: &str, order: &str, case_insensitive: bool) -> Self {
        let field = SortField::parse(field).unwrap_or_else(|| {
            log::warn!("event=sort_fallback field={field} default=timestamp");
            SortField::Timestamp
        });
        let order = SortOrder::parse(order).unwrap_or_else(|| {
            log::warn!("event=sort_fallback order={order} default=desc");
            SortOrder::Desc
        });
        Self {
            field,
            order,
            case_insensitive,
        }
    }
}

fn compare_text(a: &str, b: &str, case_insensitive: bool) -> Ordering {
    if case_insensitive {
        a.to_lowercase().cmp(&b.to_lowercase())
    } else {
        a.cmp(b)
    }
}

fn compare(a: &Notification, b: &Notification, opts: &SortOptions) -> Ordering {
    let ord = match opts.field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
        SortField::State => a.state.cmp(&b.state),
        SortField::Level => a.level.cmp(&b.level),
        SortField::Session => a.session.cmp(&b.session),
        SortField::Message => compare_text(&a.message, &b.message, opts.case_insensitive),
        // asc: unread before read; desc: read before unread
        SortField::ReadStatus => a.is_read().cmp(&b.is_read()),
    };
    match opts.order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

pub(crate) fn sort_notifications(notifs: &[Notification], opts: &SortOptions) -> Vec<Notification> {
    let mut sorted = notifs.to_vec();
    sorted.sort_by(|a, b| compare(a, b, opts));
    sorted
}

/// Unread records first whatever the requested order, then `opts` applied
/// within each partition.
pub(crate) fn sort_with_unread_first(
    notifs: &[Notification],
    opts: &SortOptions,
) -> Vec<Notification> {
    let (unread, read): (Vec<Notification>, Vec<Notification>) =
        notifs.iter().cloned().partition(|n| !n.is_read());

    let mut result = sort_notifications(&unread, opts);
    result.extend(sort_notifications(&read, opts));
    result
}
