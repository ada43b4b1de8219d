//! Filter predicate applied at the storage boundary
//!
//! Every supplied criterion must match; absent or empty criteria impose no
//! constraint. Timestamp cutoffs compare as strings, which orders correctly
//! for RFC3339 values written with the same UTC offset.

use chrono::{DateTime, Utc};

use crate::core::types::{Level, Notification, State};
use crate::utils::days_before;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadFilter {
    Read,
    Unread,
}

impl ReadFilter {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(ReadFilter::Read),
            "unread" => Some(ReadFilter::Unread),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ReadFilter::Read => "read",
            ReadFilter::Unread => "unread",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Filter {
    pub(crate) state: Option<State>,
    pub(crate) level: Option<Level>,
    pub(crate) session: Option<String>,
    pub(crate) window: Option<String>,
    pub(crate) pane: Option<String>,
    /// Inclusive upper bound on `timestamp`
    pub(crate) older_than: Option<String>,
    /// Inclusive lower bound on `timestamp`
    pub(crate) newer_than: Option<String>,
    pub(crate) read: Option<ReadFilter>,
}

fn criterion(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Filter {
    pub(crate) fn active() -> Self {
        Self {
            state: Some(State::Active),
            ..Self::default()
        }
    }

    pub(crate) fn origin(session: &str, window: &str, pane: &str) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            session: non_empty(session),
            window: non_empty(window),
            pane: non_empty(pane),
            ..Self::default()
        }
    }

    pub(crate) fn session_criterion(&self) -> Option<&str> {
        criterion(&self.session)
    }

    pub(crate) fn window_criterion(&self) -> Option<&str> {
        criterion(&self.window)
    }

    pub(crate) fn pane_criterion(&self) -> Option<&str> {
        criterion(&self.pane)
    }

    pub(crate) fn older_than_criterion(&self) -> Option<&str> {
        criterion(&self.older_than)
    }

    pub(crate) fn newer_than_criterion(&self) -> Option<&str> {
        criterion(&self.newer_than)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.state.is_none()
            && self.level.is_none()
            && self.session_criterion().is_none()
            && self.window_criterion().is_none()
            && self.pane_criterion().is_none()
            && self.older_than_criterion().is_none()
            && self.newer_than_criterion().is_none()
            && self.read.is_none()
    }

    pub(crate) fn matches(&self, n: &Notification) -> bool {
        if let Some(state) = self.state
            && n.state != state
        {
            return false;
        }
        if let Some(level) = self.level
            && n.level != level
        {
            return false;
        }
        if let Some(session) = self.session_criterion()
            && n.session != session
        {
            return false;
        }
        if let Some(window) = self.window_criterion()
            && n.window != window
        {
            return false;
        }
        if let Some(pane) = self.pane_criterion()
            && n.pane != pane
        {
            return false;
        }
        if let Some(cutoff) = self.older_than_criterion()
            && n.timestamp.as_str() > cutoff
        {
            return false;
        }
        if let Some(cutoff) = self.newer_than_criterion()
            && n.timestamp.as_str() < cutoff
        {
            return false;
        }
        match self.read {
            Some(ReadFilter::Read) => n.is_read(),
            Some(ReadFilter::Unread) => !n.is_read(),
            None => true,
        }
    }
}

/// Keep only the notifications matching `filter`, preserving order.
pub(crate) fn filter_notifications(notifs: &[Notification], filter: &Filter) -> Vec<Notification> {
    notifs.iter().filter(|n| filter.matches(n)).cloned().collect()
}

/// Query-string shaped filter input, as typed by a user.
///
/// Unknown values degrade to "no constraint" with a warning instead of
/// failing the query.
#[derive(Debug, Clone, Default)]
pub(crate) struct FilterOptions {
    pub(crate) state: Option<String>,
    pub(crate) level: Option<String>,
    pub(crate) session: Option<String>,
    pub(crate) window: Option<String>,
    pub(crate) pane: Option<String>,
    pub(crate) older_than_days: Option<u32>,
    pub(crate) newer_than_days: Option<u32>,
    pub(crate) read: Option<String>,
}

impl FilterOptions {
    pub(crate) fn to_filter(&self, now: DateTime<Utc>) -> Filter {
        let state = self.state.as_deref().and_then(|s| match s {
            "" | "all" => None,
            other => other
                .parse::<State>()
                .inspect_err(|e| log::warn!("event=filter_fallback field=state error=\"{e}\""))
                .ok(),
        });
        let level = self.level.as_deref().filter(|s| !s.is_empty()).and_then(|s| {
            s.parse::<Level>()
                .inspect_err(|e| log::warn!("event=filter_fallback field=level error=\"{e}\""))
                .ok()
        });
        let read = self.read.as_deref().filter(|s| !s.is_empty()).and_then(|s| {
            let parsed = ReadFilter::parse(s);
            if parsed.is_none() {
                log::warn!("event=filter_fallback field=read value={s}");
            }
            parsed
        });
        let cutoff = |days: Option<u32>| days.filter(|d| *d > 0).map(|d| days_before(now, d));

        Filter {
            state,
            level,
            session: self.session.clone().filter(|s| !s.is_empty()),
            window: self.window.clone().filter(|s| !s.is_empty()),
            pane: self.pane.clone().filter(|s| !s.is_empty()),
            older_than: cutoff(self.older_than_days),
            newer_than: cutoff(self.newer_than_days),
            read,
        }
    }
}

/// Substring search across message, origin and level.
pub(crate) fn search_notifications(
    notifs: Vec<Notification>,
    query: &str,
    case_insensitive: bool,
) -> Vec<Notification> {
    if query.is_empty() {
        return notifs;
    }
    let needle = if case_insensitive {
        query.to_lowercase()
    } else {
        query.to_string()
    };
    notifs
        .into_iter()
        .filter(|n| {
            [
                n.message.as_str(),
                n.session.as_str(),
                n.window.as_str(),
                n.pane.as_str(),
                n.level.as_str(),
            ]
            .into_iter()
            .any(|field| {
                if case_insensitive {
                    field.to_lowercase().contains(&needle)
                } else {
                    field.contains(&needle)
                }
            })
        })
        .collect()
}
