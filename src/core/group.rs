//! Group engine
//!
//! Partitions a collection by session, window, pane, level or message.
//! Window and pane keys are structured so identical short IDs in different
//! sessions never merge; only the last component is shown. Groups are
//! always emitted sorted by display name, ties broken by the structured key.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::consts::EMPTY_GROUP_LABEL;
use crate::core::dedup::{DedupKey, DedupOptions, dedup_keys};
use crate::core::types::{Level, Notification};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum GroupMode {
    #[default]
    None,
    Session,
    Window,
    Pane,
    Level,
    Message,
}

impl GroupMode {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(GroupMode::None),
            "session" => Some(GroupMode::Session),
            "window" => Some(GroupMode::Window),
            "pane" => Some(GroupMode::Pane),
            "level" => Some(GroupMode::Level),
            "message" => Some(GroupMode::Message),
            _ => None,
        }
    }

    /// Column heading for this dimension
    pub(crate) fn label(self) -> &'static str {
        match self {
            GroupMode::None => "Group",
            GroupMode::Session => "Session",
            GroupMode::Window => "Window",
            GroupMode::Pane => "Pane",
            GroupMode::Level => "Level",
            GroupMode::Message => "Message",
        }
    }

    /// Parse a user-supplied mode, degrading to `none` when unknown.
    pub(crate) fn parse_or_none(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            log::warn!("event=group_fallback mode={s} default=none");
            GroupMode::None
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum GroupKey {
    Session(String),
    Window {
        session: String,
        window: String,
    },
    Pane {
        session: String,
        window: String,
        pane: String,
    },
    Level(Level),
    Message(DedupKey),
}

impl GroupKey {
    pub(crate) fn display_name(&self) -> String {
        let last = match self {
            GroupKey::Session(session) => session.as_str(),
            GroupKey::Window { window, .. } => window.as_str(),
            GroupKey::Pane { pane, .. } => pane.as_str(),
            GroupKey::Level(level) => level.as_str(),
            GroupKey::Message(key) => key.message.as_str(),
        };
        if last.is_empty() {
            EMPTY_GROUP_LABEL.to_string()
        } else {
            last.to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Group {
    #[serde(skip)]
    pub(crate) key: GroupKey,
    pub(crate) display_name: String,
    pub(crate) count: usize,
    pub(crate) unread_count: usize,
    pub(crate) notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GroupResult {
    pub(crate) mode: GroupMode,
    pub(crate) groups: Vec<Group>,
    pub(crate) total_count: usize,
    pub(crate) total_unread: usize,
}

fn count_unread(notifs: &[Notification]) -> usize {
    notifs.iter().filter(|n| !n.is_read()).count()
}

fn group_keys(notifs: &[Notification], mode: GroupMode, dedup: &DedupOptions) -> Vec<GroupKey> {
    if mode == GroupMode::Message {
        return dedup_keys(notifs, dedup)
            .into_iter()
            .map(GroupKey::Message)
            .collect();
    }
    notifs
        .iter()
        .filter_map(|n| match mode {
            GroupMode::Session => Some(GroupKey::Session(n.session.clone())),
            GroupMode::Window => Some(GroupKey::Window {
                session: n.session.clone(),
                window: n.window.clone(),
            }),
            GroupMode::Pane => Some(GroupKey::Pane {
                session: n.session.clone(),
                window: n.window.clone(),
                pane: n.pane.clone(),
            }),
            GroupMode::Level => Some(GroupKey::Level(n.level)),
            GroupMode::None | GroupMode::Message => None,
        })
        .collect()
}

/// Group `notifs` by `mode`. Message grouping honours `dedup`, so a
/// windowed dedup splits one message into several groups.
pub(crate) fn group_notifications(
    notifs: &[Notification],
    mode: GroupMode,
    dedup: &DedupOptions,
) -> GroupResult {
    let total_count = notifs.len();
    let total_unread = count_unread(notifs);
    if mode == GroupMode::None || notifs.is_empty() {
        return GroupResult {
            mode,
            groups: Vec::new(),
            total_count,
            total_unread,
        };
    }

    let mut members: HashMap<GroupKey, Vec<Notification>> = HashMap::new();
    for (key, n) in group_keys(notifs, mode, dedup).into_iter().zip(notifs) {
        members.entry(key).or_default().push(n.clone());
    }

    let mut groups: Vec<Group> = members
        .into_iter()
        .map(|(key, notifications)| Group {
            display_name: key.display_name(),
            count: notifications.len(),
            unread_count: count_unread(&notifications),
            key,
            notifications,
        })
        .collect();
    groups.sort_by(|a, b| {
        a.display_name
            .cmp(&b.display_name)
            .then_with(|| a.key.cmp(&b.key))
    });

    GroupResult {
        mode,
        groups,
        total_count,
        total_unread,
    }
}

/// Member count per display name. Groups sharing a display name are summed.
pub(crate) fn get_group_counts(
    notifs: &[Notification],
    mode: GroupMode,
    dedup: &DedupOptions,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    if mode == GroupMode::None {
        return counts;
    }
    for key in group_keys(notifs, mode, dedup) {
        *counts.entry(key.display_name()).or_insert(0) += 1;
    }
    counts
}
