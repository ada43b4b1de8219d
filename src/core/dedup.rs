//! Deduplication of near-identical notifications
//!
//! Records collapse when they share the criteria-relevant fields and, if a
//! window is configured, fall into the same time bucket. Buckets are built
//! per key by walking records newest-first: the first record anchors a
//! bucket and later (older) records join it while `anchor - ts <= window`.
//!
//! The surviving record of a cluster is the most recent one (ties go to the
//! higher ID). Clusters are emitted in the order they first appear in the
//! input.

use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;
use std::collections::HashMap;

use crate::core::types::{Level, Notification};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DedupCriteria {
    /// Identical message text
    #[default]
    Message,
    /// Identical message text and level
    MessageLevel,
}

impl DedupCriteria {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "message" => Some(DedupCriteria::Message),
            "message_level" | "message+level" => Some(DedupCriteria::MessageLevel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DedupOptions {
    pub(crate) criteria: DedupCriteria,
    /// `None` or a non-positive duration means global deduplication
    pub(crate) window: Option<Duration>,
}

impl DedupOptions {
    fn effective_window(&self) -> Option<Duration> {
        self.window.filter(|w| *w > Duration::zero())
    }
}

/// Structured dedup identity: criteria fields plus the window bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct DedupKey {
    pub(crate) message: String,
    pub(crate) level: Option<Level>,
    pub(crate) bucket: usize,
}

fn parse_ts(ts: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(ts).ok()
}

/// Dedup key for every record, in input order.
pub(crate) fn dedup_keys(notifs: &[Notification], opts: &DedupOptions) -> Vec<DedupKey> {
    let mut keys: Vec<DedupKey> = notifs
        .iter()
        .map(|n| DedupKey {
            message: n.message.clone(),
            level: match opts.criteria {
                DedupCriteria::Message => None,
                DedupCriteria::MessageLevel => Some(n.level),
            },
            bucket: 0,
        })
        .collect();

    let Some(window) = opts.effective_window() else {
        return keys;
    };

    let mut by_key: HashMap<DedupKey, Vec<(usize, Option<DateTime<FixedOffset>>)>> =
        HashMap::new();
    for (idx, key) in keys.iter().enumerate() {
        by_key
            .entry(key.clone())
            .or_default()
            .push((idx, parse_ts(&notifs[idx].timestamp)));
    }

    for mut members in by_key.into_values() {
        // Newest first; unparseable timestamps sink to the end.
        members.sort_by(|a, b| b.1.cmp(&a.1));
        let mut bucket = 0;
        let mut anchor: Option<DateTime<FixedOffset>> = None;
        for (idx, ts) in members {
            match (anchor, ts) {
                (None, Some(ts)) => anchor = Some(ts),
                (Some(a), Some(ts)) if a - ts > window => {
                    bucket += 1;
                    anchor = Some(ts);
                }
                _ => {}
            }
            keys[idx].bucket = bucket;
        }
    }
    keys
}

/// One surviving record and the cluster it stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Deduplicated {
    pub(crate) notification: Notification,
    pub(crate) count: usize,
    /// Member IDs, ascending
    pub(crate) ids: Vec<i64>,
}

#[derive(Debug, Clone)]
struct Cluster {
    survivor: Notification,
    ids: Vec<i64>,
}

impl Cluster {
    fn new(n: Notification) -> Self {
        Self {
            ids: vec![n.id],
            survivor: n,
        }
    }

    fn update(&mut self, n: Notification) {
        self.ids.push(n.id);
        let newer = match (parse_ts(&n.timestamp), parse_ts(&self.survivor.timestamp)) {
            (Some(a), Some(b)) => (a, n.id) > (b, self.survivor.id),
            _ => (&n.timestamp, n.id) > (&self.survivor.timestamp, self.survivor.id),
        };
        if newer {
            self.survivor = n;
        }
    }

    fn finalize(mut self) -> Deduplicated {
        self.ids.sort_unstable();
        Deduplicated {
            count: self.ids.len(),
            notification: self.survivor,
            ids: self.ids,
        }
    }
}

/// Accumulates records into clusters keyed by [`DedupKey`], remembering
/// first-appearance order.
#[derive(Debug, Default)]
struct DedupAccumulator {
    index: HashMap<DedupKey, usize>,
    clusters: Vec<Cluster>,
}

impl DedupAccumulator {
    fn push(&mut self, key: DedupKey, n: Notification) {
        match self.index.get(&key) {
            Some(&pos) => self.clusters[pos].update(n),
            None => {
                self.index.insert(key, self.clusters.len());
                self.clusters.push(Cluster::new(n));
            }
        }
    }

    fn finalize(self) -> Vec<Deduplicated> {
        self.clusters.into_iter().map(Cluster::finalize).collect()
    }
}

pub(crate) fn deduplicate(notifs: &[Notification], opts: &DedupOptions) -> Vec<Deduplicated> {
    let keys = dedup_keys(notifs, opts);
    let mut acc = DedupAccumulator::default();
    for (key, n) in keys.into_iter().zip(notifs.iter().cloned()) {
        acc.push(key, n);
    }
    acc.finalize()
}
