//! Notification entity and its invariants
//!
//! Every record that reaches storage or comes back from it is a validated
//! `Notification`; raw strings are parsed into the enums here.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::utils::is_rfc3339;

/// Lifecycle state. Transitions only `Active -> Dismissed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum State {
    Active,
    Dismissed,
}

impl State {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            State::Active => "active",
            State::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(State::Active),
            "dismissed" => Ok(State::Dismissed),
            other => Err(ValidationError::InvalidState {
                input: other.to_string(),
            }),
        }
    }
}

/// Severity level.
///
/// Ordering follows a fixed rank table rather than severity:
/// `critical < error < info < warning`. This is the order existing trays
/// have always displayed, so `sort --field level` keeps producing it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Level {
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    #[cfg(test)]
    pub(crate) const ALL: [Level; 4] = [Level::Info, Level::Warning, Level::Error, Level::Critical];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }

    /// Position in the sort rank table
    pub(crate) fn rank(self) -> u8 {
        match self {
            Level::Critical => 0,
            Level::Error => 1,
            Level::Info => 2,
            Level::Warning => 3,
        }
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Level::Info),
            "warning" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "critical" => Ok(Level::Critical),
            other => Err(ValidationError::InvalidLevel {
                input: other.to_string(),
            }),
        }
    }
}

/// A single tray record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Notification {
    pub(crate) id: i64,
    /// Creation time, RFC3339
    pub(crate) timestamp: String,
    pub(crate) state: State,
    pub(crate) session: String,
    pub(crate) window: String,
    pub(crate) pane: String,
    pub(crate) message: String,
    /// Opaque marker used to detect a recycled pane id
    pub(crate) pane_created: String,
    pub(crate) level: Level,
    /// Empty when unread, RFC3339 when read
    pub(crate) read_timestamp: String,
}

impl Notification {
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.id <= 0 {
            return Err(ValidationError::InvalidId { id: self.id });
        }
        if self.timestamp.is_empty() {
            return Err(ValidationError::EmptyTimestamp);
        }
        if !is_rfc3339(&self.timestamp) {
            return Err(ValidationError::InvalidTimestamp {
                input: self.timestamp.clone(),
            });
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        if !self.read_timestamp.is_empty() && !is_rfc3339(&self.read_timestamp) {
            return Err(ValidationError::InvalidReadTimestamp {
                input: self.read_timestamp.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn is_read(&self) -> bool {
        !self.read_timestamp.is_empty()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state == State::Active
    }
}

/// Input to `Store::add`. The ID is assigned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NewNotification {
    pub(crate) message: String,
    /// `None` or empty means "now"
    pub(crate) timestamp: Option<String>,
    pub(crate) session: String,
    pub(crate) window: String,
    pub(crate) pane: String,
    pub(crate) pane_created: String,
    pub(crate) level: Level,
}

impl NewNotification {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub(crate) fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub(crate) fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub(crate) fn with_origin(
        mut self,
        session: impl Into<String>,
        window: impl Into<String>,
        pane: impl Into<String>,
    ) -> Self {
        self.session = session.into();
        self.window = window.into();
        self.pane = pane.into();
        self
    }

    pub(crate) fn with_pane_created(mut self, pane_created: impl Into<String>) -> Self {
        self.pane_created = pane_created.into();
        self
    }

    /// Checks the caller-supplied fields before an ID is spent on them.
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        if let Some(ts) = self.explicit_timestamp()
            && !is_rfc3339(ts)
        {
            return Err(ValidationError::InvalidTimestamp {
                input: ts.to_string(),
            });
        }
        for (field, value) in [
            ("session", &self.session),
            ("window", &self.window),
            ("pane", &self.pane),
        ] {
            if !value.is_empty() && value.trim().is_empty() {
                return Err(ValidationError::WhitespaceOrigin { field });
            }
        }
        Ok(())
    }

    fn explicit_timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref().filter(|ts| !ts.is_empty())
    }

    /// Build the stored record, falling back to `now` for a missing timestamp.
    pub(crate) fn into_notification(
        self,
        id: i64,
        now: &str,
    ) -> Result<Notification, ValidationError> {
        self.validate()?;
        let timestamp = self
            .explicit_timestamp()
            .map(str::to_string)
            .unwrap_or_else(|| now.to_string());
        let notification = Notification {
            id,
            timestamp,
            state: State::Active,
            session: self.session,
            window: self.window,
            pane: self.pane,
            message: self.message,
            pane_created: self.pane_created,
            level: self.level,
            read_timestamp: String::new(),
        };
        notification.validate()?;
        Ok(notification)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::notif;
    use super::*;

    const TS: &str = "2025-01-15T09:30:00Z";

    #[test]
    fn valid_notification_passes() {
        assert!(notif(1, TS).validate().is_ok());
    }

    #[test]
    fn id_must_be_positive() {
        assert_eq!(
            notif(0, TS).validate(),
            Err(ValidationError::InvalidId { id: 0 })
        );
        assert_eq!(
            notif(-3, TS).validate(),
            Err(ValidationError::InvalidId { id: -3 })
        );
    }

    #[test]
    fn timestamp_required_and_rfc3339() {
        assert_eq!(notif(1, "").validate(), Err(ValidationError::EmptyTimestamp));
        assert!(matches!(
            notif(1, "2025-01-15 09:30:00").validate(),
            Err(ValidationError::InvalidTimestamp { .. })
        ));
        assert!(notif(1, "2025-01-15T09:30:00+02:00").validate().is_ok());
    }

    #[test]
    fn message_must_not_be_empty() {
        let mut n = notif(1, TS);
        n.message = String::new();
        assert_eq!(n.validate(), Err(ValidationError::EmptyMessage));
        n.message = "  \t".to_string();
        assert_eq!(n.validate(), Err(ValidationError::EmptyMessage));
    }

    #[test]
    fn read_timestamp_checked_only_when_present() {
        let mut n = notif(1, TS);
        assert!(!n.is_read());
        n.read_timestamp = "yesterday".to_string();
        assert!(matches!(
            n.validate(),
            Err(ValidationError::InvalidReadTimestamp { .. })
        ));
        n.read_timestamp = TS.to_string();
        assert!(n.validate().is_ok());
        assert!(n.is_read());
    }

    #[test]
    fn state_and_level_parse_rejects_unknown() {
        assert_eq!("active".parse::<State>(), Ok(State::Active));
        assert_eq!("dismissed".parse::<State>(), Ok(State::Dismissed));
        assert!(matches!(
            "archived".parse::<State>(),
            Err(ValidationError::InvalidState { .. })
        ));
        for level in Level::ALL {
            assert_eq!(level.as_str().parse::<Level>(), Ok(level));
        }
        assert!(matches!(
            "fatal".parse::<Level>(),
            Err(ValidationError::InvalidLevel { .. })
        ));
        assert!("INFO".parse::<Level>().is_err());
    }

    #[test]
    fn level_rank_table_places_critical_first() {
        let mut levels = vec![Level::Warning, Level::Info, Level::Critical, Level::Error];
        levels.sort();
        assert_eq!(
            levels,
            vec![Level::Critical, Level::Error, Level::Info, Level::Warning]
        );
    }

    #[test]
    fn level_defaults_to_info() {
        assert_eq!(Level::default(), Level::Info);
    }

    #[test]
    fn new_notification_uses_now_when_timestamp_missing() {
        let n = NewNotification::new("build done")
            .into_notification(5, TS)
            .unwrap();
        assert_eq!(n.id, 5);
        assert_eq!(n.timestamp, TS);
        assert_eq!(n.state, State::Active);
        assert!(!n.is_read());

        let n = NewNotification::new("build done")
            .with_timestamp("")
            .into_notification(6, TS)
            .unwrap();
        assert_eq!(n.timestamp, TS);
    }

    #[test]
    fn new_notification_keeps_explicit_timestamp() {
        let n = NewNotification::new("x")
            .with_timestamp("2024-12-31T23:59:59Z")
            .with_level(Level::Critical)
            .into_notification(1, TS)
            .unwrap();
        assert_eq!(n.timestamp, "2024-12-31T23:59:59Z");
        assert_eq!(n.level, Level::Critical);
    }

    #[test]
    fn new_notification_rejects_bad_input() {
        assert_eq!(
            NewNotification::new("   ").validate(),
            Err(ValidationError::EmptyMessage)
        );
        assert!(matches!(
            NewNotification::new("x").with_timestamp("now").validate(),
            Err(ValidationError::InvalidTimestamp { .. })
        ));
        assert_eq!(
            NewNotification::new("x").with_origin(" ", "", "").validate(),
            Err(ValidationError::WhitespaceOrigin { field: "session" })
        );
        assert_eq!(
            NewNotification::new("x").with_origin("$1", "@1", "\t").validate(),
            Err(ValidationError::WhitespaceOrigin { field: "pane" })
        );
    }

    #[test]
    fn new_notification_rejects_non_positive_id() {
        assert_eq!(
            NewNotification::new("x").into_notification(0, TS),
            Err(ValidationError::InvalidId { id: 0 })
        );
    }
}
