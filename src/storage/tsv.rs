//! Tab-separated line codec for the flat-file backend
//!
//! Field order: id, timestamp, state, session, window, pane, message,
//! pane_created, level, read_timestamp. Text fields are escaped so a record
//! never contains a raw tab or newline. Rows written before a field existed
//! are padded with empty values; extra trailing fields are ignored.

use std::collections::BTreeMap;

use crate::core::escape::{escape, unescape};
use crate::core::{Level, Notification, State};

pub(crate) const FIELD_COUNT: usize = 10;

pub(crate) fn encode_line(n: &Notification) -> String {
    let fields = [
        n.id.to_string(),
        n.timestamp.clone(),
        n.state.as_str().to_string(),
        escape(&n.session),
        escape(&n.window),
        escape(&n.pane),
        escape(&n.message),
        escape(&n.pane_created),
        n.level.as_str().to_string(),
        n.read_timestamp.clone(),
    ];
    let mut line = fields.join("\t");
    line.push('\n');
    line
}

pub(crate) fn decode_line(line: &str) -> Result<Notification, String> {
    let mut fields: Vec<&str> = line.split('\t').take(FIELD_COUNT).collect();
    fields.resize(FIELD_COUNT, "");

    let id: i64 = fields[0]
        .parse()
        .map_err(|_| format!("invalid id \"{}\"", fields[0]))?;
    let state: State = fields[2].parse().map_err(|e| format!("{e}"))?;
    // Rows that predate levels carry no level column.
    let level = if fields[8].is_empty() {
        Level::default()
    } else {
        fields[8].parse().map_err(|e| format!("{e}"))?
    };

    let n = Notification {
        id,
        timestamp: fields[1].to_string(),
        state,
        session: unescape(fields[3]),
        window: unescape(fields[4]),
        pane: unescape(fields[5]),
        message: unescape(fields[6]),
        pane_created: unescape(fields[7]),
        level,
        read_timestamp: fields[9].to_string(),
    };
    n.validate().map_err(|e| e.to_string())?;
    Ok(n)
}

/// Result of folding a version log into the latest record per ID
#[derive(Debug, Default)]
pub(crate) struct Folded {
    pub(crate) records: BTreeMap<i64, Notification>,
    pub(crate) lines: usize,
    pub(crate) skipped: usize,
    /// Lines superseded by a later version of the same ID
    pub(crate) superseded: usize,
}

/// Fold complete lines of `content`, keeping the last version of each ID.
///
/// A trailing fragment without a newline is an append still in flight and
/// is not read. Lines are decoded one at a time, so a line that is not
/// valid UTF-8 is skipped like any other malformed row.
pub(crate) fn fold_latest(content: &[u8]) -> Folded {
    let mut folded = Folded::default();
    let complete = &content[..complete_len(content)];
    for (lineno, raw) in complete.split(|&b| b == b'\n').enumerate() {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.is_empty() {
            continue;
        }
        folded.lines += 1;
        let decoded = std::str::from_utf8(raw)
            .map_err(|e| format!("invalid UTF-8: {e}"))
            .and_then(decode_line);
        match decoded {
            Ok(n) => {
                if folded.records.insert(n.id, n).is_some() {
                    folded.superseded += 1;
                }
            }
            Err(reason) => {
                folded.skipped += 1;
                log::warn!(
                    "event=tsv_row_skipped line={} reason=\"{reason}\"",
                    lineno + 1
                );
            }
        }
    }
    folded
}

/// Length of the prefix of `content` made of newline-terminated lines.
pub(crate) fn complete_len(content: &[u8]) -> usize {
    content
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |end| end + 1)
}
