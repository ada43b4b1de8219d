use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::core::GroupMode;
use crate::error::AppError;
use crate::output::status::StatusView;

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub(crate) fn group_counts_json(mode: GroupMode, counts: &BTreeMap<String, usize>) -> Value {
    json!({
        "mode": mode,
        "counts": counts,
    })
}

pub(crate) fn status_json(view: &StatusView<'_>) -> Value {
    json!({
        "backend": view.backend,
        "active": view.active,
        "unread": view.unread,
        "mode": view.mode,
        "counts": view.counts,
    })
}
