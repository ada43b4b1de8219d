pub(crate) mod date;
pub(crate) mod logging;

pub(crate) use date::{days_before, is_rfc3339, now_rfc3339, parse_duration};
pub(crate) use logging::init_logging;
