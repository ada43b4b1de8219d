use env_logger::{Builder, Env};

use crate::consts::LOG_ENV;

/// Install the global logger. Diagnostics go to stderr so stdout stays
/// parseable for `--json` consumers.
///
/// `INTRAY_LOG` overrides the default filter, which is `warn` or `debug`
/// when debug output was requested.
pub(crate) fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    let _ = Builder::from_env(Env::default().filter_or(LOG_ENV, default_filter))
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
