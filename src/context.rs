//! Origin context from the terminal multiplexer
//!
//! `add` asks a [`ContextProvider`] for the current pane when the caller did
//! not pass an explicit origin. The provider may fail for many reasons (not
//! inside tmux, binary missing, server hung); the caller logs the failure and
//! proceeds with empty origin fields.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ContextError;

const DISPLAY_FORMAT: &str = "#{session_id} #{window_id} #{pane_id} #{pane_pid}";
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct OriginContext {
    pub(crate) session: String,
    pub(crate) window: String,
    pub(crate) pane: String,
    pub(crate) pane_created: String,
}

pub(crate) trait ContextProvider {
    fn current(&self) -> Result<OriginContext, ContextError>;
}

/// Asks the enclosing tmux server, bounded by `timeout`.
pub(crate) struct TmuxContext {
    timeout: Duration,
}

impl TmuxContext {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ContextProvider for TmuxContext {
    fn current(&self) -> Result<OriginContext, ContextError> {
        if std::env::var_os("TMUX").is_none_or(|v| v.is_empty()) {
            return Err(ContextError::NotInMultiplexer);
        }

        let mut child = Command::new("tmux")
            .args(["display", "-p", DISPLAY_FORMAT])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ContextError::NotFound
                } else {
                    ContextError::Spawn(e)
                }
            })?;

        // Output is one short line, so it fits in the pipe buffer while we poll.
        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait().map_err(ContextError::Wait)? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ContextError::Timeout {
                    ms: self.timeout.as_millis(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout).map_err(ContextError::Wait)?;
        }
        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut err) = child.stderr.take() {
                let _ = err.read_to_string(&mut stderr);
            }
            return Err(ContextError::Failed(stderr.trim().to_string()));
        }

        let ctx = parse_display_output(&stdout)?;
        log::debug!(
            "event=context_resolved session={} window={} pane={} elapsed_ms={}",
            ctx.session,
            ctx.window,
            ctx.pane,
            started.elapsed().as_millis()
        );
        Ok(ctx)
    }
}

/// Used when auto context is disabled.
pub(crate) struct NoContext;

impl ContextProvider for NoContext {
    fn current(&self) -> Result<OriginContext, ContextError> {
        Ok(OriginContext::default())
    }
}

/// Parse `session window pane pid`; runs of spaces are tolerated.
pub(crate) fn parse_display_output(stdout: &str) -> Result<OriginContext, ContextError> {
    let parts: Vec<&str> = stdout.split_whitespace().collect();
    let [session, window, pane, pid] = parts.as_slice() else {
        return Err(ContextError::Malformed(stdout.trim().to_string()));
    };
    Ok(OriginContext {
        session: (*session).to_string(),
        window: (*window).to_string(),
        pane: (*pane).to_string(),
        pane_created: (*pid).to_string(),
    })
}

/// Resolve the origin, degrading to an empty one when the provider fails.
pub(crate) fn resolve_or_empty(provider: &dyn ContextProvider) -> OriginContext {
    match provider.current() {
        Ok(ctx) => ctx,
        Err(ContextError::NotInMultiplexer) => {
            log::debug!("event=context_skipped reason=not_in_tmux");
            OriginContext::default()
        }
        Err(e) => {
            log::warn!("event=context_failed error=\"{e}\"");
            OriginContext::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl ContextProvider for Failing {
        fn current(&self) -> Result<OriginContext, ContextError> {
            Err(ContextError::Timeout { ms: 5 })
        }
    }

    #[test]
    fn parses_four_fields() {
        let ctx = parse_display_output("$1 @2 %3 4242\n").unwrap();
        assert_eq!(ctx.session, "$1");
        assert_eq!(ctx.window, "@2");
        assert_eq!(ctx.pane, "%3");
        assert_eq!(ctx.pane_created, "4242");
    }

    #[test]
    fn tolerates_repeated_spaces() {
        let ctx = parse_display_output("  $1   @2 %3  9 ").unwrap();
        assert_eq!(ctx.pane, "%3");
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(matches!(
            parse_display_output("$1 @2 %3"),
            Err(ContextError::Malformed(_))
        ));
        assert!(matches!(
            parse_display_output(""),
            Err(ContextError::Malformed(_))
        ));
    }

    #[test]
    fn failure_degrades_to_empty_origin() {
        assert_eq!(resolve_or_empty(&Failing), OriginContext::default());
    }

    #[test]
    fn no_context_is_empty() {
        assert_eq!(resolve_or_empty(&NoContext), OriginContext::default());
    }
}
