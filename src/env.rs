// Environment detection utilities

use std::io::IsTerminal;

/// Check whether the TUI can take over the terminal
///
/// Interactive mode needs:
/// - stdout attached to a terminal
/// - TERM set and not "dumb"
/// - no CI environment
pub fn is_interactive_terminal() -> bool {
    interactive_from(
        std::io::stdout().is_terminal(),
        std::env::var("TERM").ok().as_deref(),
        std::env::var("CI").is_ok(),
    )
}

fn interactive_from(stdout_is_tty: bool, term: Option<&str>, ci: bool) -> bool {
    if !stdout_is_tty {
        tracing::debug!("Non-interactive: stdout is not a terminal");
        return false;
    }

    if ci {
        tracing::debug!("Non-interactive: CI environment");
        return false;
    }

    match term {
        None => {
            tracing::debug!("Non-interactive: TERM not set");
            false
        }
        Some(term) if term == "dumb" || term.is_empty() => {
            tracing::debug!("Non-interactive: TERM is '{}'", term);
            false
        }
        Some(_) => true,
    }
}
