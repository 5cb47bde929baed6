//! Diagnostic logging for the agent.
//!
//! The agent runs inside someone else's process, so no subscriber is
//! installed unless the `log=` option asks for one. Events then go to stderr,
//! leaving stdout to the class listing.

use tracing_subscriber::EnvFilter;

/// Installs a stderr `tracing` subscriber filtered by `directive`.
///
/// Returns `false` if the directive does not parse or a global subscriber is
/// already set (for example by an earlier load of the agent).
pub fn init(directive: &str) -> bool {
    let filter = match EnvFilter::try_new(directive) {
        Ok(filter) => filter,
        Err(err) => {
            eprintln!("[loaded-classes-agent] invalid log filter '{}': {}", directive, err);
            return false;
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
