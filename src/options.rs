//! Parsing of the agent options string.
//!
//! The JVM passes everything after `=` in `-agentpath:lib.so=...`, or the
//! options argument of `VirtualMachine.loadAgentPath`, verbatim. The agent
//! understands comma-separated `key=value` pairs:
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `log` | `tracing` filter for stderr diagnostics, e.g. `log=debug` |
//!
//! Since `,` already separates options, multiple filter directives inside
//! `log=` are separated with `;`: `log=info;loaded_classes_agent=trace`.
//!
//! Parsing happens before any subscriber exists, so entries that are not
//! understood are collected in [`AgentOptions::ignored`] for the caller to
//! report once logging is set up.

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    /// Filter directive for the diagnostic subscriber; `None` leaves logging off.
    pub log: Option<String>,
    /// Entries that were not recognised, verbatim and in order.
    pub ignored: Vec<String>,
}

impl AgentOptions {
    pub fn parse(options: &str) -> Self {
        let mut parsed = AgentOptions::default();

        for entry in options.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match entry.split_once('=').map(|(key, value)| (key.trim(), value.trim())) {
                Some(("log", filter)) if !filter.is_empty() => {
                    parsed.log = Some(filter.replace(';', ","));
                }
                _ => parsed.ignored.push(entry.to_string()),
            }
        }

        parsed
    }
}
