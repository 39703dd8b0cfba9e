use std::time::Duration;

/// Tunables for the engine. Passed into constructors; nothing here is
/// global state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Time budget for a create. Checked after the write commits; an
    /// overrun is compensated and surfaced as a timeout.
    pub create_budget: Duration,
    /// Cap on listing results; `None` means unbounded.
    pub list_limit: Option<usize>,
    /// Let callers write system metadata entries directly. Off except
    /// for trusted internal callers.
    pub allow_system_metadata: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            create_budget: Duration::from_secs(10),
            list_limit: Some(100_000),
            allow_system_metadata: false,
        }
    }
}
