//! Default values for the scenario configuration.

/// Upper bound on `rounds`; each round forks a child and waits for a worker.
pub const MAX_ROUNDS: u32 = 10_000;

// Default value functions for serde
pub(crate) fn default_lock_name() -> String {
    "shared".to_string()
}
pub(crate) fn default_rounds() -> u32 {
    1
}
pub(crate) fn default_hold_ms() -> u64 {
    5000
}
pub(crate) fn default_fork_delay_ms() -> u64 {
    1000
}
pub(crate) fn default_ready_timeout_ms() -> u64 {
    5000
}
pub(crate) fn default_child_lock_timeout_ms() -> u64 {
    1000
}
pub(crate) fn default_child_exit_timeout_ms() -> u64 {
    3000
}
pub(crate) fn default_true() -> bool {
    true
}
