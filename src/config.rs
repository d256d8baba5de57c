//! Configuration for the memory manager's ranking and lifecycle defaults.

/// Default confidence reduction applied by a decay pass.
pub const DEFAULT_DECAY_RATE: f64 = 0.05;

/// Days an entry must sit untouched before decay applies.
pub const DEFAULT_DECAY_IDLE_DAYS: i64 = 7;

/// Confidence below which an entry becomes eligible for pruning.
pub const PRUNE_CONFIDENCE_FLOOR: f64 = 0.1;

/// Configuration for a [`crate::MemoryManager`].
///
/// All values have sensible defaults; builder-style `with_*` methods allow
/// selective overrides.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Confidence reduction applied per decay pass to stale entries.
    pub decay_rate: f64,

    /// Number of days since last touch before an entry is considered stale.
    pub decay_idle_days: i64,

    /// Confidence floor below which entries are pruned.
    pub prune_confidence_floor: f64,

    /// Default result limit for `query_memories`.
    pub default_query_limit: usize,

    /// Default token budget for `generate_memory_context`.
    pub default_context_tokens: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            decay_rate: DEFAULT_DECAY_RATE,
            decay_idle_days: DEFAULT_DECAY_IDLE_DAYS,
            prune_confidence_floor: PRUNE_CONFIDENCE_FLOOR,
            default_query_limit: 100,
            default_context_tokens: 1500,
        }
    }
}

impl MemoryConfig {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the decay rate, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn with_decay_rate(mut self, rate: f64) -> Self {
        self.decay_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the idle window (in days) before decay applies.
    #[must_use]
    pub const fn with_decay_idle_days(mut self, days: i64) -> Self {
        self.decay_idle_days = days;
        self
    }

    /// Sets the default query result limit.
    #[must_use]
    pub const fn with_default_query_limit(mut self, limit: usize) -> Self {
        self.default_query_limit = limit;
        self
    }

    /// Sets the default context token budget.
    #[must_use]
    pub const fn with_default_context_tokens(mut self, tokens: usize) -> Self {
        self.default_context_tokens = tokens;
        self
    }
}
