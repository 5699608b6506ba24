/// Engine configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Length in milliseconds of one duration tick for effects without
    /// periodic behavior (`tick_interval_ms == 0`).
    pub expiry_unit_ms: u64,
    /// Upper bound on concurrently active effects per actor.
    pub max_effects_per_actor: usize,
    /// Whether a voluntary cancel may remove dances and songs.
    pub dance_cancel_buff: bool,
    /// Whether a self-refresh adopts the enchant level of the new cast.
    pub refresh_resets_enchant: bool,
}

impl EngineConfig {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_EXPIRY_UNIT_MS: u64 = 1_000;
    pub const DEFAULT_MAX_EFFECTS_PER_ACTOR: usize = 64;

    pub fn new() -> Self {
        Self {
            expiry_unit_ms: Self::DEFAULT_EXPIRY_UNIT_MS,
            max_effects_per_actor: Self::DEFAULT_MAX_EFFECTS_PER_ACTOR,
            dance_cancel_buff: false,
            refresh_resets_enchant: true,
        }
    }

    pub fn with_max_effects(mut self, max_effects_per_actor: usize) -> Self {
        self.max_effects_per_actor = max_effects_per_actor;
        self
    }

    pub fn with_dance_cancel(mut self, dance_cancel_buff: bool) -> Self {
        self.dance_cancel_buff = dance_cancel_buff;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
