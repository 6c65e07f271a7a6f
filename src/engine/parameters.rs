use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::hit_window::HitWindowSettings;

/// Per-session engine tuning. Immutable once the engine is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParameters {
    pub hit_window: HitWindowSettings,
    /// Full strum-leniency window in seconds.
    pub strum_leniency: f64,
    /// Shortened window used past the current note's back end.
    pub strum_leniency_small: f64,
    /// Grace period after a HOPO/tap hit during which a strum is eaten.
    pub hopo_leniency: f64,
    /// How long a whammy edge keeps the star-power whammy state alive.
    pub star_power_whammy_buffer: f64,
    /// Spread tolerance for staggered chord presses.
    pub chord_stagger_window: f64,
    /// Grace period before a released sustain is dropped. 0 drops
    /// immediately.
    pub sustain_drop_leniency: f64,
    /// Enable ghost-input detection and the front-end expiry.
    pub anti_ghosting: bool,
    /// Disable the front-end expiry entirely.
    pub infinite_front_end: bool,
}

impl Default for EngineParameters {
    fn default() -> Self {
        Self {
            hit_window: HitWindowSettings::default(),
            strum_leniency: 0.07,
            strum_leniency_small: 0.025,
            hopo_leniency: 0.08,
            star_power_whammy_buffer: 0.25,
            chord_stagger_window: 0.05,
            sustain_drop_leniency: 0.0,
            anti_ghosting: true,
            infinite_front_end: false,
        }
    }
}

impl EngineParameters {
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read parameters {}", path.display()))?;
        let params = serde_json::from_str(&content)
            .with_context(|| format!("cannot parse parameters {}", path.display()))?;
        Ok(params)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
