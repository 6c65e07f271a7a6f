use serde::{Deserialize, Serialize};

/// Hit-window tuning. The window is a width in seconds around each
/// note's time; the front and back ends may be asymmetric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitWindowSettings {
    /// Width used by the static window and as the dynamic ceiling.
    pub max_window: f64,
    /// Dynamic floor for dense charts.
    pub min_window: f64,
    /// Scale the width with the chart's average note distance.
    pub is_dynamic: bool,
    /// Average note distance at which the dynamic width reaches the
    /// ceiling.
    pub reference_gap: f64,
    pub front_scale: f64,
    pub back_scale: f64,
}

impl Default for HitWindowSettings {
    fn default() -> Self {
        Self {
            max_window: 0.14,
            min_window: 0.04,
            is_dynamic: false,
            reference_gap: 0.5,
            front_scale: 1.0,
            back_scale: 1.0,
        }
    }
}

impl HitWindowSettings {
    /// Window width for a chart with the given average note distance.
    pub fn calculate_hit_window(&self, avg_note_distance: f64) -> f64 {
        if !self.is_dynamic || self.reference_gap <= 0.0 {
            return self.max_window;
        }
        let t = (avg_note_distance / self.reference_gap).clamp(0.0, 1.0);
        self.min_window + (self.max_window - self.min_window) * t
    }

    /// How far before `note.time` a hit is still valid. Zero or negative.
    pub fn front_end(&self, width: f64) -> f64 {
        -(width * self.front_scale)
    }

    /// Tolerance after `note.time`. Zero or positive.
    pub fn back_end(&self, width: f64) -> f64 {
        width * self.back_scale
    }
}
