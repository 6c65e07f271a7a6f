use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::model::note::{FRET_MASK, GuitarNote, OPEN};
use crate::model::sync_track::SyncTrack;

/// One instrument difficulty: the ordered note list plus the sync track
/// that maps its ticks to seconds.
///
/// Serialization exists for the headless driver and tests; parsing of
/// authoring formats is a separate subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub sync: SyncTrack,
    pub notes: Vec<GuitarNote>,
}

impl Chart {
    pub fn new(sync: SyncTrack, notes: Vec<GuitarNote>) -> Self {
        Self { sync, notes }
    }

    /// Load a chart from JSON, recomputing derived tempo times and
    /// validating note ordering and masks.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read chart {}", path.display()))?;
        let mut chart: Chart = serde_json::from_str(&content)
            .with_context(|| format!("cannot parse chart {}", path.display()))?;
        chart.sync.recompute_times();
        chart.validate()?;
        Ok(chart)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Boundary validation: everything past this point is trusted by the
    /// engine.
    pub fn validate(&self) -> Result<()> {
        for (i, note) in self.notes.iter().enumerate() {
            if note.note_mask == 0 || note.note_mask & !(FRET_MASK | OPEN) != 0 {
                bail!("note {i} has invalid mask {:#04x}", note.note_mask);
            }
            if note.tick_end != 0 && note.tick_end < note.tick {
                bail!("note {i} ends before it starts");
            }
            if i > 0 {
                let prev = &self.notes[i - 1];
                if note.time < prev.time || note.tick < prev.tick {
                    bail!("note {i} is out of order");
                }
            }
            if let Some(prev) = note.previous
                && prev >= i
            {
                bail!("note {i} has a forward previous-note link");
            }
        }
        Ok(())
    }

    /// Mean gap between consecutive notes, feeding the hit-window curve.
    /// Charts with fewer than two notes report 0 (static window).
    pub fn average_note_distance(&self) -> f64 {
        if self.notes.len() < 2 {
            return 0.0;
        }
        let total: f64 = self
            .notes
            .windows(2)
            .map(|pair| pair[1].time - pair[0].time)
            .sum();
        total / (self.notes.len() - 1) as f64
    }
}
