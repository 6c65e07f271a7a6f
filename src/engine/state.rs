use crate::engine::sustain::SustainRecord;
use crate::model::note::OPEN;

/// Hit/miss bookkeeping for one chart note. Owned by the engine in a
/// parallel array; chart notes themselves stay immutable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteStatus {
    pub was_hit: bool,
    pub was_missed: bool,
}

impl NoteStatus {
    /// A note is fully dealt with once either flag is set.
    pub fn is_dealt_with(&self) -> bool {
        self.was_hit || self.was_missed
    }
}

/// Mutable engine state. Exclusive to the simulation thread; mutated
/// only inside a tick.
#[derive(Debug, Clone)]
pub struct EngineState {
    /// Index of the earliest note not yet dealt with. Non-decreasing
    /// until an explicit reset.
    pub note_index: usize,
    pub current_time: f64,
    pub current_tick: u32,
    /// Five fret bits plus OPEN; OPEN is set iff no fret is held.
    pub button_mask: u8,
    /// Snapshot taken on fret edges while AutoPlay is off. Only
    /// meaningful for ghost detection.
    pub last_button_mask: u8,
    pub has_strummed: bool,
    pub has_fretted: bool,
    pub has_tapped: bool,
    pub is_fret_press: bool,
    pub was_note_ghosted: bool,
    pub is_star_power_input_active: bool,
    pub active_sustains: Vec<SustainRecord>,
    /// Request to re-enter the hit loop within the same evaluation.
    pub re_run_hit_logic: bool,
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            note_index: 0,
            current_time: 0.0,
            current_tick: 0,
            button_mask: OPEN,
            last_button_mask: OPEN,
            has_strummed: false,
            has_fretted: false,
            has_tapped: false,
            is_fret_press: false,
            was_note_ghosted: false,
            is_star_power_input_active: false,
            active_sustains: Vec::new(),
            re_run_hit_logic: false,
        }
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate counters, mirrored to the event sink as they change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub notes_hit: u32,
    pub notes_missed: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub overstrums: u32,
    pub ghost_inputs: u32,
}
