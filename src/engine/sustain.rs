use crate::engine::fret_state::is_note_playable;
use crate::model::note::GuitarNote;

/// A sustain currently sounding. Insertion order is hit order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SustainRecord {
    /// Chart index of the sustained note.
    pub note_index: usize,
    /// The hold pattern was released but the drop leniency has not
    /// elapsed yet.
    pub is_leniency_held: bool,
    /// When the hold pattern was last released. Meaningful only while
    /// `is_leniency_held`.
    pub dropped_at: f64,
}

impl SustainRecord {
    pub fn new(note_index: usize) -> Self {
        Self {
            note_index,
            is_leniency_held: false,
            dropped_at: 0.0,
        }
    }
}

/// Whether the held buttons keep this sustain sounding.
///
/// The same anchored predicate as note hitting, applied to the sustain's
/// hold mask (the disjoint subset when the note is disjoint): pressing a
/// fret above the sustain releases it, anchoring below does not.
pub fn can_sustain_hold(buttons: u8, note: &GuitarNote) -> bool {
    is_note_playable(buttons, note.sustain_mask())
}
