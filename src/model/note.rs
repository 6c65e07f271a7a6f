use serde::{Deserialize, Serialize};

/// Lowest fret.
pub const GREEN: u8 = 1 << 0;
pub const RED: u8 = 1 << 1;
pub const YELLOW: u8 = 1 << 2;
pub const BLUE: u8 = 1 << 3;
/// Highest fret.
pub const ORANGE: u8 = 1 << 4;
/// Synthetic bit meaning "no fret pressed"; the hit target for open notes.
pub const OPEN: u8 = 1 << 5;
/// Mask covering the five physical frets.
pub const FRET_MASK: u8 = GREEN | RED | YELLOW | BLUE | ORANGE;

/// A chart-provided note. Chords are collapsed into a single note whose
/// `note_mask` carries every fret of the chord.
///
/// Immutable once loaded; the engine tracks hit/miss state in its own
/// parallel array rather than mutating chart data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuitarNote {
    /// Chart time in seconds.
    pub time: f64,
    /// Position on the beat grid.
    pub tick: u32,
    /// Five fret bits plus the OPEN bit.
    pub note_mask: u8,
    /// Subset of `note_mask` used for sustain holding when the note is
    /// marked disjoint.
    #[serde(default)]
    pub disjoint_mask: u8,
    #[serde(default)]
    pub is_hopo: bool,
    #[serde(default)]
    pub is_tap: bool,
    #[serde(default)]
    pub is_chord: bool,
    #[serde(default)]
    pub is_disjoint: bool,
    #[serde(default)]
    pub is_extended_sustain: bool,
    /// End of the sustain on the beat grid. Equal to `tick` (or 0) for
    /// non-sustain notes.
    #[serde(default)]
    pub tick_end: u32,
    /// Back-link to the preceding note by index.
    #[serde(default)]
    pub previous: Option<usize>,
}

impl GuitarNote {
    /// The physical fret bits of this note (OPEN stripped).
    pub fn fret_mask(&self) -> u8 {
        self.note_mask & FRET_MASK
    }

    /// True for a pure open note with no fret component.
    pub fn is_open_only(&self) -> bool {
        self.note_mask == OPEN
    }

    /// A note is a sustain when its end lies past its start on the grid.
    pub fn is_sustain(&self) -> bool {
        self.tick_end > self.tick
    }

    /// The mask that must stay held for the sustain to keep sounding.
    pub fn sustain_mask(&self) -> u8 {
        if self.is_disjoint {
            self.disjoint_mask
        } else {
            self.note_mask
        }
    }

    /// True when only a strum (or strum leniency) can hit this note.
    pub fn requires_strum(&self) -> bool {
        !self.is_hopo && !self.is_tap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(mask: u8) -> GuitarNote {
        GuitarNote {
            time: 1.0,
            tick: 480,
            note_mask: mask,
            disjoint_mask: 0,
            is_hopo: false,
            is_tap: false,
            is_chord: false,
            is_disjoint: false,
            is_extended_sustain: false,
            tick_end: 480,
            previous: None,
        }
    }

    #[test]
    fn fret_mask_strips_open() {
        let note = plain(GREEN | OPEN);
        assert_eq!(note.fret_mask(), GREEN);
        assert!(!note.is_open_only());
        assert!(plain(OPEN).is_open_only());
    }

    #[test]
    fn sustain_detection() {
        let mut note = plain(GREEN);
        assert!(!note.is_sustain());
        note.tick_end = 960;
        assert!(note.is_sustain());
    }

    #[test]
    fn disjoint_sustain_mask() {
        let mut note = plain(GREEN | YELLOW);
        note.is_disjoint = true;
        note.disjoint_mask = YELLOW;
        assert_eq!(note.sustain_mask(), YELLOW);
        note.is_disjoint = false;
        assert_eq!(note.sustain_mask(), GREEN | YELLOW);
    }

    #[test]
    fn strum_requirement() {
        assert!(plain(GREEN).requires_strum());
        let mut hopo = plain(RED);
        hopo.is_hopo = true;
        assert!(!hopo.requires_strum());
        let mut tap = plain(RED);
        tap.is_tap = true;
        assert!(!tap.requires_strum());
    }
}
