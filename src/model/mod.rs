pub mod chart;
pub mod note;
pub mod sync_track;

pub use chart::Chart;
pub use note::GuitarNote;
pub use sync_track::{SyncTrack, TempoChange};
