pub mod cursor;
pub mod events;
pub mod five_fret;
pub mod fret_state;
pub mod hit_window;
pub mod input;
pub mod parameters;
pub mod state;
pub mod sustain;
pub mod timer;

pub use cursor::EventCursor;
pub use events::{EngineEvent, EventSink, NullSink, RecordingSink};
pub use five_fret::{FiveFretEngine, MAX_HIT_LOGIC_PASSES};
pub use hit_window::HitWindowSettings;
pub use input::{FretButton, GameInput, GuitarAction};
pub use parameters::EngineParameters;
pub use state::{EngineState, EngineStats, NoteStatus};
pub use sustain::SustainRecord;
pub use timer::{EngineTimer, TimerSet};
