use serde::{Deserialize, Serialize};

use crate::engine::state::EngineState;
use crate::engine::timer::TimerSet;
use crate::model::note::{BLUE, GREEN, ORANGE, RED, YELLOW};

/// One of the five fret buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FretButton {
    Green,
    Red,
    Yellow,
    Blue,
    Orange,
}

impl FretButton {
    pub fn bit(self) -> u8 {
        match self {
            Self::Green => GREEN,
            Self::Red => RED,
            Self::Yellow => YELLOW,
            Self::Blue => BLUE,
            Self::Orange => ORANGE,
        }
    }
}

/// Quantized controller actions the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuitarAction {
    Fret(FretButton),
    StrumDown,
    StrumUp,
    StarPower,
    Whammy,
}

/// A timestamped input edge. `pressed` is the edge direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameInput {
    pub time: f64,
    pub action: GuitarAction,
    pub pressed: bool,
}

impl GameInput {
    pub fn new(time: f64, action: GuitarAction, pressed: bool) -> Self {
        Self {
            time,
            action,
            pressed,
        }
    }
}

/// Fold one input into the engine state.
///
/// The last-button snapshot and the per-frame action flags are player
/// signals: they are skipped under AutoPlay (and strums additionally
/// under AutoStrum), while the physical button mask is tracked
/// regardless so a gate transition starts from the real fret state.
pub(crate) fn reduce_input(
    state: &mut EngineState,
    timers: &mut TimerSet,
    input: &GameInput,
    auto_play: bool,
    auto_strum: bool,
) {
    match input.action {
        GuitarAction::StarPower => {
            state.is_star_power_input_active = input.pressed;
        }
        GuitarAction::Whammy => {
            if input.pressed {
                timers.star_power_whammy.start(input.time);
            }
        }
        GuitarAction::Fret(button) => {
            if !auto_play {
                state.last_button_mask = state.button_mask;
            }
            let mut frets = state.button_mask & crate::model::note::FRET_MASK;
            if input.pressed {
                frets |= button.bit();
            } else {
                frets &= !button.bit();
            }
            state.button_mask = crate::engine::fret_state::normalize_buttons(frets);
            if !auto_play {
                state.has_fretted = true;
                state.is_fret_press = input.pressed;
            }
        }
        GuitarAction::StrumDown | GuitarAction::StrumUp => {
            if input.pressed && !auto_play && !auto_strum {
                state.has_strummed = true;
            }
        }
    }
}
