//! The five-fret hit resolver: a time-driven state machine fed quantized
//! inputs, re-evaluated on timer expirations as well as input edges.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::engine::events::EventSink;
use crate::engine::fret_state::{self, is_note_playable, strip_frets};
use crate::engine::input::{GameInput, reduce_input};
use crate::engine::parameters::EngineParameters;
use crate::engine::state::{EngineState, EngineStats, NoteStatus};
use crate::engine::sustain::{SustainRecord, can_sustain_hold};
use crate::engine::timer::TimerSet;
use crate::flags::oracle::{FlagOracle, ProfileFlag};
use crate::model::chart::Chart;
use crate::model::note::{FRET_MASK, GuitarNote};

/// Bound on same-frame re-entry of the hit loop. A pass that still
/// requests re-running past this cap indicates a cycle.
pub const MAX_HIT_LOGIC_PASSES: usize = 16;

/// The five-fret guitar hit-detection engine.
///
/// One instance is one session; a new session is produced by
/// reconstructing (or `reset`ting) the engine. All methods run on the
/// simulation thread; the flag oracle is the only collaborator that may
/// be mutated elsewhere.
pub struct FiveFretEngine<S: EventSink> {
    chart: Chart,
    params: EngineParameters,
    front_end: f64,
    back_end: f64,
    timers: TimerSet,
    state: EngineState,
    note_statuses: Vec<NoteStatus>,
    stats: EngineStats,
    sink: S,
    oracle: Arc<dyn FlagOracle>,
    profile_id: Uuid,
    is_bot: bool,
    input_queue: VecDeque<GameInput>,
    // Gate snapshot, refreshed once per update call.
    auto_play: bool,
    auto_strum: bool,
    // Last star-power state reported to the sink.
    sp_engaged: bool,
    sp_whammying: bool,
}

impl<S: EventSink> FiveFretEngine<S> {
    /// Build an engine for one session. The chart must already be
    /// boundary-validated; unordered notes here are a programmer error.
    pub fn new(
        chart: Chart,
        params: EngineParameters,
        profile_id: Uuid,
        oracle: Arc<dyn FlagOracle>,
        sink: S,
    ) -> Self {
        for (i, pair) in chart.notes.windows(2).enumerate() {
            assert!(
                pair[1].time >= pair[0].time && pair[1].tick >= pair[0].tick,
                "chart notes out of order at index {}",
                i + 1
            );
        }
        let width = params
            .hit_window
            .calculate_hit_window(chart.average_note_distance());
        let front_end = params.hit_window.front_end(width);
        let back_end = params.hit_window.back_end(width);
        let timers = TimerSet::new(&params, front_end.abs());
        let note_statuses = vec![NoteStatus::default(); chart.notes.len()];
        Self {
            chart,
            params,
            front_end,
            back_end,
            timers,
            state: EngineState::new(),
            note_statuses,
            stats: EngineStats::default(),
            sink,
            oracle,
            profile_id,
            is_bot: false,
            input_queue: VecDeque::new(),
            auto_play: false,
            auto_strum: false,
            sp_engaged: false,
            sp_whammying: false,
        }
    }

    /// Have the engine synthesize ideal input for the current note
    /// instead of listening to the player.
    pub fn with_bot(mut self, is_bot: bool) -> Self {
        self.is_bot = is_bot;
        self
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn params(&self) -> &EngineParameters {
        &self.params
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    /// (front, back) bounds in seconds around each note time.
    pub fn hit_window_bounds(&self) -> (f64, f64) {
        (self.front_end, self.back_end)
    }

    pub fn was_note_hit(&self, index: usize) -> bool {
        self.note_statuses[index].was_hit
    }

    pub fn was_note_missed(&self, index: usize) -> bool {
        self.note_statuses[index].was_missed
    }

    /// Start the session over on the same chart and parameters.
    pub fn reset(&mut self) {
        self.state = EngineState::new();
        self.note_statuses.fill(NoteStatus::default());
        self.stats = EngineStats::default();
        self.timers = TimerSet::new(&self.params, self.front_end.abs());
        self.input_queue.clear();
        self.sp_engaged = false;
        self.sp_whammying = false;
    }

    /// Queue an input edge for the next tick. Inputs are kept in
    /// timestamp order regardless of arrival order.
    pub fn queue_input(&mut self, input: GameInput) {
        let pos = self
            .input_queue
            .partition_point(|queued| queued.time <= input.time);
        self.input_queue.insert(pos, input);
    }

    /// Advance the simulation to `time`: drain queued inputs in stamp
    /// order, evaluating the hit logic at each edge, then evaluate once
    /// at the tick time itself. Time must be monotonic within a session.
    pub fn update(&mut self, time: f64) {
        assert!(
            time >= self.state.current_time,
            "engine time went backwards: {} -> {}",
            self.state.current_time,
            time
        );
        self.auto_play = self.oracle.is_flag_set(self.profile_id, ProfileFlag::AutoPlay);
        self.auto_strum = self
            .oracle
            .is_flag_set(self.profile_id, ProfileFlag::AutoStrum);

        while let Some(input) = self.input_queue.front().copied() {
            if input.time > time {
                break;
            }
            self.input_queue.pop_front();
            // A late edge is folded at the engine's current time.
            let at = input.time.max(self.state.current_time);
            reduce_input(
                &mut self.state,
                &mut self.timers,
                &input,
                self.auto_play,
                self.auto_strum,
            );
            self.run_hit_logic_loop(at);
        }
        self.run_hit_logic_loop(time);
    }

    /// Repeat the evaluation pass until no step requests re-entry,
    /// bounded by the sanity cap.
    fn run_hit_logic_loop(&mut self, now: f64) {
        for pass in 0..MAX_HIT_LOGIC_PASSES {
            self.state.re_run_hit_logic = false;
            self.run_hit_logic(now);
            if !self.state.re_run_hit_logic {
                return;
            }
            if pass + 1 == MAX_HIT_LOGIC_PASSES {
                warn!("hit logic did not settle after {MAX_HIT_LOGIC_PASSES} passes at t={now:.3}");
            }
        }
    }

    fn run_hit_logic(&mut self, now: f64) {
        self.state.current_time = now;
        self.state.current_tick = self.chart.sync.time_to_tick(now);

        // Timers and star power resolve before anything reacts to
        // this frame's inputs.
        self.update_timers(now);
        self.update_star_power();

        if self.auto_play {
            // Unconditional cleanup, so an AutoPlay transition leaves
            // no residual player state behind.
            self.state.has_strummed = false;
            self.state.has_fretted = false;
            self.state.has_tapped = false;
            self.state.is_fret_press = false;
            self.state.was_note_ghosted = false;
            self.timers.strum_leniency.disable();
            self.timers.hopo_leniency.disable();
            self.timers.front_end.disable();
        } else {
            if !self.auto_strum {
                self.handle_strum_edge(now);
            }
            if self.is_bot {
                self.simulate_bot_input(now);
            }
            self.check_fretting(now);
        }

        self.scan_for_hits(now);

        self.update_sustains(now);

        // Per-frame flags reset; the tap and ghost flags persist until
        // the next hit or miss.
        if !self.auto_play {
            self.state.has_strummed = false;
            self.state.has_fretted = false;
            self.state.is_fret_press = false;
        }
    }

    fn update_timers(&mut self, now: f64) {
        if self.timers.hopo_leniency.is_active()
            && self.timers.hopo_leniency.is_expired(now)
            && !self.auto_play
        {
            self.timers.hopo_leniency.disable();
            self.state.re_run_hit_logic = true;
        }
        if self.timers.strum_leniency.is_active() && self.timers.strum_leniency.is_expired(now) {
            // A strum that never found a note is an overstrum, unless an
            // override gate owns strumming.
            if !self.auto_play && !self.auto_strum {
                self.overstrum();
            }
            self.timers.strum_leniency.disable();
            self.state.re_run_hit_logic = true;
        }
        if self.timers.chord_stagger.is_active() && self.timers.chord_stagger.is_expired(now) {
            self.timers.chord_stagger.disable();
            self.state.re_run_hit_logic = true;
        }
        if self.timers.star_power_whammy.is_active()
            && self.timers.star_power_whammy.is_expired(now)
        {
            self.timers.star_power_whammy.disable();
            self.state.re_run_hit_logic = true;
        }
        // The front-end timer is not expired here: its end time must stay
        // observable for the front-end validity check until a hit or miss
        // clears it.
    }

    fn update_star_power(&mut self) {
        let engaged = self.state.is_star_power_input_active;
        let whammying = self.timers.star_power_whammy.is_active();
        if (engaged, whammying) != (self.sp_engaged, self.sp_whammying) {
            self.sp_engaged = engaged;
            self.sp_whammying = whammying;
            self.sink.on_star_power_state_change(engaged, whammying);
        }
    }

    /// Strum edges either get eaten by HOPO leniency, stack into
    /// an overstrum, or arm the strum-leniency window.
    fn handle_strum_edge(&mut self, now: f64) {
        if !self.state.has_strummed {
            return;
        }
        if self.timers.hopo_leniency.is_active() {
            self.timers.hopo_leniency.disable();
            self.timers.strum_leniency.disable();
            self.state.re_run_hit_logic = true;
        } else if self.timers.strum_leniency.is_active() {
            self.overstrum();
            self.timers.strum_leniency.disable();
            self.state.re_run_hit_logic = true;
        } else {
            // Full leniency while the current note could still be hit;
            // only the small window once past its back end or out of
            // notes.
            let offset = match self.current_note() {
                Some((_, note)) if now <= note.time + self.back_end => 0.0,
                _ => self.params.strum_leniency - self.params.strum_leniency_small,
            };
            self.timers.strum_leniency.start_with_offset(now, offset);
            self.state.re_run_hit_logic = true;
        }
    }

    /// Ideal input for the current note: its fret pattern plus
    /// whatever extended sustains are still sounding.
    fn simulate_bot_input(&mut self, now: f64) {
        let Some((_, note)) = self.current_note() else {
            return;
        };
        if now < note.time {
            return;
        }
        let mut frets = note.fret_mask();
        for record in &self.state.active_sustains {
            let sustain_note = &self.chart.notes[record.note_index];
            if sustain_note.is_extended_sustain {
                frets |= sustain_note.sustain_mask() & FRET_MASK;
            }
        }
        self.state.last_button_mask = self.state.button_mask;
        self.state.button_mask = fret_state::normalize_buttons(frets);
        self.state.has_tapped = self.state.button_mask != self.state.last_button_mask;
        self.state.is_fret_press = true;
        self.state.has_strummed = true;
    }

    /// A fret edge near the current note arms the tap state and,
    /// with anti-ghosting on, the front-end window and the ghost check.
    fn check_fretting(&mut self, now: f64) {
        if !self.state.has_fretted {
            return;
        }
        let Some((_, note)) = self.current_note() else {
            return;
        };
        if now > note.time + self.back_end {
            return;
        }
        self.state.has_tapped = true;
        if !self.params.anti_ghosting {
            return;
        }
        self.timers.front_end.start(now);

        // Ghost: an upward hammer motion that fails to complete the
        // required pattern.
        let required = note.fret_mask();
        if self.state.is_fret_press
            && fret_state::highest_fret(self.state.button_mask)
                > fret_state::highest_fret(self.state.last_button_mask)
            && self.state.button_mask & required != required
        {
            self.state.was_note_ghosted = true;
            self.stats.ghost_inputs += 1;
            self.sink.on_ghost_input();
        }
    }

    /// Walk forward from the first pending note and resolve at
    /// most one hit or miss per pass.
    fn scan_for_hits(&mut self, now: f64) {
        let mut i = self.state.note_index;
        while i < self.chart.notes.len() {
            if self.note_statuses[i].is_dealt_with() {
                i += 1;
                continue;
            }
            let note = self.chart.notes[i];
            let first = i == self.state.note_index;
            let missed = now > note.time + self.back_end;
            let in_window = !missed && now >= note.time + self.front_end;

            if first && missed {
                self.miss_note(i);
                break;
            }
            if !in_window {
                if first {
                    // Too early; nothing beyond can be closer.
                    break;
                }
                i += 1;
                continue;
            }
            if self.auto_play {
                self.hit_note(i);
                break;
            }
            if !self.can_note_be_hit(&note) {
                if first {
                    break;
                }
                i += 1;
                continue;
            }

            let hopo_hit = note.is_hopo && (self.stats.combo > 0 || self.state.note_index == 0);
            let front_end_valid = self.params.infinite_front_end
                || !self.timers.front_end.is_active()
                || now <= self.timers.front_end.end_time()
                || self.state.note_index == 0;
            if self.state.has_tapped
                && (hopo_hit || note.is_tap)
                && front_end_valid
                && !self.state.was_note_ghosted
            {
                self.hit_note(i);
                break;
            }
            if first {
                if self.auto_strum
                    || self.state.has_strummed
                    || self.timers.strum_leniency.is_active()
                {
                    self.hit_note(i);
                }
                break;
            }
            i += 1;
        }
    }

    /// Whether the current buttons play `note`, with frets held for
    /// sounding extended sustains discounted.
    fn can_note_be_hit(&self, note: &GuitarNote) -> bool {
        if is_note_playable(self.state.button_mask, note.note_mask) {
            return true;
        }
        let mut sustain_frets = 0u8;
        for record in &self.state.active_sustains {
            let sustain_note = &self.chart.notes[record.note_index];
            if sustain_note.is_extended_sustain && !record.is_leniency_held {
                sustain_frets |= sustain_note.sustain_mask() & FRET_MASK;
            }
        }
        sustain_frets != 0
            && is_note_playable(
                strip_frets(self.state.button_mask, sustain_frets),
                note.note_mask,
            )
    }

    fn hit_note(&mut self, index: usize) {
        // A hit further up the chain deals with everything it skipped.
        while self.state.note_index < index {
            let skipped = self.state.note_index;
            self.miss_note(skipped);
        }
        let note = self.chart.notes[index];
        let now = self.state.current_time;

        if self.auto_play {
            self.timers.hopo_leniency.disable();
            self.timers.strum_leniency.disable();
            self.timers.front_end.disable();
            self.state.has_tapped = false;
        } else {
            if note.is_hopo || note.is_tap {
                self.state.has_tapped = false;
                self.timers.hopo_leniency.start(now);
            } else {
                self.timers.front_end.disable();
            }
            self.timers.strum_leniency.disable();
        }
        self.state.was_note_ghosted = false;

        // A hit on frets shared with a sounding sustain cuts it off.
        let mut pos = 0;
        while pos < self.state.active_sustains.len() {
            let record = self.state.active_sustains[pos];
            let sustain_note = self.chart.notes[record.note_index];
            if sustain_note.sustain_mask() & note.fret_mask() != 0 {
                let completed = self.state.current_tick >= sustain_note.tick_end;
                self.end_sustain_at(pos, completed);
            } else {
                pos += 1;
            }
        }

        self.note_statuses[index].was_hit = true;
        self.stats.notes_hit += 1;
        self.stats.combo += 1;
        self.stats.max_combo = self.stats.max_combo.max(self.stats.combo);
        self.sink.on_note_hit(index, &note);
        self.sink.on_combo_change(self.stats.combo);
        if note.is_sustain() {
            self.state.active_sustains.push(SustainRecord::new(index));
            self.sink.on_sustain_start(index, &note);
        }
        self.state.note_index = index + 1;
        self.state.re_run_hit_logic = true;
    }

    fn miss_note(&mut self, index: usize) {
        let note = self.chart.notes[index];
        self.state.has_tapped = false;
        self.state.was_note_ghosted = false;
        self.timers.hopo_leniency.disable();
        self.timers.strum_leniency.disable();
        self.timers.front_end.disable();

        self.note_statuses[index].was_missed = true;
        self.stats.notes_missed += 1;
        self.break_combo();
        self.sink.on_note_missed(index, &note);
        self.state.note_index = index + 1;
        self.state.re_run_hit_logic = true;
    }

    fn overstrum(&mut self) {
        // An overstrum cuts every sounding sustain.
        while !self.state.active_sustains.is_empty() {
            let record = self.state.active_sustains[0];
            let sustain_note = self.chart.notes[record.note_index];
            let completed = self.state.current_tick >= sustain_note.tick_end;
            self.end_sustain_at(0, completed);
        }
        self.stats.overstrums += 1;
        self.sink.on_overstrum();
        self.break_combo();
    }

    fn break_combo(&mut self) {
        if self.stats.combo != 0 {
            self.stats.combo = 0;
            self.sink.on_combo_change(0);
        }
    }

    /// End sustains that ran out or whose hold was released past
    /// the drop leniency.
    fn update_sustains(&mut self, now: f64) {
        let mut pos = 0;
        while pos < self.state.active_sustains.len() {
            let record = self.state.active_sustains[pos];
            let note = self.chart.notes[record.note_index];
            if note.tick_end <= self.state.current_tick {
                self.end_sustain_at(pos, true);
                continue;
            }
            let held = self.auto_play || can_sustain_hold(self.state.button_mask, &note);
            if held {
                self.state.active_sustains[pos].is_leniency_held = false;
                pos += 1;
                continue;
            }
            if !record.is_leniency_held {
                self.state.active_sustains[pos].is_leniency_held = true;
                self.state.active_sustains[pos].dropped_at = now;
            }
            if now - self.state.active_sustains[pos].dropped_at >= self.params.sustain_drop_leniency
            {
                self.end_sustain_at(pos, false);
            } else {
                pos += 1;
            }
        }
    }

    fn end_sustain_at(&mut self, pos: usize, completed: bool) {
        let record = self.state.active_sustains.remove(pos);
        let note = self.chart.notes[record.note_index];
        self.sink.on_sustain_end(record.note_index, &note, completed);
    }

    fn current_note(&self) -> Option<(usize, GuitarNote)> {
        let i = self.state.note_index;
        self.chart.notes.get(i).map(|note| (i, *note))
    }
}
