use crate::engine::parameters::EngineParameters;

/// A countdown timer keyed by the absolute time it runs out.
///
/// The configured length is fixed per session; `start_with_offset`
/// shortens a single activation, which is how the small strum-leniency
/// window is expressed.
#[derive(Debug, Clone, Copy)]
pub struct EngineTimer {
    length: f64,
    end_time: f64,
    active: bool,
}

impl EngineTimer {
    pub fn new(length: f64) -> Self {
        Self {
            length,
            end_time: 0.0,
            active: false,
        }
    }

    /// Arm the timer for its full length.
    pub fn start(&mut self, now: f64) {
        self.start_with_offset(now, 0.0);
    }

    /// Arm the timer with its window shortened by `offset` seconds.
    pub fn start_with_offset(&mut self, now: f64, offset: f64) {
        self.end_time = now + (self.length - offset).max(0.0);
        self.active = true;
    }

    pub fn disable(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Pure time comparison; callers pair this with `is_active`.
    pub fn is_expired(&self, now: f64) -> bool {
        now >= self.end_time
    }

    /// Absolute expiry time of the current activation. Stale once the
    /// timer is disabled.
    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn length(&self) -> f64 {
        self.length
    }
}

/// The engine's named timers.
#[derive(Debug, Clone)]
pub struct TimerSet {
    pub strum_leniency: EngineTimer,
    pub hopo_leniency: EngineTimer,
    pub star_power_whammy: EngineTimer,
    pub chord_stagger: EngineTimer,
    /// Anti-ghost front-end leniency; its end time is the absolute stamp
    /// at which a fret press stops counting toward an upcoming tap hit.
    pub front_end: EngineTimer,
}

impl TimerSet {
    /// `front_end_length` is the magnitude of the hit window's front end,
    /// computed once the window width is known.
    pub fn new(params: &EngineParameters, front_end_length: f64) -> Self {
        Self {
            strum_leniency: EngineTimer::new(params.strum_leniency),
            hopo_leniency: EngineTimer::new(params.hopo_leniency),
            star_power_whammy: EngineTimer::new(params.star_power_whammy_buffer),
            chord_stagger: EngineTimer::new(params.chord_stagger_window),
            front_end: EngineTimer::new(front_end_length),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_timer_is_inactive() {
        let timer = EngineTimer::new(0.07);
        assert!(!timer.is_active());
        assert_eq!(timer.end_time(), 0.0);
    }

    #[test]
    fn start_sets_end_time() {
        let mut timer = EngineTimer::new(0.07);
        timer.start(1.0);
        assert!(timer.is_active());
        assert!((timer.end_time() - 1.07).abs() < 1e-9);
        assert!(!timer.is_expired(1.05));
        assert!(timer.is_expired(1.07));
        assert!(timer.is_expired(1.2));
    }

    #[test]
    fn offset_shortens_window() {
        let mut timer = EngineTimer::new(0.07);
        timer.start_with_offset(1.0, 0.045);
        assert!((timer.end_time() - 1.025).abs() < 1e-9);
    }

    #[test]
    fn offset_never_goes_negative() {
        let mut timer = EngineTimer::new(0.07);
        timer.start_with_offset(1.0, 0.2);
        assert_eq!(timer.end_time(), 1.0);
        assert!(timer.is_expired(1.0));
    }

    #[test]
    fn disable_keeps_end_time() {
        let mut timer = EngineTimer::new(0.07);
        timer.start(1.0);
        timer.disable();
        assert!(!timer.is_active());
        // End time is stale but preserved for diagnostics.
        assert!((timer.end_time() - 1.07).abs() < 1e-9);
    }

    #[test]
    fn timer_set_lengths_follow_parameters() {
        let params = EngineParameters::default();
        let timers = TimerSet::new(&params, 0.14);
        assert_eq!(timers.strum_leniency.length(), params.strum_leniency);
        assert_eq!(timers.hopo_leniency.length(), params.hopo_leniency);
        assert_eq!(timers.front_end.length(), 0.14);
    }
}
