use serde::{Deserialize, Serialize};

/// Fallback tempo when a chart carries no tempo events.
pub const DEFAULT_BPM: f64 = 120.0;

/// A tempo event on the beat grid. `time` is derived from the preceding
/// segments and recomputed after deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    pub tick: u32,
    pub bpm: f64,
    #[serde(default)]
    pub time: f64,
}

/// Tick <-> time mapping shared by every tick-stamped consumer.
///
/// Conversion is piecewise linear: a lower-bound lookup finds the segment
/// containing the query, then the segment's tempo interpolates within it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncTrack {
    /// Ticks per beat.
    pub resolution: u32,
    changes: Vec<TempoChange>,
}

impl SyncTrack {
    /// Build a sync track from (tick, bpm) pairs sorted by tick.
    /// A change at tick 0 is synthesized if the chart starts later.
    pub fn new(resolution: u32, tempos: &[(u32, f64)]) -> Self {
        let changes = tempos
            .iter()
            .map(|&(tick, bpm)| TempoChange {
                tick,
                bpm,
                time: 0.0,
            })
            .collect();
        let mut track = Self {
            resolution: resolution.max(1),
            changes,
        };
        track.recompute_times();
        track
    }

    /// Constant-tempo track.
    pub fn with_bpm(resolution: u32, bpm: f64) -> Self {
        Self::new(resolution, &[(0, bpm)])
    }

    /// Recompute the derived `time` of every change. Called by `new` and
    /// after deserializing a chart.
    pub fn recompute_times(&mut self) {
        if self.changes.is_empty() {
            self.changes.push(TempoChange {
                tick: 0,
                bpm: DEFAULT_BPM,
                time: 0.0,
            });
        }
        if self.changes[0].tick != 0 {
            let bpm = self.changes[0].bpm;
            self.changes.insert(
                0,
                TempoChange {
                    tick: 0,
                    bpm,
                    time: 0.0,
                },
            );
        }
        self.changes[0].time = 0.0;
        for i in 1..self.changes.len() {
            let prev = self.changes[i - 1];
            let ticks = (self.changes[i].tick - prev.tick) as f64;
            self.changes[i].time = prev.time + ticks / self.resolution as f64 * 60.0 / prev.bpm;
        }
    }

    /// Segment whose tick range contains `tick` (lower bound).
    fn change_at_tick(&self, tick: u32) -> &TempoChange {
        let idx = self.changes.partition_point(|c| c.tick <= tick);
        &self.changes[idx.saturating_sub(1)]
    }

    /// Segment whose time range contains `time` (lower bound).
    fn change_at_time(&self, time: f64) -> &TempoChange {
        let idx = self.changes.partition_point(|c| c.time <= time);
        &self.changes[idx.saturating_sub(1)]
    }

    /// Convert a grid position to seconds.
    pub fn tick_to_time(&self, tick: u32) -> f64 {
        let change = self.change_at_tick(tick);
        let ticks = (tick - change.tick) as f64;
        change.time + ticks / self.resolution as f64 * 60.0 / change.bpm
    }

    /// Convert seconds to a grid position. Times before the chart start
    /// map to tick 0.
    pub fn time_to_tick(&self, time: f64) -> u32 {
        if time <= 0.0 {
            return 0;
        }
        let change = self.change_at_time(time);
        let beats = (time - change.time) * change.bpm / 60.0;
        change.tick + (beats * self.resolution as f64) as u32
    }

    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_tempo_round_trip() {
        // 120 BPM, 480 res: one beat = 0.5s = 480 ticks.
        let sync = SyncTrack::with_bpm(480, 120.0);
        assert_eq!(sync.tick_to_time(0), 0.0);
        assert_eq!(sync.tick_to_time(480), 0.5);
        assert_eq!(sync.tick_to_time(960), 1.0);
        assert_eq!(sync.time_to_tick(1.0), 960);
        assert_eq!(sync.time_to_tick(0.25), 240);
    }

    #[test]
    fn tempo_change_shifts_mapping() {
        // 120 BPM for two beats, then 240 BPM.
        let sync = SyncTrack::new(480, &[(0, 120.0), (960, 240.0)]);
        assert_eq!(sync.tick_to_time(960), 1.0);
        // One beat past the change takes 0.25s at 240 BPM.
        assert!((sync.tick_to_time(1440) - 1.25).abs() < 1e-9);
        assert_eq!(sync.time_to_tick(1.25), 1440);
    }

    #[test]
    fn missing_leading_change_is_synthesized() {
        let sync = SyncTrack::new(480, &[(960, 60.0)]);
        // The synthesized segment reuses the first bpm.
        assert_eq!(sync.changes()[0].tick, 0);
        assert_eq!(sync.changes()[0].bpm, 60.0);
        assert_eq!(sync.tick_to_time(480), 1.0);
    }

    #[test]
    fn empty_track_uses_default_bpm() {
        let sync = SyncTrack::new(480, &[]);
        assert_eq!(sync.changes()[0].bpm, DEFAULT_BPM);
        assert_eq!(sync.tick_to_time(480), 0.5);
    }

    #[test]
    fn negative_time_clamps_to_zero() {
        let sync = SyncTrack::with_bpm(480, 120.0);
        assert_eq!(sync.time_to_tick(-1.0), 0);
    }
}
