// ============================================================================
// clock.rs - wavetank
// Adaptive frame clock: converts host timestamps into bounded simulation
// steps and tracks how often the wall clock outruns the stability limit.
// ============================================================================

/// How the stored simulation timestamp advances across frames.
///
/// Both styles produce the same step sequence (up to float rounding) and
/// differ only in bookkeeping: `WallClock` re-derives the timestamp from
/// the host clock every frame, `SimTime` accumulates consumed simulation
/// time and resynchronizes to the host clock whenever a frame is clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeBase {
    /// Timestamp is the scaled host time, every frame.
    WallClock,
    /// Timestamp accumulates `dt` on unclamped frames and resyncs to the
    /// scaled host time on the first frame and after every clamp.
    SimTime,
}

/// One frame's step decision.
#[derive(Clone, Copy, Debug)]
pub struct FrameStep {
    /// Bounded simulation step for this frame, in simulation seconds.
    pub dt: f32,
    /// True when the raw frame gap met or exceeded the stability limit.
    pub overrun: bool,
}

/// Converts monotonic host timestamps into bounded simulation steps.
///
/// Host seconds are scaled by `time_scale` into simulation seconds, and
/// each step is clamped to `max_dt`, the engine's stability limit. Falling
/// behind real time is reported through `log::warn!` once per contiguous
/// overrun episode; within an episode the clock can only fall further
/// behind, so repeating the warning every frame would just be noise. The
/// latch re-arms as soon as one frame fits under the limit again.
pub struct FrameClock {
    time_base: TimeBase,
    time_scale: f64,
    max_dt: f32,
    /// Scaled simulation timestamp of the last frame.
    t: f64,
    first: bool,
    warned: bool,
    overrun_frames: u64,
    overrun_episodes: u32,
}

impl FrameClock {
    pub fn new(time_base: TimeBase, time_scale: f64, max_dt: f32) -> Self {
        assert!(time_scale > 0.0, "time scale must be positive");
        assert!(max_dt > 0.0, "stability limit must be positive");
        Self {
            time_base,
            time_scale,
            max_dt,
            t: 0.0,
            first: true,
            warned: false,
            overrun_frames: 0,
            overrun_episodes: 0,
        }
    }

    pub fn max_dt(&self) -> f32 {
        self.max_dt
    }

    /// Frames whose raw gap met or exceeded the stability limit.
    pub fn overrun_frames(&self) -> u64 {
        self.overrun_frames
    }

    /// Contiguous overrun episodes so far. Each was warned about exactly
    /// once.
    pub fn overrun_episodes(&self) -> u32 {
        self.overrun_episodes
    }

    /// Forget the last timestamp, so the next `tick` behaves like a first
    /// frame. Called when the caller knowingly stopped ticking (pause),
    /// where the gap is expected and not worth an overrun warning.
    pub fn resync(&mut self) {
        self.first = true;
    }

    /// Advance the clock to host timestamp `now` (monotonic seconds) and
    /// return the bounded step for this frame.
    pub fn tick(&mut self, now: f64) -> FrameStep {
        let scaled = now * self.time_scale;
        let raw_dt = scaled - self.t;

        // First frame, a resync, or a non-monotonic host clock: there is
        // no usable gap, so take one full stable step and resynchronize.
        if self.first || raw_dt <= 0.0 {
            self.first = false;
            self.warned = false;
            self.t = scaled;
            return FrameStep {
                dt: self.max_dt,
                overrun: false,
            };
        }

        if raw_dt >= f64::from(self.max_dt) {
            self.overrun_frames += 1;
            if !self.warned {
                self.warned = true;
                self.overrun_episodes += 1;
                log::warn!(
                    "simulation is falling behind real time (frame gap {:.4}s >= limit {:.4}s), clamping",
                    raw_dt,
                    self.max_dt
                );
            }
            // Both accumulation styles resynchronize after a clamp; the
            // skipped simulation time is dropped, not caught up.
            self.t = scaled;
            return FrameStep {
                dt: self.max_dt,
                overrun: true,
            };
        }

        self.warned = false;
        let dt = raw_dt as f32;
        match self.time_base {
            TimeBase::WallClock => self.t = scaled,
            TimeBase::SimTime => self.t += f64::from(dt),
        }
        FrameStep { dt, overrun: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const MAX_DT: f32 = 0.01;

    fn clock(base: TimeBase) -> FrameClock {
        FrameClock::new(base, 1.0, MAX_DT)
    }

    #[test]
    fn first_frame_takes_one_full_stable_step() {
        let mut clock = clock(TimeBase::SimTime);
        let step = clock.tick(123.456);
        assert_eq!(step.dt, MAX_DT);
        assert!(!step.overrun);
        assert_eq!(clock.overrun_episodes(), 0);
    }

    #[test]
    fn small_gaps_pass_through_unclamped() {
        let mut clock = clock(TimeBase::SimTime);
        clock.tick(0.0);
        let step = clock.tick(0.005);
        assert_relative_eq!(step.dt, 0.005, epsilon = 1e-9);
        assert!(!step.overrun);
    }

    #[test]
    fn stall_warns_once_per_episode() {
        // Timestamps 0, 0.005, 1.0: the long stall is clamped and counted
        // as exactly one episode no matter how many frames it spans.
        let mut clock = clock(TimeBase::SimTime);
        clock.tick(0.0);
        clock.tick(0.005);
        let step = clock.tick(1.0);
        assert_eq!(step.dt, MAX_DT);
        assert!(step.overrun);
        assert_eq!(clock.overrun_episodes(), 1);

        // Still inside the same episode.
        let step = clock.tick(2.0);
        assert!(step.overrun);
        assert_eq!(clock.overrun_episodes(), 1);
        assert_eq!(clock.overrun_frames(), 2);

        // One healthy frame re-arms the latch.
        clock.tick(2.005);
        let step = clock.tick(3.0);
        assert!(step.overrun);
        assert_eq!(clock.overrun_episodes(), 2);
    }

    #[test]
    fn gap_exactly_at_the_limit_is_clamped() {
        let mut clock = clock(TimeBase::WallClock);
        clock.tick(0.0);
        let step = clock.tick(f64::from(MAX_DT));
        assert_eq!(step.dt, MAX_DT);
        assert!(step.overrun);
    }

    #[test]
    fn non_monotonic_timestamp_resynchronizes() {
        let mut clock = clock(TimeBase::WallClock);
        clock.tick(5.0);
        clock.tick(5.004);
        let step = clock.tick(4.0);
        assert_eq!(step.dt, MAX_DT);
        assert!(!step.overrun);
        // Gaps are measured from the resynchronized timestamp.
        let step = clock.tick(4.006);
        assert_relative_eq!(step.dt, 0.006, epsilon = 1e-9);
    }

    #[test]
    fn resync_suppresses_the_pause_gap() {
        let mut clock = clock(TimeBase::SimTime);
        clock.tick(0.0);
        clock.tick(0.004);
        clock.resync();
        // A long pause gap arrives, but it was announced via resync.
        let step = clock.tick(60.0);
        assert_eq!(step.dt, MAX_DT);
        assert!(!step.overrun);
        assert_eq!(clock.overrun_episodes(), 0);
    }

    #[test]
    fn time_scale_compresses_host_seconds() {
        let mut clock = FrameClock::new(TimeBase::WallClock, 1.0 / 7.0, MAX_DT);
        clock.tick(0.0);
        // 35ms of host time is 5ms of simulation time.
        let step = clock.tick(0.035);
        assert_relative_eq!(step.dt, 0.005, epsilon = 1e-9);
        assert!(!step.overrun);
    }

    #[test]
    fn both_time_bases_produce_the_same_steps() {
        let stamps = [
            0.0, 0.016, 0.031, 0.047, 0.9, 0.905, 0.9112, 0.918, 2.0, 2.007,
        ];
        let mut wall = clock(TimeBase::WallClock);
        let mut sim = clock(TimeBase::SimTime);
        for &now in &stamps {
            let a = wall.tick(now);
            let b = sim.tick(now);
            assert_relative_eq!(a.dt, b.dt, epsilon = 1e-6);
            assert_eq!(a.overrun, b.overrun);
        }
        assert_eq!(wall.overrun_episodes(), sim.overrun_episodes());
    }
}
