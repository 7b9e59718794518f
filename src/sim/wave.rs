// ============================================================================
// sim/wave.rs - wavetank
// Scalar wave equation on a unit rectangle. Double-buffered: each step
// reads one state slot and writes the other, and the roles flip after the
// frame that displayed the old slot.
// ============================================================================

use crate::field::{Field, FieldView};
use crate::sim::{deposit_gaussian, Simulation};

/// Display step cap on the stock grids. Denser grids get a lower cap
/// from `stable_dt`, which tracks the integrator's own limit.
pub const STABLE_DT: f32 = 0.01;

const WAVE_SPEED: f32 = 1.0;
const RESEED_AMPLITUDE: f32 = 1.0;
const RESEED_RADIUS: f32 = 0.08;

/// Largest step velocity Verlet tolerates on this grid, with margin.
/// The stiffest mode on the unit rectangle has
/// `omega = 2c * sqrt((w-1)^2 + (h-1)^2)` and stays bounded while
/// `omega * dt <= 2`.
fn verlet_cap(width: u32, height: u32) -> f32 {
    let wx = (width - 1) as f32;
    let wy = (height - 1) as f32;
    let omega_max = 2.0 * WAVE_SPEED * (wx * wx + wy * wy).sqrt();
    1.7 / omega_max
}

/// One complete wave state: displacement and its time derivative.
struct WaveState {
    u: Field,
    v: Field,
}

impl WaveState {
    fn new(width: u32, height: u32) -> Self {
        Self {
            u: Field::new(width, height),
            v: Field::new(width, height),
        }
    }
}

/// `u_tt = c^2 (u_xx + u_yy)` with frozen boundary samples, integrated
/// with velocity Verlet. The two state slots are allocated once; `advance`
/// writes the off slot through preallocated scratch and `swap` flips which
/// slot is current. No allocation after construction.
pub struct WaveSim {
    slots: [WaveState; 2],
    current: usize,
    /// Half-kicked velocity, reused every step.
    scratch_v: Field,
    width: u32,
    height: u32,
    c2: f32,
    inv_dx2: f32,
    inv_dy2: f32,
    /// The integrator's stability bound for this grid. The display step
    /// cap sits at or below it, so it only binds callers that hand in
    /// large steps directly.
    dt_cap: f32,
}

impl WaveSim {
    pub fn new(width: u32, height: u32) -> Self {
        let dx = 1.0 / (width - 1) as f32;
        let dy = 1.0 / (height - 1) as f32;
        Self {
            slots: [WaveState::new(width, height), WaveState::new(width, height)],
            current: 0,
            scratch_v: Field::new(width, height),
            width,
            height,
            c2: WAVE_SPEED * WAVE_SPEED,
            inv_dx2: 1.0 / (dx * dx),
            inv_dy2: 1.0 / (dy * dy),
            dt_cap: verlet_cap(width, height),
        }
    }

    /// Step bound for this grid size: the stock display cap or the
    /// integrator's own limit, whichever is lower.
    pub fn stable_dt(width: u32, height: u32) -> f32 {
        STABLE_DT.min(verlet_cap(width, height))
    }

    /// Index of the slot currently exposed through `field`.
    #[cfg(test)]
    pub fn cur(&self) -> usize {
        self.current
    }
}

#[inline]
fn laplacian(u: &[f32], n: usize, w: usize, inv_dx2: f32, inv_dy2: f32) -> f32 {
    (u[n - 1] - 2.0 * u[n] + u[n + 1]) * inv_dx2
        + (u[n - w] - 2.0 * u[n] + u[n + w]) * inv_dy2
}

impl Simulation for WaveSim {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn output_names(&self) -> &'static [&'static str] {
        &["u"]
    }

    /// Traveling harmonic sheet evaluated at time `t`. Displacement and
    /// velocity are seeded consistently, so the pattern moves instead of
    /// standing still.
    fn set_initial(&mut self, t: f32) {
        let width = self.width;
        let height = self.height;
        let tau = std::f32::consts::TAU;
        let slot = &mut self.slots[self.current];
        let u = slot.u.as_mut_slice();
        let v = slot.v.as_mut_slice();
        for j in 0..height {
            let y = j as f32 / (height - 1) as f32;
            for i in 0..width {
                let x = i as f32 / (width - 1) as f32;
                let px = tau * (x - t);
                let py = tau * (y - t);
                let n = (j * width + i) as usize;
                u[n] = 0.5 * (px.sin() + py.cos());
                v[n] = 0.5 * tau * (py.sin() - px.cos());
            }
        }
    }

    fn reseed(&mut self, x0: f32, y0: f32) {
        let slot = &mut self.slots[self.current];
        deposit_gaussian(&mut slot.u, x0, y0, RESEED_AMPLITUDE, RESEED_RADIUS);
        slot.v.fill(0.0);
    }

    fn advance(&mut self, dt: f32) {
        let dt = dt.min(self.dt_cap);
        let half_kick = 0.5 * dt * self.c2;
        let w = self.width as usize;
        let h = self.height as usize;
        let inv_dx2 = self.inv_dx2;
        let inv_dy2 = self.inv_dy2;

        let (head, tail) = self.slots.split_at_mut(1);
        let (cur, next) = if self.current == 0 {
            (&head[0], &mut tail[0])
        } else {
            (&tail[0], &mut head[0])
        };
        let cur_u = cur.u.as_slice();
        let cur_v = cur.v.as_slice();

        // Half kick: vh = v + (dt/2) c^2 lap(u). Boundary samples carry
        // over unchanged, here and below.
        let vh = self.scratch_v.as_mut_slice();
        vh.copy_from_slice(cur_v);
        for j in 1..h - 1 {
            for i in 1..w - 1 {
                let n = j * w + i;
                vh[n] = cur_v[n] + half_kick * laplacian(cur_u, n, w, inv_dx2, inv_dy2);
            }
        }

        // Drift: u' = u + dt vh.
        let next_u = next.u.as_mut_slice();
        next_u.copy_from_slice(cur_u);
        for j in 1..h - 1 {
            for i in 1..w - 1 {
                let n = j * w + i;
                next_u[n] = cur_u[n] + dt * vh[n];
            }
        }

        // Second half kick against the drifted field.
        let next_u = next.u.as_slice();
        let next_v = next.v.as_mut_slice();
        next_v.copy_from_slice(vh);
        for j in 1..h - 1 {
            for i in 1..w - 1 {
                let n = j * w + i;
                next_v[n] = vh[n] + half_kick * laplacian(next_u, n, w, inv_dx2, inv_dy2);
            }
        }
    }

    fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    fn field(&self, output: usize) -> FieldView<'_> {
        assert!(
            output < self.output_names().len(),
            "wave engine has no output {}",
            output
        );
        self.slots[self.current].u.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn one_step_changes_the_displayed_field() {
        let mut sim = WaveSim::new(40, 50);
        sim.set_initial(0.0);
        let before: Vec<f32> = sim.field(0).samples().to_vec();
        assert_eq!(before.len(), 2000);

        sim.advance(0.01);
        sim.swap();

        let after = sim.field(0);
        assert_eq!(after.len(), 2000);
        let changed = after
            .samples()
            .iter()
            .zip(&before)
            .filter(|(a, b)| a != b)
            .count();
        assert!(changed > 0, "advance left every sample untouched");
    }

    #[test]
    fn swap_alternates_between_two_stable_slots() {
        let mut sim = WaveSim::new(16, 16);
        sim.set_initial(0.0);
        let p0 = sim.field(0).samples().as_ptr() as usize;
        sim.advance(0.01);
        sim.swap();
        let p1 = sim.field(0).samples().as_ptr() as usize;
        sim.advance(0.01);
        sim.swap();
        let p2 = sim.field(0).samples().as_ptr() as usize;

        assert_ne!(p0, p1, "swap must change which slot is displayed");
        assert_eq!(p0, p2, "slots must alternate without reallocating");
        assert_eq!(sim.cur(), 0);
    }

    #[test]
    fn view_shows_the_pre_step_state_until_swap() {
        let mut sim = WaveSim::new(16, 16);
        sim.set_initial(0.0);
        let before: Vec<f32> = sim.field(0).samples().to_vec();
        sim.advance(0.01);
        // Roles have not flipped yet, so the displayed field is untouched.
        assert_eq!(sim.field(0).samples(), &before[..]);
        sim.swap();
        assert_ne!(sim.field(0).samples(), &before[..]);
    }

    #[test]
    fn reseed_is_idempotent() {
        let mut sim = WaveSim::new(24, 24);
        sim.set_initial(0.0);
        sim.advance(0.01);
        sim.swap();
        sim.reseed(0.3, 0.7);
        let once: Vec<f32> = sim.field(0).samples().to_vec();
        sim.reseed(0.3, 0.7);
        assert_eq!(sim.field(0).samples(), &once[..]);
    }

    #[test]
    fn boundary_samples_stay_frozen() {
        let mut sim = WaveSim::new(20, 20);
        sim.set_initial(0.25);
        let corner = sim.field(0).sample(0, 0);
        let edge = sim.field(0).sample(10, 0);
        for _ in 0..25 {
            sim.advance(0.01);
            sim.swap();
        }
        assert_relative_eq!(sim.field(0).sample(0, 0), corner);
        assert_relative_eq!(sim.field(0).sample(10, 0), edge);
    }

    #[test]
    fn long_run_stays_bounded() {
        let mut sim = WaveSim::new(40, 50);
        sim.set_initial(0.0);
        for _ in 0..1000 {
            sim.advance(STABLE_DT);
            sim.swap();
        }
        assert!(sim.field(0).samples().iter().all(|s| s.is_finite()));
        let (lo, hi) = sim.field(0).min_max();
        assert!(hi < 10.0 && lo > -10.0, "integration diverged: [{lo}, {hi}]");
    }

    #[test]
    fn step_bound_tightens_with_grid_resolution() {
        // Stock grids keep the tuned cap.
        assert_eq!(WaveSim::stable_dt(40, 50), STABLE_DT);
        // Denser grids drop below it and stay inside the Verlet window.
        let dt = WaveSim::stable_dt(300, 300);
        assert!(dt < STABLE_DT);
        let omega_max = 2.0 * WAVE_SPEED * (2.0f32 * 299.0 * 299.0).sqrt();
        assert!(omega_max * dt <= 2.0);
    }

    #[test]
    fn dense_grid_stays_stable_under_the_stock_cap() {
        // At this density the stock cap exceeds the integrator's bound
        // several times over, so advance must clamp it.
        let mut sim = WaveSim::new(300, 300);
        sim.set_initial(0.0);
        for _ in 0..150 {
            sim.advance(STABLE_DT);
            sim.swap();
        }
        assert!(sim.field(0).samples().iter().all(|s| s.is_finite()));
        let (lo, hi) = sim.field(0).min_max();
        assert!(hi < 10.0 && lo > -10.0, "integration diverged: [{lo}, {hi}]");
    }
}
