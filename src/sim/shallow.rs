// ============================================================================
// sim/shallow.rs - wavetank
// Linearized shallow water in a closed box. Steps in place: the three
// component fields are mutated by `advance` and there is nothing to swap.
// ============================================================================

use crate::field::{Field, FieldView};
use crate::sim::{deposit_gaussian, Simulation};

const GRAVITY: f32 = 0.5;
const DEPTH: f32 = 0.5;
const MOMENTUM_DAMPING: f32 = 0.3;
const RESEED_AMPLITUDE: f32 = 1.0;
const RESEED_RADIUS: f32 = 0.1;

/// Surface height `eta` plus the two momentum components, on a staggered
/// interpretation of one colocated grid: `etau[n]` lives between columns
/// `i` and `i+1`, `etav[n]` between rows `j` and `j+1`. Momenta on the far
/// walls are never written and stay zero, which closes the box.
pub struct ShallowWaterSim {
    eta: Field,
    etau: Field,
    etav: Field,
    width: u32,
    height: u32,
    inv_dx: f32,
    inv_dy: f32,
    /// The engine's own stability bound. The display step cap sits below
    /// it, so it only binds callers that hand in large steps directly.
    dt_cap: f32,
}

impl ShallowWaterSim {
    pub fn new(width: u32, height: u32) -> Self {
        let dx = 1.0 / (width - 1) as f32;
        let dy = 1.0 / (height - 1) as f32;
        let wave_speed = (GRAVITY * DEPTH).sqrt();
        Self {
            eta: Field::new(width, height),
            etau: Field::new(width, height),
            etav: Field::new(width, height),
            width,
            height,
            inv_dx: 1.0 / dx,
            inv_dy: 1.0 / dy,
            dt_cap: 0.6 * dx.min(dy) / wave_speed,
        }
    }

    /// Display step bound for this engine, tied to grid resolution.
    pub fn stable_dt(width: u32, height: u32) -> f32 {
        1.0 / width.max(height) as f32
    }
}

impl Simulation for ShallowWaterSim {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn output_names(&self) -> &'static [&'static str] {
        &["eta", "etau", "etav"]
    }

    fn set_initial(&mut self, _t: f32) {
        self.reseed(0.5, 0.5);
    }

    fn reseed(&mut self, x0: f32, y0: f32) {
        deposit_gaussian(&mut self.eta, x0, y0, RESEED_AMPLITUDE, RESEED_RADIUS);
        self.etau.fill(0.0);
        self.etav.fill(0.0);
    }

    fn advance(&mut self, dt: f32) {
        let dt = dt.min(self.dt_cap);
        let w = self.width as usize;
        let h = self.height as usize;
        let gdx = GRAVITY * self.inv_dx * dt;
        let gdy = GRAVITY * self.inv_dy * dt;
        let hdx = DEPTH * self.inv_dx * dt;
        let hdy = DEPTH * self.inv_dy * dt;
        let damp = 1.0 - MOMENTUM_DAMPING * dt;

        // Momentum kick from the current surface gradient.
        {
            let eta = self.eta.as_slice();
            let etau = self.etau.as_mut_slice();
            for j in 0..h {
                for i in 0..w - 1 {
                    let n = j * w + i;
                    etau[n] = damp * etau[n] - gdx * (eta[n + 1] - eta[n]);
                }
            }
        }
        {
            let eta = self.eta.as_slice();
            let etav = self.etav.as_mut_slice();
            for j in 0..h - 1 {
                for i in 0..w {
                    let n = j * w + i;
                    etav[n] = damp * etav[n] - gdy * (eta[n + w] - eta[n]);
                }
            }
        }

        // Height update from the divergence of the fresh momenta. Fluxes
        // through the walls are zero, so total height is conserved.
        {
            let etau = self.etau.as_slice();
            let etav = self.etav.as_slice();
            let eta = self.eta.as_mut_slice();
            for j in 0..h {
                for i in 0..w {
                    let n = j * w + i;
                    let du = etau[n] - if i > 0 { etau[n - 1] } else { 0.0 };
                    let dv = etav[n] - if j > 0 { etav[n - w] } else { 0.0 };
                    eta[n] -= hdx * du + hdy * dv;
                }
            }
        }
    }

    fn field(&self, output: usize) -> FieldView<'_> {
        match output {
            0 => self.eta.view(),
            1 => self.etau.view(),
            2 => self.etav.view(),
            _ => panic!("shallow water engine has no output {}", output),
        }
    }
}
