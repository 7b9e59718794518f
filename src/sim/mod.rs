// ============================================================================
// sim/mod.rs - wavetank
// Engine boundary: the frame pipeline drives any field simulation through
// this trait, whether it double-buffers or steps in place.
// ============================================================================

pub mod shallow;
pub mod wave;

pub use shallow::ShallowWaterSim;
pub use wave::WaveSim;

use crate::field::{Field, FieldView};

/// A CPU-resident field simulation the frame pipeline can drive.
///
/// The pipeline takes exactly one step per display frame: `advance(dt)`
/// integrates, `field()` exposes the selected output for upload, and
/// `swap()` flips buffer roles where the engine double-buffers (in-place
/// engines keep the default no-op). Because `field()` borrows the engine
/// and both `advance` and `swap` need `&mut`, a view taken this frame
/// cannot survive into the next step.
pub trait Simulation {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Output fields in display order. The selection cycles over these.
    fn output_names(&self) -> &'static [&'static str];

    /// Seed the session's starting condition at simulation time `t`.
    fn set_initial(&mut self, t: f32);

    /// Re-deposit the initial disturbance around a normalized point in
    /// `[0,1] x [0,1]`. Idempotent, and callable between any two steps.
    fn reseed(&mut self, x0: f32, y0: f32);

    /// Integrate one step. `dt` has already been bounded by the frame
    /// clock; engines with a tighter internal limit clamp again.
    fn advance(&mut self, dt: f32);

    /// Flip buffer roles after the frame that displayed the pre-step
    /// state. No-op for engines that step in place.
    fn swap(&mut self) {}

    /// Borrowed view of the named output. Refetched every frame; panics
    /// if `output` is out of range for `output_names()`.
    fn field(&self, output: usize) -> FieldView<'_>;
}

/// Overwrite `field` with a Gaussian bump of the given peak `amplitude`,
/// centered at the normalized point `(x0, y0)` with e-folding radius
/// `radius` (also in normalized units).
pub(crate) fn deposit_gaussian(field: &mut Field, x0: f32, y0: f32, amplitude: f32, radius: f32) {
    let width = field.width();
    let height = field.height();
    let inv_r2 = 1.0 / (radius * radius);
    let data = field.as_mut_slice();
    for j in 0..height {
        let y = j as f32 / (height - 1) as f32;
        for i in 0..width {
            let x = i as f32 / (width - 1) as f32;
            let dx = x - x0;
            let dy = y - y0;
            data[(j * width + i) as usize] = amplitude * (-(dx * dx + dy * dy) * inv_r2).exp();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gaussian_peaks_at_its_center() {
        let mut field = Field::new(41, 41);
        deposit_gaussian(&mut field, 0.5, 0.5, 2.0, 0.1);
        let peak = field.view().sample(20, 20);
        assert_relative_eq!(peak, 2.0, epsilon = 1e-6);
        // Corners are several radii away and essentially flat.
        assert!(field.view().sample(0, 0).abs() < 1e-6);
    }

    #[test]
    fn gaussian_overwrites_previous_contents() {
        let mut field = Field::new(17, 17);
        field.fill(123.0);
        deposit_gaussian(&mut field, 0.25, 0.75, 1.0, 0.1);
        assert!(field.view().min_max().1 <= 1.0 + 1e-6);
    }
}
