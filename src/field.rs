// ============================================================================
// field.rs - wavetank
// Row-major f32 grid storage and the borrowed per-frame window handed to
// the GPU upload path.
// ============================================================================

/// A fixed-size 2D grid of scalar samples, row-major.
///
/// Dimensions are set at construction and the backing storage is never
/// reallocated, so the sample count is `width * height` for the whole
/// session.
pub struct Field {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Field {
    pub fn new(width: u32, height: u32) -> Self {
        assert!(
            width >= 2 && height >= 2,
            "field needs at least 2x2 samples, got {}x{}",
            width,
            height
        );
        let samples = u64::from(width) * u64::from(height);
        Self {
            width,
            height,
            data: vec![0.0; samples as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    pub fn view(&self) -> FieldView<'_> {
        FieldView::new(&self.data, self.width, self.height)
    }
}

/// Non-owning window over exactly one field's worth of samples.
///
/// A view borrows the owning simulation, and advancing or swapping needs
/// `&mut`, so a view can never be read after the step that would have
/// invalidated it. Views are cheap and are reconstructed every frame.
#[derive(Clone, Copy)]
pub struct FieldView<'a> {
    samples: &'a [f32],
    width: u32,
    height: u32,
}

impl<'a> FieldView<'a> {
    /// Precondition: `samples.len() == width * height`.
    pub fn new(samples: &'a [f32], width: u32, height: u32) -> Self {
        assert_eq!(
            samples.len() as u64,
            u64::from(width) * u64::from(height),
            "field view over {} samples does not match {}x{}",
            samples.len(),
            width,
            height
        );
        Self {
            samples,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    /// Sample at cell `(x, y)`.
    #[inline]
    pub fn sample(&self, x: u32, y: u32) -> f32 {
        self.samples[(y * self.width + x) as usize]
    }

    /// The raw little-endian bytes of the samples, reinterpreted in place
    /// for GPU upload. No copy.
    pub fn as_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.samples)
    }

    /// Minimum and maximum sample, for normalized export.
    ///
    /// Any non-finite sample poisons the result to `(NaN, NaN)`, so a
    /// diverged field cannot report the range of whatever cells stayed
    /// finite.
    pub fn min_max(&self) -> (f32, f32) {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for &s in self.samples {
            if !s.is_finite() {
                return (f32::NAN, f32::NAN);
            }
            if s < lo {
                lo = s;
            }
            if s > hi {
                hi = s;
            }
        }
        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_allocates_width_times_height_samples() {
        let field = Field::new(40, 50);
        assert_eq!(field.as_slice().len(), 2000);
        assert_eq!(field.view().len(), 2000);
    }

    #[test]
    fn storage_is_row_major() {
        let mut field = Field::new(4, 3);
        field.as_mut_slice()[4 + 2] = 7.5;
        assert_eq!(field.view().sample(2, 1), 7.5);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn view_with_mismatched_count_panics() {
        let samples = vec![0.0f32; 12];
        let _ = FieldView::new(&samples, 4, 4);
    }

    #[test]
    fn view_bytes_cover_every_sample() {
        let field = Field::new(8, 8);
        let view = field.view();
        assert_eq!(view.as_bytes().len(), 64 * std::mem::size_of::<f32>());
    }

    #[test]
    fn min_max_spans_the_samples() {
        let mut field = Field::new(2, 2);
        field.as_mut_slice().copy_from_slice(&[-1.5, 0.0, 3.0, 0.25]);
        assert_eq!(field.view().min_max(), (-1.5, 3.0));
    }

    #[test]
    fn min_max_poisons_on_non_finite_samples() {
        let mut field = Field::new(4, 4);
        field.as_mut_slice()[5] = f32::NAN;
        let (lo, hi) = field.view().min_max();
        assert!(lo.is_nan() && hi.is_nan());

        field.as_mut_slice()[5] = f32::INFINITY;
        let (lo, hi) = field.view().min_max();
        assert!(lo.is_nan() && hi.is_nan());
    }
}
