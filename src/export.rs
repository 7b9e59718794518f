// ============================================================================
// export.rs - wavetank
// Saves a field view as a normalized heatmap PNG. This reads the CPU-side
// samples directly, so it works identically in windowed and headless runs.
// ============================================================================

use std::path::{Path, PathBuf};

use crate::field::FieldView;

const COLD: [f32; 3] = [0.05, 0.05, 0.25];
const HOT: [f32; 3] = [1.0, 0.9, 0.6];

/// Write `view` to `path` as an RGB PNG, one pixel per sample, normalized
/// over the view's own min/max. The image is flipped vertically so it
/// matches the on-screen orientation, where row 0 sits at the bottom.
pub fn save_field_png(view: FieldView<'_>, path: &Path) -> Result<(), String> {
    if view.samples().iter().any(|s| !s.is_finite()) {
        return Err(String::from("field contains non-finite samples"));
    }
    let (lo, hi) = view.min_max();
    let span = (hi - lo).max(f32::EPSILON);

    let mut pixels = Vec::with_capacity(view.len() * 3);
    for j in (0..view.height()).rev() {
        for i in 0..view.width() {
            let t = ((view.sample(i, j) - lo) / span).clamp(0.0, 1.0);
            for c in 0..3 {
                let v = COLD[c] + (HOT[c] - COLD[c]) * t;
                pixels.push((v * 255.0).round() as u8);
            }
        }
    }

    image::save_buffer(
        path,
        &pixels,
        view.width(),
        view.height(),
        image::ColorType::Rgb8,
    )
    .map_err(|e| format!("failed to write {}: {}", path.display(), e))
}

/// Timestamped output path in `dir`, named after the exported field.
pub fn timestamped_path(dir: &Path, field_name: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("wavetank_{}_{}.png", field_name, stamp))
}
