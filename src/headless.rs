// ============================================================================
// headless.rs - wavetank
// Headless batch runner: drives the frame pipeline with synthetic
// timestamps, no window and no GPU, then optionally exports the final
// field and a JSON run summary.
// ============================================================================

use std::path::PathBuf;
use std::time::Instant;

use crate::clock::FrameClock;
use crate::config::RunConfig;
use crate::export;
use crate::frame::FramePipeline;

#[derive(Clone, Debug)]
pub struct HeadlessConfig {
    pub frames: u32,
    /// Synthetic host seconds between frame timestamps.
    pub frame_interval: f64,
    pub export_path: Option<PathBuf>,
    pub summary_path: Option<PathBuf>,
    pub progress_interval: u32,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            frames: 2_000,
            frame_interval: 1.0 / 60.0,
            export_path: None,
            summary_path: None,
            progress_interval: 500,
        }
    }
}

pub fn run_headless(config: &RunConfig, opts: &HeadlessConfig) -> Result<(), String> {
    let clock = FrameClock::new(
        config.time_base(),
        config.time_scale,
        config.effective_max_dt(),
    );
    let mut pipeline = FramePipeline::new(config.build_sim(), clock, 0.0);

    log::info!(
        "Headless run started: {} frames of {} on {}x{}",
        opts.frames,
        config.sim.label(),
        config.width,
        config.height
    );

    let started = Instant::now();
    let mut last_report = Instant::now();
    let mut last_report_frame = 0u32;

    for step in 0..opts.frames {
        pipeline.frame(f64::from(step) * opts.frame_interval);
        pipeline.swap();

        if opts.progress_interval > 0 && (step + 1) % opts.progress_interval == 0 {
            let done = step + 1;
            let total_elapsed = started.elapsed().as_secs_f64().max(1e-6);
            let total_fps = f64::from(done) / total_elapsed;

            let window_elapsed = last_report.elapsed().as_secs_f64().max(1e-6);
            let window_frames = done - last_report_frame;
            let window_fps = f64::from(window_frames) / window_elapsed;

            let remaining = opts.frames.saturating_sub(done);
            let eta_secs = if total_fps > 1e-6 {
                f64::from(remaining) / total_fps
            } else {
                0.0
            };

            log::info!(
                "Headless progress: {}/{} | fps={:.0} (window {:.0}) | ETA={:.1}s",
                done,
                opts.frames,
                total_fps,
                window_fps,
                eta_secs,
            );

            last_report = Instant::now();
            last_report_frame = done;
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    log::info!(
        "Headless run finished: {} frames in {:.2}s, {} clamped in {} overrun episodes",
        pipeline.frame_count(),
        elapsed,
        pipeline.overrun_frames(),
        pipeline.overrun_episodes()
    );

    if let Some(path) = &opts.export_path {
        export::save_field_png(pipeline.field(), path)?;
        log::info!(
            "Exported final '{}' field to {}",
            pipeline.output_name(),
            path.display()
        );
    }

    if let Some(path) = &opts.summary_path {
        let summary = serde_json::json!({
            "sim": config.sim.label(),
            "width": config.width,
            "height": config.height,
            "frames": pipeline.frame_count(),
            "max_dt": config.effective_max_dt(),
            "time_scale": config.time_scale,
            "overrun_episodes": pipeline.overrun_episodes(),
            "overrun_frames": pipeline.overrun_frames(),
            "elapsed_secs": elapsed,
        });
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| format!("failed to encode run summary: {}", e))?;
        std::fs::write(path, text)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;
        log::info!("Wrote run summary to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimKind;

    #[test]
    fn headless_run_exports_the_final_field() {
        let config = RunConfig::defaults_for(SimKind::ShallowWater);
        let export_path = std::env::temp_dir().join("wavetank_headless_eta.png");
        let summary_path = std::env::temp_dir().join("wavetank_headless_summary.json");
        let opts = HeadlessConfig {
            frames: 120,
            export_path: Some(export_path.clone()),
            summary_path: Some(summary_path.clone()),
            progress_interval: 0,
            ..Default::default()
        };

        run_headless(&config, &opts).unwrap();

        let image = image::open(&export_path).unwrap();
        assert_eq!((image.width(), image.height()), (70, 70));

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
        assert_eq!(summary["frames"], 120);
        assert_eq!(summary["sim"], "shallow water");

        std::fs::remove_file(&export_path).unwrap();
        std::fs::remove_file(&summary_path).unwrap();
    }

    #[test]
    fn wave_runs_headless_with_its_own_clock() {
        let config = RunConfig::defaults_for(SimKind::Wave);
        let opts = HeadlessConfig {
            frames: 300,
            progress_interval: 0,
            ..Default::default()
        };
        run_headless(&config, &opts).unwrap();
    }
}
