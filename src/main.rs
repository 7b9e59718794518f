// ============================================================================
// main.rs - wavetank
// Entry point. Parses the command line, then either runs the headless
// batch driver or starts the winit event loop.
// ============================================================================

mod app;
mod clock;
mod config;
mod events;
mod export;
mod field;
mod frame;
mod headless;
mod hud;
mod pipeline;
mod sim;

use std::path::PathBuf;

use winit::event_loop::EventLoop;

use app::App;
use config::{RunConfig, SimKind};
use headless::HeadlessConfig;

const USAGE: &str = "\
Usage: wavetank [OPTIONS]

  --sim <wave|shallow>   engine to run (default: shallow)
  --width <N>            grid width override
  --height <N>           grid height override
  --time-scale <F>       simulation seconds per host second
  --max-dt <F>           step cap override
  --no-vsync             uncapped presentation
  --config <PATH>        JSON config file (overridden by the flags above)
  --headless <FRAMES>    run FRAMES frames without a window
  --export <PATH>        headless only: save the final field as PNG
  --summary <PATH>       headless only: write a JSON run summary
  -h, --help             show this help";

#[derive(Debug)]
struct CliOptions {
    config: RunConfig,
    headless: Option<HeadlessConfig>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliOptions, String> {
    let mut sim: Option<SimKind> = None;
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;
    let mut time_scale: Option<f64> = None;
    let mut max_dt: Option<f32> = None;
    let mut no_vsync = false;
    let mut config_path: Option<String> = None;
    let mut headless_frames: Option<u32> = None;
    let mut export_path: Option<PathBuf> = None;
    let mut summary_path: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--sim" => {
                let raw = value(&mut args, "--sim")?;
                sim = Some(
                    SimKind::parse(&raw)
                        .ok_or_else(|| format!("unknown simulation '{}'", raw))?,
                );
            }
            "--width" => width = Some(parse_value("--width", &value(&mut args, "--width")?)?),
            "--height" => height = Some(parse_value("--height", &value(&mut args, "--height")?)?),
            "--time-scale" => {
                time_scale = Some(parse_value("--time-scale", &value(&mut args, "--time-scale")?)?)
            }
            "--max-dt" => max_dt = Some(parse_value("--max-dt", &value(&mut args, "--max-dt")?)?),
            "--no-vsync" => no_vsync = true,
            "--config" => config_path = Some(value(&mut args, "--config")?),
            "--headless" => {
                headless_frames = Some(parse_value("--headless", &value(&mut args, "--headless")?)?)
            }
            "--export" => export_path = Some(PathBuf::from(value(&mut args, "--export")?)),
            "--summary" => summary_path = Some(PathBuf::from(value(&mut args, "--summary")?)),
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }

    // A config file provides the base; otherwise the chosen engine's stock
    // settings do. Explicit flags win either way.
    let mut config = match (&config_path, sim) {
        (Some(path), _) => RunConfig::load(path)?,
        (None, Some(kind)) => RunConfig::defaults_for(kind),
        (None, None) => RunConfig::default(),
    };
    if let Some(kind) = sim {
        config.sim = kind;
    }
    if let Some(w) = width {
        config.width = w;
    }
    if let Some(h) = height {
        config.height = h;
    }
    if let Some(scale) = time_scale {
        config.time_scale = scale;
    }
    if let Some(dt) = max_dt {
        config.max_dt = Some(dt);
    }
    if no_vsync {
        config.vsync = false;
    }

    if config.width < 2 || config.height < 2 {
        return Err(format!(
            "grid must be at least 2x2, got {}x{}",
            config.width, config.height
        ));
    }
    if config.sim == SimKind::ShallowWater
        && u64::from(config.width) * u64::from(config.height) > 1 << 16
    {
        return Err(format!(
            "shallow water grids are capped at 65536 vertices (16-bit mesh indices), got {}x{}",
            config.width, config.height
        ));
    }
    if config.sim == SimKind::Wave && (config.width > 8192 || config.height > 8192) {
        return Err(format!(
            "wave grids are capped at 8192 per side (field texture limit), got {}x{}",
            config.width, config.height
        ));
    }
    if !config.time_scale.is_finite() || config.time_scale <= 0.0 {
        return Err(String::from("--time-scale must be a positive number"));
    }
    if let Some(dt) = config.max_dt {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(String::from("--max-dt must be a positive number"));
        }
    }

    let headless = match headless_frames {
        Some(frames) => Some(HeadlessConfig {
            frames,
            export_path: export_path.take(),
            summary_path: summary_path.take(),
            ..Default::default()
        }),
        None => {
            if export_path.is_some() || summary_path.is_some() {
                return Err(String::from("--export and --summary require --headless"));
            }
            None
        }
    };

    Ok(CliOptions { config, headless })
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{} needs a value", flag))
}

fn parse_value<T: std::str::FromStr>(flag: &str, raw: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| format!("invalid value for {}: {}", flag, e))
}

fn main() {
    env_logger::init();

    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("wavetank: {err}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    if let Some(headless) = cli.headless {
        if let Err(err) = headless::run_headless(&cli.config, &headless) {
            log::error!("Headless run failed: {err}");
            std::process::exit(1);
        }
        return;
    }

    let event_loop = EventLoop::new().unwrap();
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let mut app = App::new(cli.config);
    event_loop.run_app(&mut app).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_arguments_selects_the_shallow_defaults() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.config.sim, SimKind::ShallowWater);
        assert_eq!((cli.config.width, cli.config.height), (70, 70));
        assert!(cli.headless.is_none());
    }

    #[test]
    fn choosing_an_engine_brings_its_stock_grid() {
        let cli = parse(&["--sim", "wave"]).unwrap();
        assert_eq!(cli.config.sim, SimKind::Wave);
        assert_eq!((cli.config.width, cli.config.height), (40, 50));
    }

    #[test]
    fn explicit_dimensions_beat_the_stock_grid() {
        let cli = parse(&["--sim", "wave", "--width", "64", "--height", "64"]).unwrap();
        assert_eq!((cli.config.width, cli.config.height), (64, 64));
    }

    #[test]
    fn headless_collects_its_output_paths() {
        let cli = parse(&["--headless", "500", "--export", "out.png"]).unwrap();
        let headless = cli.headless.unwrap();
        assert_eq!(headless.frames, 500);
        assert_eq!(headless.export_path, Some(PathBuf::from("out.png")));
    }

    #[test]
    fn export_without_headless_is_an_error() {
        assert!(parse(&["--export", "out.png"]).is_err());
    }

    #[test]
    fn oversized_mesh_grids_are_rejected_up_front() {
        assert!(parse(&["--sim", "shallow", "--width", "300", "--height", "300"]).is_err());
        // The texture path caps per side instead, far above this.
        assert!(parse(&["--sim", "wave", "--width", "300", "--height", "300"]).is_ok());
    }

    #[test]
    fn wave_grids_are_capped_at_the_texture_limit() {
        assert!(parse(&["--sim", "wave", "--width", "9000", "--height", "50"]).is_err());
        assert!(parse(&["--sim", "wave", "--width", "50", "--height", "9000"]).is_err());
        assert!(parse(&["--sim", "wave", "--width", "8192", "--height", "50"]).is_ok());
    }

    #[test]
    fn degenerate_clock_settings_are_rejected() {
        assert!(parse(&["--max-dt", "0"]).is_err());
        assert!(parse(&["--max-dt", "-0.01"]).is_err());
        assert!(parse(&["--max-dt", "NaN"]).is_err());
        assert!(parse(&["--max-dt", "inf"]).is_err());
        assert!(parse(&["--max-dt", "0.005"]).is_ok());
        assert!(parse(&["--time-scale", "NaN"]).is_err());
    }

    #[test]
    fn unknown_arguments_are_reported() {
        let err = parse(&["--frobnicate"]).unwrap_err();
        assert!(err.contains("--frobnicate"));
    }
}
