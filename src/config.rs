// ============================================================================
// config.rs - wavetank
// Session configuration: which engine runs, at what resolution, and how
// host time maps onto simulation time. Resolved from per-engine defaults,
// an optional JSON file, and command-line overrides, in that order.
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::clock::TimeBase;
use crate::sim::{ShallowWaterSim, Simulation, WaveSim};

/// Which bundled engine drives the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimKind {
    Wave,
    ShallowWater,
}

impl SimKind {
    pub fn label(&self) -> &'static str {
        match self {
            SimKind::Wave => "wave",
            SimKind::ShallowWater => "shallow water",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wave" => Some(SimKind::Wave),
            "shallow" | "shallow-water" => Some(SimKind::ShallowWater),
            _ => None,
        }
    }
}

/// One session's resolved settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub sim: SimKind,
    pub width: u32,
    pub height: u32,
    /// Simulation seconds per host second.
    pub time_scale: f64,
    /// Override for the step bound. Usually left to the engine default.
    pub max_dt: Option<f32>,
    pub vsync: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::defaults_for(SimKind::ShallowWater)
    }
}

impl RunConfig {
    /// The stock settings for one engine: the grid each was tuned on and
    /// the host-to-simulation time compression that looks right for it.
    pub fn defaults_for(sim: SimKind) -> Self {
        match sim {
            SimKind::Wave => Self {
                sim,
                width: 40,
                height: 50,
                time_scale: 1.0 / 7.0,
                max_dt: None,
                vsync: true,
            },
            SimKind::ShallowWater => Self {
                sim,
                width: 70,
                height: 70,
                time_scale: 0.1,
                max_dt: None,
                vsync: true,
            },
        }
    }

    pub fn load(path: &str) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {}", path, e))?;
        serde_json::from_str(&text).map_err(|e| format!("Failed to parse config {}: {}", path, e))
    }

    /// The step bound the frame clock enforces: the explicit override if
    /// set, otherwise the engine's own limit for this grid.
    pub fn effective_max_dt(&self) -> f32 {
        self.max_dt.unwrap_or(match self.sim {
            SimKind::Wave => WaveSim::stable_dt(self.width, self.height),
            SimKind::ShallowWater => ShallowWaterSim::stable_dt(self.width, self.height),
        })
    }

    /// Each engine keeps the timestamp bookkeeping it was tuned with; the
    /// two styles step identically but resync differently after clamps.
    pub fn time_base(&self) -> TimeBase {
        match self.sim {
            SimKind::Wave => TimeBase::SimTime,
            SimKind::ShallowWater => TimeBase::WallClock,
        }
    }

    pub fn build_sim(&self) -> Box<dyn Simulation> {
        match self.sim {
            SimKind::Wave => Box::new(WaveSim::new(self.width, self.height)),
            SimKind::ShallowWater => Box::new(ShallowWaterSim::new(self.width, self.height)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn engine_defaults_carry_their_own_grid_and_clock() {
        let wave = RunConfig::defaults_for(SimKind::Wave);
        assert_eq!((wave.width, wave.height), (40, 50));
        assert_relative_eq!(wave.effective_max_dt(), 0.01);
        assert_eq!(wave.time_base(), TimeBase::SimTime);

        let shallow = RunConfig::defaults_for(SimKind::ShallowWater);
        assert_eq!((shallow.width, shallow.height), (70, 70));
        assert_relative_eq!(shallow.effective_max_dt(), 1.0 / 70.0);
        assert_eq!(shallow.time_base(), TimeBase::WallClock);
    }

    #[test]
    fn shallow_step_bound_tracks_the_larger_dimension() {
        let mut cfg = RunConfig::defaults_for(SimKind::ShallowWater);
        cfg.width = 50;
        cfg.height = 200;
        assert_relative_eq!(cfg.effective_max_dt(), 1.0 / 200.0);
    }

    #[test]
    fn wave_step_bound_tracks_grid_resolution() {
        let mut cfg = RunConfig::defaults_for(SimKind::Wave);
        cfg.width = 300;
        cfg.height = 300;
        assert!(cfg.effective_max_dt() < 0.01);
        assert_relative_eq!(cfg.effective_max_dt(), WaveSim::stable_dt(300, 300));
    }

    #[test]
    fn explicit_override_beats_the_engine_bound() {
        let mut cfg = RunConfig::defaults_for(SimKind::Wave);
        cfg.max_dt = Some(0.002);
        assert_relative_eq!(cfg.effective_max_dt(), 0.002);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = RunConfig::defaults_for(SimKind::Wave);
        let text = serde_json::to_string(&cfg).unwrap();
        let back: RunConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.sim, SimKind::Wave);
        assert_eq!((back.width, back.height), (40, 50));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let back: RunConfig = serde_json::from_str(r#"{"sim": "wave"}"#).unwrap();
        assert_eq!(back.sim, SimKind::Wave);
        // Field defaults come from the shallow-water stock settings.
        assert_eq!((back.width, back.height), (70, 70));
        assert!(back.vsync);
    }

    #[test]
    fn kind_parses_both_spellings_of_shallow() {
        assert_eq!(SimKind::parse("shallow"), Some(SimKind::ShallowWater));
        assert_eq!(SimKind::parse("shallow-water"), Some(SimKind::ShallowWater));
        assert_eq!(SimKind::parse("wave"), Some(SimKind::Wave));
        assert_eq!(SimKind::parse("plasma"), None);
    }

    #[test]
    fn engines_are_built_at_the_configured_resolution() {
        let cfg = RunConfig::defaults_for(SimKind::Wave);
        let sim = cfg.build_sim();
        assert_eq!((sim.width(), sim.height()), (40, 50));
        assert_eq!(sim.output_names(), &["u"]);

        let sim = RunConfig::defaults_for(SimKind::ShallowWater).build_sim();
        assert_eq!(sim.output_names().len(), 3);
    }
}
