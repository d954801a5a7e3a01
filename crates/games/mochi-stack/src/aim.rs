use serde::{Deserialize, Serialize};

use crate::config::LaunchConfig;
use crate::trajectory::{LandingZone, LaunchParameters, TrajectoryPreview, simulate_trajectory};

/// Which gauge is currently sweeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AimPhase {
    Horizontal,
    Vertical,
    Power,
    /// All three values are locked in.
    Ready,
}

/// Three-step aiming: lock the horizontal angle, then the vertical angle,
/// then the power. Each gauge sweeps back and forth until confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AimController {
    config: LaunchConfig,
    phase: AimPhase,
    params: LaunchParameters,
    /// +1 or -1: direction the active gauge is moving.
    sweep_dir: f32,
}

impl AimController {
    pub fn new(config: LaunchConfig) -> Self {
        let params = default_params(&config);
        Self {
            config,
            phase: AimPhase::Horizontal,
            params,
            sweep_dir: 1.0,
        }
    }

    pub fn phase(&self) -> AimPhase {
        self.phase
    }

    /// Current values, locked or still sweeping.
    pub fn params(&self) -> &LaunchParameters {
        &self.params
    }

    pub fn is_ready(&self) -> bool {
        self.phase == AimPhase::Ready
    }

    /// Back to the first phase with default values, for the next piece.
    pub fn reset(&mut self) {
        self.phase = AimPhase::Horizontal;
        self.params = default_params(&self.config);
        self.sweep_dir = 1.0;
    }

    /// Advance the active gauge by `dt` seconds, bouncing off its bounds.
    pub fn update(&mut self, dt: f32) {
        let cfg = &self.config;
        let (value, min, max, rate) = match self.phase {
            AimPhase::Horizontal => (
                &mut self.params.angle_h,
                cfg.min_angle_h,
                cfg.max_angle_h,
                cfg.angle_sweep_rate,
            ),
            AimPhase::Vertical => (
                &mut self.params.angle_v,
                cfg.min_angle_v,
                cfg.max_angle_v,
                cfg.angle_sweep_rate,
            ),
            AimPhase::Power => (&mut self.params.power, 0.0, 100.0, cfg.power_sweep_rate),
            AimPhase::Ready => return,
        };

        *value += self.sweep_dir * rate * dt;
        if *value >= max {
            *value = max;
            self.sweep_dir = -1.0;
        } else if *value <= min {
            *value = min;
            self.sweep_dir = 1.0;
        }
    }

    /// Lock the active gauge and move to the next phase.
    pub fn confirm(&mut self) -> AimPhase {
        self.phase = match self.phase {
            AimPhase::Horizontal => AimPhase::Vertical,
            AimPhase::Vertical => AimPhase::Power,
            AimPhase::Power | AimPhase::Ready => AimPhase::Ready,
        };
        self.sweep_dir = 1.0;
        self.phase
    }

    /// Locked parameters, once all three phases are confirmed.
    pub fn launch_parameters(&self) -> Option<LaunchParameters> {
        self.is_ready().then_some(self.params)
    }

    /// Preview path for the current values.
    pub fn preview(&self) -> TrajectoryPreview {
        simulate_trajectory(&self.params, self.config.preview_points)
    }

    /// Landing feedback for the locked aim.
    pub fn feedback(&self) -> Option<LandingZone> {
        self.is_ready().then(|| self.preview().landing_zone())
    }
}

fn default_params(config: &LaunchConfig) -> LaunchParameters {
    LaunchParameters {
        angle_h: config.default_angle_h,
        angle_v: config.default_angle_v,
        power: config.default_power,
        launch_position: config.launch_position,
    }
}
