use serde::{Deserialize, Serialize};

use mochi_core::math::Vec3;

/// Thresholds for deciding which body supports which.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackingConfig {
    /// Largest vertical gap between a support's top and the body's bottom.
    pub max_support_gap: f32,
    /// Horizontal tolerance, as a multiple of the smaller radius.
    pub horizontal_factor: f32,
    /// Bodies whose bottom lies strictly inside (ground_band_min, ground_band_max)
    /// count as resting on the pedestal.
    pub ground_band_min: f32,
    pub ground_band_max: f32,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            max_support_gap: 0.3,
            horizontal_factor: 1.2,
            ground_band_min: -3.0,
            ground_band_max: 0.0,
        }
    }
}

/// Which collapse heuristic a session uses to decide a piece has fallen off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallPolicyKind {
    /// Off the pedestal edge and below its rim, touching the ground, or
    /// dangling unsupported.
    #[default]
    DistanceHeight,
    /// Only ground contact or dangling unsupported.
    GroundContact,
}

/// Parameters for fall detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallConfig {
    /// Policy used in normal mode.
    pub normal_policy: FallPolicyKind,
    /// Policy used in endless mode.
    pub endless_policy: FallPolicyKind,
    /// Horizontal distance from the pedestal center beyond which a low body is off.
    pub pedestal_radius: f32,
    /// Bottom height below which an off-center body counts as fallen.
    pub fall_height: f32,
    pub ground_y: f32,
    pub ground_tolerance: f32,
    /// Bottom height below which a `Fallen` body is considered dangling.
    pub dangling_y: f32,
}

impl Default for FallConfig {
    fn default() -> Self {
        Self {
            normal_policy: FallPolicyKind::DistanceHeight,
            endless_policy: FallPolicyKind::GroundContact,
            pedestal_radius: 2.5,
            fall_height: -1.4,
            ground_y: -2.0,
            ground_tolerance: 0.15,
            dangling_y: -1.5,
        }
    }
}

/// Synthetic spring that keeps stacked pieces together.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdhesionConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub rest_length: f32,
    /// Upper anchor sits this far below the upper body's origin.
    pub anchor_offset: f32,
    /// Minimum |normal.y| for a contact to count as landing on top.
    pub min_vertical_normal: f32,
    /// Connections younger than this (seconds) never break.
    pub grace_period: f64,
    pub max_distance: f32,
    pub max_relative_vertical_speed: f32,
}

impl Default for AdhesionConfig {
    fn default() -> Self {
        Self {
            stiffness: 50.0,
            damping: 5.0,
            rest_length: 0.1,
            anchor_offset: 0.1,
            min_vertical_normal: 0.7,
            grace_period: 0.3,
            max_distance: 2.0,
            max_relative_vertical_speed: 8.0,
        }
    }
}

/// Scoring constants shared by both modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Height of the pedestal's top surface; endless height is measured from here.
    pub pedestal_surface_y: f32,
    /// Point the base should land on (only X and Z are used).
    pub target: Vec3,
    /// Exponent of the endless height curve.
    pub height_exponent: f64,
    pub height_multiplier: f64,
    pub stack_bonus: f64,
    /// Offset from the support's center below which the stack bonus doubles.
    pub centered_offset: f32,
    pub centered_multiplier: f64,
    /// Applied to the whole endless total when the mikan crowns the stack.
    pub special_top_multiplier: f64,
    pub intensity_min_score: f64,
    pub intensity_max_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            pedestal_surface_y: -1.5,
            target: Vec3::ZERO,
            height_exponent: 2.5,
            height_multiplier: 100.0,
            stack_bonus: 50.0,
            centered_offset: 0.3,
            centered_multiplier: 2.0,
            special_top_multiplier: 1.5,
            intensity_min_score: 100.0,
            intensity_max_score: 1_000_000.0,
        }
    }
}

/// Aiming bounds and sweep rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub launch_position: Vec3,
    /// Horizontal angle bounds in degrees (0 aims straight at the pedestal).
    pub min_angle_h: f32,
    pub max_angle_h: f32,
    /// Vertical angle bounds in degrees above the horizon.
    pub min_angle_v: f32,
    pub max_angle_v: f32,
    pub default_angle_h: f32,
    pub default_angle_v: f32,
    pub default_power: f32,
    /// Sweep rate of the angle gauges (degrees/s).
    pub angle_sweep_rate: f32,
    /// Sweep rate of the power gauge (power units/s).
    pub power_sweep_rate: f32,
    /// Points in the aiming preview path.
    pub preview_points: usize,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            launch_position: Vec3::new(0.0, 0.5, 8.0),
            min_angle_h: -30.0,
            max_angle_h: 30.0,
            min_angle_v: 15.0,
            max_angle_v: 75.0,
            default_angle_h: 0.0,
            default_angle_v: 45.0,
            default_power: 50.0,
            angle_sweep_rate: 60.0,
            power_sweep_rate: 120.0,
            preview_points: 40,
        }
    }
}

/// Turn pacing for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds a piece must fly before slowing down can count as landing.
    pub min_flight_time: f64,
    /// Speed below which a body counts as at rest.
    pub settle_speed: f32,
    /// Seconds every body must stay at rest before a turn ends.
    pub settle_duration: f64,
    /// A turn ends regardless of motion after this many seconds.
    pub max_turn_duration: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_flight_time: 0.2,
            settle_speed: 0.15,
            settle_duration: 0.5,
            max_turn_duration: 8.0,
        }
    }
}

/// Top-level game configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MochiConfig {
    pub stacking: StackingConfig,
    pub fall: FallConfig,
    pub adhesion: AdhesionConfig,
    pub scoring: ScoringConfig,
    pub launch: LaunchConfig,
    pub session: SessionConfig,
}

impl MochiConfig {
    /// Load config from a TOML file. Falls back to defaults if the file is missing
    /// or unparseable.
    pub fn load() -> Self {
        let path =
            std::env::var("MOCHI_CONFIG").unwrap_or_else(|_| "config/mochi.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse {path}: {e}, using defaults");
                MochiConfig::default()
            }),
            Err(_) => MochiConfig::default(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
