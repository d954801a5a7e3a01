//! Launch math and the aiming preview path.
//!
//! None of this drives the authoritative simulation; the rigid-body world does.
//! Inputs are not clamped here: callers keep angles and power within their
//! configured bounds.

use serde::{Deserialize, Serialize};

use mochi_core::math::Vec3;

/// Power multiplier at power 0.
pub const MIN_POWER_MULTIPLIER: f32 = 0.12;
/// Power multiplier at power 100.
pub const MAX_POWER_MULTIPLIER: f32 = 0.27;
/// Launch speed at multiplier 0.
pub const BASE_LAUNCH_SPEED: f32 = 8.0;
/// Additional launch speed per unit of multiplier.
pub const LAUNCH_SPEED_SCALE: f32 = 20.0;
/// Preview paths stop once they drop below this height.
pub const PREVIEW_FLOOR_Y: f32 = -2.0;
/// Point the preview's landing distance is measured from.
pub const LANDING_TARGET: Vec3 = Vec3::ZERO;

/// Aim state for one launch. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaunchParameters {
    /// Yaw; 0 aims down -Z toward the pedestal.
    pub angle_h: f32,
    /// Elevation above the horizon.
    pub angle_v: f32,
    /// 0 to 100.
    pub power: f32,
    pub launch_position: Vec3,
}

impl LaunchParameters {
    pub fn initial_velocity(&self) -> Vec3 {
        initial_velocity(self.angle_h, self.angle_v, self.power)
    }
}

/// Linear map of power 0..100 onto the multiplier range.
pub fn power_multiplier(power: f32) -> f32 {
    MIN_POWER_MULTIPLIER + (power / 100.0) * (MAX_POWER_MULTIPLIER - MIN_POWER_MULTIPLIER)
}

pub fn launch_speed(multiplier: f32) -> f32 {
    BASE_LAUNCH_SPEED + multiplier * LAUNCH_SPEED_SCALE
}

/// Spherical-to-Cartesian decomposition of the launch speed.
pub fn initial_velocity(angle_h_deg: f32, angle_v_deg: f32, power: f32) -> Vec3 {
    let h = angle_h_deg.to_radians();
    let v = angle_v_deg.to_radians();
    let speed = launch_speed(power_multiplier(power));
    Vec3::new(
        h.sin() * speed * v.cos(),
        v.sin() * speed,
        -h.cos() * speed * v.cos(),
    )
}

/// Integration settings for the preview path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewSettings {
    pub gravity: f32,
    /// Applied to every axis, vertical included, as `v *= 1 - damping * dt`.
    pub damping: f32,
    pub dt: f32,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            gravity: -9.8,
            damping: 0.4,
            dt: 0.05,
        }
    }
}

/// A sampled preview path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPreview {
    pub points: Vec<Vec3>,
    /// Horizontal distance of the final point from the landing target.
    pub landing_distance: f32,
}

impl TrajectoryPreview {
    pub fn landing_point(&self) -> Option<Vec3> {
        self.points.last().copied()
    }

    pub fn landing_zone(&self) -> LandingZone {
        LandingZone::from_distance(self.landing_distance)
    }
}

pub fn simulate_trajectory(params: &LaunchParameters, num_points: usize) -> TrajectoryPreview {
    simulate_trajectory_with(params, num_points, &PreviewSettings::default())
}

/// Forward-Euler integration under gravity and linear damping.
///
/// Always yields exactly `num_points` points, the first being the launch
/// position. Once the path drops below [`PREVIEW_FLOOR_Y`] it is clamped to the
/// floor and the remaining points repeat that landing point.
pub fn simulate_trajectory_with(
    params: &LaunchParameters,
    num_points: usize,
    settings: &PreviewSettings,
) -> TrajectoryPreview {
    let mut points = Vec::with_capacity(num_points);
    let mut position = params.launch_position;
    let mut velocity = params.initial_velocity();
    let dt = settings.dt;

    while points.len() < num_points {
        points.push(position);

        position += velocity * dt;
        velocity.y += settings.gravity * dt;
        velocity = velocity * (1.0 - settings.damping * dt);

        if position.y < PREVIEW_FLOOR_Y {
            position.y = PREVIEW_FLOOR_Y;
            points.resize(num_points, position);
        }
    }

    let landing = points.last().copied().unwrap_or(params.launch_position);
    TrajectoryPreview {
        points,
        landing_distance: landing.distance_xz(LANDING_TARGET),
    }
}

/// Coarse feedback on where a preview lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LandingZone {
    Near,
    Medium,
    Far,
}

impl LandingZone {
    pub fn from_distance(distance: f32) -> Self {
        if distance < 2.0 {
            LandingZone::Near
        } else if distance < 4.0 {
            LandingZone::Medium
        } else {
            LandingZone::Far
        }
    }

    /// Preview line color as 0xRRGGBB.
    pub fn color(self) -> u32 {
        match self {
            LandingZone::Near => 0x2ED573,
            LandingZone::Medium => 0xFFC312,
            LandingZone::Far => 0xFF5757,
        }
    }

    pub fn is_good_aim(self) -> bool {
        self == LandingZone::Near
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mochi_core::test_helpers::{assert_approx, assert_vec_approx};

    fn params(angle_h: f32, angle_v: f32, power: f32) -> LaunchParameters {
        LaunchParameters {
            angle_h,
            angle_v,
            power,
            launch_position: Vec3::new(0.0, 0.5, 8.0),
        }
    }

    #[test]
    fn power_maps_linearly() {
        assert_approx(power_multiplier(0.0), 0.12, 1e-6);
        assert_approx(power_multiplier(100.0), 0.27, 1e-6);
        assert_approx(power_multiplier(50.0), 0.195, 1e-6);
        assert_approx(launch_speed(0.27), 13.4, 1e-5);
    }

    #[test]
    fn straight_launch_has_no_sideways_component() {
        let v = initial_velocity(0.0, 45.0, 100.0);
        let speed = launch_speed(MAX_POWER_MULTIPLIER);
        assert_approx(v.x, 0.0, 1e-6);
        assert_approx(v.y, speed * std::f32::consts::FRAC_1_SQRT_2, 1e-4);
        assert_approx(v.z, -speed * std::f32::consts::FRAC_1_SQRT_2, 1e-4);
        assert_approx(v.length(), speed, 1e-4);
    }

    #[test]
    fn yaw_turns_toward_positive_x() {
        let v = initial_velocity(90.0, 0.0, 0.0);
        assert_vec_approx(v, Vec3::new(launch_speed(MIN_POWER_MULTIPLIER), 0.0, 0.0), 1e-4);
    }

    #[test]
    fn preview_starts_at_launch_and_lands() {
        let p = params(0.0, 45.0, 50.0);
        let preview = simulate_trajectory(&p, 120);
        assert_eq!(preview.points.len(), 120);
        assert_eq!(preview.points[0], p.launch_position);
        let last = preview.landing_point().unwrap();
        assert_eq!(last.y, PREVIEW_FLOOR_Y);
        assert!(preview.points.iter().all(|pt| pt.y >= PREVIEW_FLOOR_Y));
        // The path after landing is padded with the landing point.
        assert_eq!(preview.points[118], last);
    }

    #[test]
    fn damping_slows_vertical_motion_too() {
        let p = params(0.0, 90.0, 100.0);
        let undamped = simulate_trajectory_with(
            &p,
            5,
            &PreviewSettings {
                damping: 0.0,
                ..PreviewSettings::default()
            },
        );
        let damped = simulate_trajectory(&p, 5);
        assert!(damped.points[4].y < undamped.points[4].y);
    }

    #[test]
    fn zero_points_is_empty() {
        let preview = simulate_trajectory(&params(0.0, 45.0, 50.0), 0);
        assert!(preview.points.is_empty());
        assert_approx(preview.landing_distance, 8.0, 1e-6);
    }

    #[test]
    fn landing_zone_thresholds() {
        assert_eq!(LandingZone::from_distance(0.0), LandingZone::Near);
        assert_eq!(LandingZone::from_distance(1.99), LandingZone::Near);
        assert_eq!(LandingZone::from_distance(2.0), LandingZone::Medium);
        assert_eq!(LandingZone::from_distance(3.99), LandingZone::Medium);
        assert_eq!(LandingZone::from_distance(4.0), LandingZone::Far);
        assert!(LandingZone::Near.is_good_aim());
        assert!(!LandingZone::Far.is_good_aim());
        assert_ne!(LandingZone::Near.color(), LandingZone::Far.color());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn preview_invariants(
                angle_h in -30.0f32..30.0,
                angle_v in 15.0f32..75.0,
                power in 0.0f32..=100.0,
                num_points in 1usize..200,
            ) {
                let p = params(angle_h, angle_v, power);
                let preview = simulate_trajectory(&p, num_points);
                prop_assert_eq!(preview.points.len(), num_points);
                prop_assert_eq!(preview.points[0], p.launch_position);
                prop_assert!(preview.points.iter().all(|pt| pt.y >= PREVIEW_FLOOR_Y));
                prop_assert!(preview.landing_distance >= 0.0);
            }
        }
    }
}
