use serde::{Deserialize, Serialize};

use mochi_core::math::Vec3;

use crate::body::{BodyArena, BodyId, TrackedBody};
use crate::config::AdhesionConfig;

/// A spring holding an upper body onto the body it landed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdhesionConnection {
    pub lower: BodyId,
    pub upper: BodyId,
    /// Session clock (seconds) when the connection formed.
    pub created_at: f64,
    /// Anchor offsets from each body's origin.
    pub lower_anchor: Vec3,
    pub upper_anchor: Vec3,
    pub stiffness: f32,
    pub damping: f32,
    pub rest_length: f32,
}

impl AdhesionConnection {
    /// Whether this connection joins `a` and `b`, in either order.
    pub fn joins(&self, a: BodyId, b: BodyId) -> bool {
        (self.lower == a && self.upper == b) || (self.lower == b && self.upper == a)
    }

    pub fn involves(&self, id: BodyId) -> bool {
        self.lower == id || self.upper == id
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.created_at
    }

    /// Damped spring force acting on the upper body; the lower body receives
    /// the opposite force.
    pub fn spring_force(&self, lower: &TrackedBody, upper: &TrackedBody) -> Vec3 {
        let lower_point = lower.position + self.lower_anchor;
        let upper_point = upper.position + self.upper_anchor;
        let Some(dir) = (upper_point - lower_point).try_normalize() else {
            return Vec3::ZERO;
        };
        let stretch = upper_point.distance(lower_point) - self.rest_length;
        let closing_speed = (upper.velocity - lower.velocity).dot(dir);
        dir * (-self.stiffness * stretch - self.damping * closing_speed)
    }
}

/// Why a connection was removed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BreakReason {
    /// Centers drifted further apart than the allowed distance.
    Separated { distance: f32 },
    /// The upper body moved vertically too fast relative to the lower one.
    Violent { relative_vertical_speed: f32 },
    /// One of the bodies is no longer tracked.
    BodyRemoved,
}

/// A connection removed during an update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdhesionBreak {
    pub lower: BodyId,
    pub upper: BodyId,
    pub age: f64,
    pub reason: BreakReason,
}

/// Creates springs between bodies that land on one another and removes them
/// when the pair is pulled apart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdhesionManager {
    config: AdhesionConfig,
    connections: Vec<AdhesionConnection>,
}

impl AdhesionManager {
    pub fn new(config: AdhesionConfig) -> Self {
        Self {
            config,
            connections: Vec::new(),
        }
    }

    pub fn connections(&self) -> &[AdhesionConnection] {
        &self.connections
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn is_connected(&self, a: BodyId, b: BodyId) -> bool {
        self.connections.iter().any(|c| c.joins(a, b))
    }

    /// Handle a collision-begin event between two tracked bodies.
    ///
    /// Only a predominantly vertical contact between a not-yet-connected pair
    /// forms a connection. Returns the new `(lower, upper)` pair when one forms.
    pub fn on_collision(
        &mut self,
        arena: &BodyArena,
        a: BodyId,
        b: BodyId,
        normal: Vec3,
        now: f64,
    ) -> Option<(BodyId, BodyId)> {
        if a == b || self.is_connected(a, b) {
            return None;
        }
        if !normal.is_finite() || normal.y.abs() < self.config.min_vertical_normal {
            return None;
        }
        let (body_a, body_b) = (arena.get(a)?, arena.get(b)?);
        let (lower, upper) = if body_a.position.y <= body_b.position.y {
            (body_a, body_b)
        } else {
            (body_b, body_a)
        };

        let upper_anchor = Vec3::new(0.0, -self.config.anchor_offset, 0.0);
        let lower_anchor = upper.position + upper_anchor - lower.position;
        self.connections.push(AdhesionConnection {
            lower: lower.id,
            upper: upper.id,
            created_at: now,
            lower_anchor,
            upper_anchor,
            stiffness: self.config.stiffness,
            damping: self.config.damping,
            rest_length: self.config.rest_length,
        });
        tracing::debug!(lower = %lower.id, upper = %upper.id, "Adhesion formed");
        Some((lower.id, upper.id))
    }

    /// Apply every connection's spring for `dt` seconds, then drop the ones
    /// that meet a break condition.
    pub fn update(&mut self, arena: &mut BodyArena, now: f64, dt: f32) -> Vec<AdhesionBreak> {
        self.apply_forces(arena, dt);

        let mut broken = Vec::new();
        self.connections.retain(|conn| {
            let age = conn.age(now);
            let reason = match (arena.get(conn.lower), arena.get(conn.upper)) {
                (Some(lower), Some(upper)) => {
                    if age < self.config.grace_period {
                        return true;
                    }
                    let distance = lower.position.distance(upper.position);
                    let relative_vertical_speed = (upper.velocity.y - lower.velocity.y).abs();
                    if distance > self.config.max_distance {
                        BreakReason::Separated { distance }
                    } else if relative_vertical_speed > self.config.max_relative_vertical_speed {
                        BreakReason::Violent {
                            relative_vertical_speed,
                        }
                    } else {
                        return true;
                    }
                },
                _ => BreakReason::BodyRemoved,
            };
            tracing::debug!(lower = %conn.lower, upper = %conn.upper, age, ?reason, "Adhesion broken");
            broken.push(AdhesionBreak {
                lower: conn.lower,
                upper: conn.upper,
                age,
                reason,
            });
            false
        });
        broken
    }

    fn apply_forces(&self, arena: &mut BodyArena, dt: f32) {
        for conn in &self.connections {
            let (Some(lower), Some(upper)) = (arena.get(conn.lower), arena.get(conn.upper)) else {
                continue;
            };
            let force = conn.spring_force(lower, upper);
            let lower_dv = -force * (dt / lower.mass());
            let upper_dv = force * (dt / upper.mass());
            if let Some(lower) = arena.get_mut(conn.lower) {
                lower.velocity += lower_dv;
            }
            if let Some(upper) = arena.get_mut(conn.upper) {
                upper.velocity += upper_dv;
            }
        }
    }

    /// Drop every connection touching `id`. Returns how many were removed.
    pub fn remove_body(&mut self, id: BodyId) -> usize {
        let before = self.connections.len();
        self.connections.retain(|c| !c.involves(id));
        before - self.connections.len()
    }

    /// Drop all connections without applying any further force.
    pub fn dispose(&mut self) {
        self.connections.clear();
    }
}
