use std::fmt;

use serde::{Deserialize, Serialize};

use mochi_core::math::Vec3;

/// Handle of a tracked body inside a [`BodyArena`]. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BodyId({})", self.0)
    }
}

/// The piece kinds that can be launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MochiKind {
    /// The large bottom mochi.
    Base,
    /// The smaller mochi that sits on the base.
    Top,
    /// The mikan orange that crowns the stack.
    Mikan,
}

impl MochiKind {
    pub const fn first() -> Self {
        MochiKind::Base
    }

    /// Classic-mode launch order: base, top, mikan, then nothing.
    pub fn next_classic(self) -> Option<Self> {
        match self {
            MochiKind::Base => Some(MochiKind::Top),
            MochiKind::Top => Some(MochiKind::Mikan),
            MochiKind::Mikan => None,
        }
    }

    pub fn radius(self) -> f32 {
        match self {
            MochiKind::Base => 1.0,
            MochiKind::Top => 0.75,
            MochiKind::Mikan => 0.35,
        }
    }

    pub fn height(self) -> f32 {
        match self {
            MochiKind::Base => 0.8,
            MochiKind::Top => 0.6,
            MochiKind::Mikan => 0.6,
        }
    }

    pub fn mass(self) -> f32 {
        match self {
            MochiKind::Base => 3.0,
            MochiKind::Top => 2.0,
            MochiKind::Mikan => 0.5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MochiKind::Base => "base",
            MochiKind::Top => "top",
            MochiKind::Mikan => "mikan",
        }
    }
}

/// Where a body is relative to the structure beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackState {
    /// Airborne after launch; not evaluated for stacking.
    Flying,
    /// Touched something, waiting for the next stacking pass.
    Landing,
    /// Resting on another body or on the pedestal.
    Stacked,
    /// Neither supported by a body nor within the pedestal band.
    Fallen,
}

/// One physics-simulated piece, mirrored from the rigid-body world each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedBody {
    pub id: BodyId,
    pub kind: MochiKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Session clock (seconds) at launch.
    pub created_at: f64,
    pub state: StackState,
    stacked_on: Option<BodyId>,
    stacked_by: Vec<BodyId>,
}

impl TrackedBody {
    pub fn radius(&self) -> f32 {
        self.kind.radius()
    }

    pub fn half_height(&self) -> f32 {
        self.kind.height() * 0.5
    }

    pub fn mass(&self) -> f32 {
        self.kind.mass()
    }

    pub fn top_y(&self) -> f32 {
        self.position.y + self.half_height()
    }

    pub fn bottom_y(&self) -> f32 {
        self.position.y - self.half_height()
    }

    /// Height of the body's center.
    pub fn height(&self) -> f32 {
        self.position.y
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn is_flying(&self) -> bool {
        self.state == StackState::Flying
    }

    /// The body this one rests on, if any.
    pub fn stacked_on(&self) -> Option<BodyId> {
        self.stacked_on
    }

    /// Bodies currently resting on this one.
    pub fn stacked_by(&self) -> &[BodyId] {
        &self.stacked_by
    }
}

/// Owns every tracked body of a session in launch order.
///
/// Support links are stored as ids on both ends and only ever changed through
/// [`BodyArena::set_support`] and [`BodyArena::remove`], which keep
/// `stacked_on` and `stacked_by` mirror images of each other.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyArena {
    bodies: Vec<TrackedBody>,
    next_id: u32,
}

impl BodyArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a freshly launched piece. It begins `Flying`.
    pub fn insert(
        &mut self,
        kind: MochiKind,
        position: Vec3,
        velocity: Vec3,
        created_at: f64,
    ) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        self.bodies.push(TrackedBody {
            id,
            kind,
            position,
            velocity,
            angular_velocity: Vec3::ZERO,
            created_at,
            state: StackState::Flying,
            stacked_on: None,
            stacked_by: Vec::new(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn get(&self, id: BodyId) -> Option<&TrackedBody> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut TrackedBody> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.get(id).is_some()
    }

    /// Bodies in insertion (launch) order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedBody> {
        self.bodies.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedBody> {
        self.bodies.iter_mut()
    }

    /// First body of the given kind in launch order.
    pub fn first_of_kind(&self, kind: MochiKind) -> Option<&TrackedBody> {
        self.bodies.iter().find(|b| b.kind == kind)
    }

    /// Point `id` at a new support (or none), unlinking any previous support.
    ///
    /// A self-reference or an unknown support is treated as `None`.
    pub fn set_support(&mut self, id: BodyId, support: Option<BodyId>) {
        let support = support.filter(|&s| s != id && self.contains(s));
        let Some(body) = self.get(id) else {
            return;
        };
        let previous = body.stacked_on;
        if previous == support {
            return;
        }

        if let Some(prev) = previous
            && let Some(prev_body) = self.get_mut(prev)
        {
            prev_body.stacked_by.retain(|&b| b != id);
        }
        if let Some(new) = support
            && let Some(new_body) = self.get_mut(new)
            && !new_body.stacked_by.contains(&id)
        {
            new_body.stacked_by.push(id);
        }
        if let Some(body) = self.get_mut(id) {
            body.stacked_on = support;
        }
    }

    /// Stop tracking a body, clearing its links on both sides.
    pub fn remove(&mut self, id: BodyId) -> Option<TrackedBody> {
        let index = self.bodies.iter().position(|b| b.id == id)?;
        let mut removed = self.bodies.remove(index);
        if let Some(support) = removed.stacked_on.take()
            && let Some(s) = self.get_mut(support)
        {
            s.stacked_by.retain(|&b| b != id);
        }
        for child in std::mem::take(&mut removed.stacked_by) {
            if let Some(c) = self.get_mut(child) {
                c.stacked_on = None;
            }
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
    }

    /// Whether every `stacked_on` link has a matching `stacked_by` entry and
    /// vice versa, with no self-links.
    pub fn relations_consistent(&self) -> bool {
        self.bodies.iter().all(|body| {
            let up_ok = match body.stacked_on {
                Some(s) => {
                    s != body.id
                        && self
                            .get(s)
                            .is_some_and(|support| support.stacked_by.contains(&body.id))
                },
                None => true,
            };
            let down_ok = body.stacked_by.iter().all(|&child| {
                child != body.id
                    && self
                        .get(child)
                        .is_some_and(|c| c.stacked_on == Some(body.id))
            });
            up_ok && down_ok
        })
    }
}
