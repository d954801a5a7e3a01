use serde::{Deserialize, Serialize};

use mochi_core::math::Vec3;

use crate::body::{BodyArena, BodyId, StackState, TrackedBody};
use crate::config::{FallConfig, FallPolicyKind, StackingConfig};

/// A body whose stacking classification changed during one pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StackChange {
    pub body: BodyId,
    pub from: StackState,
    pub to: StackState,
    pub support: Option<BodyId>,
}

/// Classifies every tracked body from positions alone: stacked on another
/// body, resting on the pedestal, or fallen.
#[derive(Debug, Clone)]
pub struct StackingInference {
    config: StackingConfig,
}

impl StackingInference {
    pub fn new(config: StackingConfig) -> Self {
        Self { config }
    }

    /// Run one classification pass, bottom-up by height. Flying bodies are
    /// left untouched. Returns the bodies whose state or support changed.
    pub fn update(&self, arena: &mut BodyArena) -> Vec<StackChange> {
        let mut order: Vec<(BodyId, f32)> = arena.iter().map(|b| (b.id, b.height())).collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut changes = Vec::new();
        for (id, _) in order {
            let Some(body) = arena.get(id) else {
                continue;
            };
            if body.is_flying() {
                continue;
            }
            let from = body.state;
            let previous_support = body.stacked_on();

            let support = self.find_support(arena, body);
            let to = if support.is_some() || self.on_pedestal(body) {
                StackState::Stacked
            } else {
                StackState::Fallen
            };

            arena.set_support(id, support);
            if let Some(body) = arena.get_mut(id) {
                body.state = to;
            }

            if from != to || previous_support != support {
                tracing::debug!(body = %id, ?from, ?to, ?support, "Stack state changed");
                changes.push(StackChange {
                    body: id,
                    from,
                    to,
                    support,
                });
            }
        }
        changes
    }

    /// The first body (in launch order) directly beneath `target`.
    ///
    /// Any qualifying candidate may be returned, not necessarily the closest.
    pub fn find_support(&self, arena: &BodyArena, target: &TrackedBody) -> Option<BodyId> {
        let bottom = target.bottom_y();
        arena
            .iter()
            .filter(|c| c.id != target.id)
            .find(|candidate| {
                let top = candidate.top_y();
                if top >= bottom || bottom - top > self.config.max_support_gap {
                    return false;
                }
                let reach = self.config.horizontal_factor * target.radius().min(candidate.radius());
                target.position.distance_xz(candidate.position) < reach
            })
            .map(|c| c.id)
    }

    fn on_pedestal(&self, body: &TrackedBody) -> bool {
        let bottom = body.bottom_y();
        bottom < self.config.ground_band_max && bottom > self.config.ground_band_min
    }
}

/// Decides whether a piece has fallen off the structure.
#[derive(Debug, Clone)]
pub struct FallPolicy {
    kind: FallPolicyKind,
    config: FallConfig,
    /// Pedestal center; only X and Z are used.
    center: Vec3,
}

impl FallPolicy {
    pub fn new(kind: FallPolicyKind, config: FallConfig, center: Vec3) -> Self {
        Self {
            kind,
            config,
            center,
        }
    }

    pub fn kind(&self) -> FallPolicyKind {
        self.kind
    }

    /// First body in launch order that counts as fallen, if any.
    pub fn find_fallen(&self, arena: &BodyArena) -> Option<BodyId> {
        arena.iter().find(|b| self.has_fallen(b)).map(|b| b.id)
    }

    pub fn has_fallen(&self, body: &TrackedBody) -> bool {
        if body.is_flying() {
            return false;
        }
        let bottom = body.bottom_y();
        let cfg = &self.config;

        let off_edge = body.position.distance_xz(self.center) > cfg.pedestal_radius
            && bottom < cfg.fall_height;
        let on_ground = bottom <= cfg.ground_y + cfg.ground_tolerance;
        let dangling = body.state == StackState::Fallen && bottom < cfg.dangling_y;

        match self.kind {
            FallPolicyKind::DistanceHeight => off_edge || on_ground || dangling,
            FallPolicyKind::GroundContact => on_ground || dangling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::MochiKind;

    fn inference() -> StackingInference {
        StackingInference::new(StackingConfig::default())
    }

    fn policy(kind: FallPolicyKind) -> FallPolicy {
        FallPolicy::new(kind, FallConfig::default(), Vec3::ZERO)
    }

    /// Insert a body that has already touched down.
    fn landed(arena: &mut BodyArena, kind: MochiKind, position: Vec3) -> BodyId {
        let id = arena.insert(kind, position, Vec3::ZERO, 0.0);
        arena.get_mut(id).unwrap().state = StackState::Landing;
        id
    }

    /// Base resting on the pedestal surface at y = -1.5.
    fn base_on_pedestal(arena: &mut BodyArena) -> BodyId {
        landed(arena, MochiKind::Base, Vec3::new(0.0, -1.1, 0.0))
    }

    #[test]
    fn body_just_above_support_is_stacked_on_it() {
        let mut arena = BodyArena::new();
        let base = base_on_pedestal(&mut arena);
        // base top = -0.7; top bottom = -0.65 (gap 0.05)
        let top = landed(&mut arena, MochiKind::Top, Vec3::new(0.2, -0.35, 0.1));

        inference().update(&mut arena);

        let top_body = arena.get(top).unwrap();
        assert_eq!(top_body.state, StackState::Stacked);
        assert_eq!(top_body.stacked_on(), Some(base));
        assert_eq!(arena.get(base).unwrap().stacked_by(), &[top]);
        assert!(arena.relations_consistent());
    }

    #[test]
    fn body_in_pedestal_band_rests_on_ground() {
        let mut arena = BodyArena::new();
        let base = base_on_pedestal(&mut arena);
        inference().update(&mut arena);
        let body = arena.get(base).unwrap();
        assert_eq!(body.state, StackState::Stacked);
        assert_eq!(body.stacked_on(), None);
    }

    #[test]
    fn pedestal_band_excludes_its_edges() {
        // Mikan half-height is 0.3: centered at 0.3 its bottom is exactly 0.
        let mut arena = BodyArena::new();
        let at_top = landed(&mut arena, MochiKind::Mikan, Vec3::new(0.0, 0.3, 0.0));
        assert_eq!(arena.get(at_top).unwrap().bottom_y(), 0.0);
        let at_floor = landed(&mut arena, MochiKind::Top, Vec3::new(4.0, -2.7, 0.0));
        assert_eq!(arena.get(at_floor).unwrap().bottom_y(), -3.0);

        inference().update(&mut arena);

        assert_eq!(arena.get(at_top).unwrap().state, StackState::Fallen);
        assert_eq!(arena.get(at_floor).unwrap().state, StackState::Fallen);
    }

    #[test]
    fn pedestal_band_interior_and_exterior() {
        let mut arena = BodyArena::new();
        let just_below_top = landed(&mut arena, MochiKind::Mikan, Vec3::new(0.0, 0.25, 0.0));
        let just_above_top = landed(&mut arena, MochiKind::Mikan, Vec3::new(3.0, 0.35, 0.0));
        let just_above_floor = landed(&mut arena, MochiKind::Top, Vec3::new(-3.0, -2.65, 0.0));
        let just_below_floor = landed(&mut arena, MochiKind::Top, Vec3::new(6.0, -2.75, 0.0));

        inference().update(&mut arena);

        assert_eq!(arena.get(just_below_top).unwrap().state, StackState::Stacked);
        assert_eq!(arena.get(just_above_top).unwrap().state, StackState::Fallen);
        assert_eq!(arena.get(just_above_floor).unwrap().state, StackState::Stacked);
        assert_eq!(arena.get(just_below_floor).unwrap().state, StackState::Fallen);
    }

    #[test]
    fn support_gap_inside_and_outside_limit() {
        // Base top at -0.7; the limit is 0.3.
        let mut arena = BodyArena::new();
        let base = base_on_pedestal(&mut arena);
        let close = landed(&mut arena, MochiKind::Top, Vec3::new(0.0, -0.15, 0.0));
        inference().update(&mut arena);
        assert_eq!(arena.get(close).unwrap().stacked_on(), Some(base));

        let mut arena = BodyArena::new();
        base_on_pedestal(&mut arena);
        let far = landed(&mut arena, MochiKind::Top, Vec3::new(0.0, -0.05, 0.0));
        inference().update(&mut arena);
        assert_eq!(arena.get(far).unwrap().stacked_on(), None);
    }

    #[test]
    fn policy_reports_its_kind() {
        assert_eq!(policy(FallPolicyKind::GroundContact).kind(), FallPolicyKind::GroundContact);
        assert_eq!(policy(FallPolicyKind::DistanceHeight).kind(), FallPolicyKind::DistanceHeight);
    }

    #[test]
    fn flying_bodies_are_skipped() {
        let mut arena = BodyArena::new();
        let base = base_on_pedestal(&mut arena);
        let flying = arena.insert(MochiKind::Top, Vec3::new(0.0, -0.35, 0.0), Vec3::ZERO, 0.0);

        let changes = inference().update(&mut arena);

        assert_eq!(arena.get(flying).unwrap().state, StackState::Flying);
        assert_eq!(arena.get(flying).unwrap().stacked_on(), None);
        assert!(arena.get(base).unwrap().stacked_by().is_empty());
        assert!(changes.iter().all(|c| c.body != flying));
    }

    #[test]
    fn gap_too_large_is_not_support() {
        let mut arena = BodyArena::new();
        base_on_pedestal(&mut arena);
        // bottom = 0.2, 0.9 above the base top (-0.7)
        let high = landed(&mut arena, MochiKind::Top, Vec3::new(0.0, 0.5, 0.0));

        inference().update(&mut arena);

        let body = arena.get(high).unwrap();
        assert_eq!(body.state, StackState::Fallen);
        assert_eq!(body.stacked_on(), None);
    }

    #[test]
    fn overlapping_body_is_not_support() {
        let mut arena = BodyArena::new();
        let base = base_on_pedestal(&mut arena);
        // top's bottom (-0.75) is below base top (-0.7): not strictly beneath
        let top = landed(&mut arena, MochiKind::Top, Vec3::new(0.0, -0.45, 0.0));

        inference().update(&mut arena);

        assert_ne!(arena.get(top).unwrap().stacked_on(), Some(base));
    }

    #[test]
    fn horizontal_offset_uses_smaller_radius() {
        let mut arena = BodyArena::new();
        base_on_pedestal(&mut arena);
        // mikan radius 0.35 → reach 0.42; offset 0.5 misses
        let mikan = landed(&mut arena, MochiKind::Mikan, Vec3::new(0.5, -0.35, 0.0));
        inference().update(&mut arena);
        assert_eq!(arena.get(mikan).unwrap().stacked_on(), None);

        let mut arena = BodyArena::new();
        let base = base_on_pedestal(&mut arena);
        let mikan = landed(&mut arena, MochiKind::Mikan, Vec3::new(0.4, -0.35, 0.0));
        inference().update(&mut arena);
        assert_eq!(arena.get(mikan).unwrap().stacked_on(), Some(base));
    }

    #[test]
    fn support_is_first_qualifying_in_launch_order() {
        let mut arena = BodyArena::new();
        let first = landed(&mut arena, MochiKind::Base, Vec3::new(0.0, -1.1, 0.0));
        let second = landed(&mut arena, MochiKind::Base, Vec3::new(0.3, -1.05, 0.0));
        let top = landed(&mut arena, MochiKind::Top, Vec3::new(0.1, -0.3, 0.0));

        inference().update(&mut arena);

        // Both qualify; the earlier-launched one wins even though the later is closer.
        assert_eq!(arena.get(top).unwrap().stacked_on(), Some(first));
        assert!(arena.get(second).unwrap().stacked_by().is_empty());
    }

    #[test]
    fn losing_support_moves_body_to_fallen() {
        let mut arena = BodyArena::new();
        let base = base_on_pedestal(&mut arena);
        let top = landed(&mut arena, MochiKind::Top, Vec3::new(0.0, -0.35, 0.0));
        inference().update(&mut arena);
        assert_eq!(arena.get(top).unwrap().stacked_on(), Some(base));

        // Knock the base away: top now hangs above nothing, outside the band.
        arena.get_mut(base).unwrap().position = Vec3::new(6.0, -1.6, 0.0);
        arena.get_mut(top).unwrap().position = Vec3::new(0.0, 0.6, 0.0);
        let changes = inference().update(&mut arena);

        let top_body = arena.get(top).unwrap();
        assert_eq!(top_body.state, StackState::Fallen);
        assert_eq!(top_body.stacked_on(), None);
        assert!(arena.get(base).unwrap().stacked_by().is_empty());
        assert!(changes.iter().any(|c| c.body == top && c.to == StackState::Fallen));
    }

    #[test]
    fn distance_policy_flags_off_edge_body() {
        let mut arena = BodyArena::new();
        base_on_pedestal(&mut arena);
        // 3.0 from center, bottom -1.6 < -1.4, above ground tolerance (-1.85)
        let off = landed(&mut arena, MochiKind::Top, Vec3::new(3.0, -1.3, 0.0));

        assert_eq!(policy(FallPolicyKind::DistanceHeight).find_fallen(&arena), Some(off));
        assert_eq!(policy(FallPolicyKind::GroundContact).find_fallen(&arena), None);
    }

    #[test]
    fn both_policies_flag_ground_contact() {
        let mut arena = BodyArena::new();
        base_on_pedestal(&mut arena);
        // bottom = -1.9, within 0.15 of ground at -2
        let down = landed(&mut arena, MochiKind::Top, Vec3::new(1.0, -1.6, 0.0));

        assert_eq!(policy(FallPolicyKind::DistanceHeight).find_fallen(&arena), Some(down));
        assert_eq!(policy(FallPolicyKind::GroundContact).find_fallen(&arena), Some(down));
    }

    #[test]
    fn both_policies_flag_dangling_fallen_body() {
        let mut arena = BodyArena::new();
        let id = landed(&mut arena, MochiKind::Top, Vec3::new(0.5, -1.4, 0.0));
        arena.get_mut(id).unwrap().state = StackState::Fallen;
        // bottom = -1.7 < -1.5
        assert_eq!(policy(FallPolicyKind::DistanceHeight).find_fallen(&arena), Some(id));
        assert_eq!(policy(FallPolicyKind::GroundContact).find_fallen(&arena), Some(id));
    }

    #[test]
    fn flying_bodies_never_fall() {
        let mut arena = BodyArena::new();
        arena.insert(MochiKind::Top, Vec3::new(5.0, -1.9, 0.0), Vec3::ZERO, 0.0);
        assert_eq!(policy(FallPolicyKind::DistanceHeight).find_fallen(&arena), None);
    }

    #[test]
    fn first_fallen_in_launch_order_is_reported() {
        let mut arena = BodyArena::new();
        let a = landed(&mut arena, MochiKind::Top, Vec3::new(1.0, -1.65, 0.0));
        landed(&mut arena, MochiKind::Top, Vec3::new(-1.0, -1.9, 0.0));
        assert_eq!(policy(FallPolicyKind::GroundContact).find_fallen(&arena), Some(a));
    }

    #[test]
    fn well_placed_stack_has_no_fallen_body() {
        let mut arena = BodyArena::new();
        base_on_pedestal(&mut arena);
        landed(&mut arena, MochiKind::Top, Vec3::new(0.0, -0.35, 0.0));
        inference().update(&mut arena);
        assert_eq!(policy(FallPolicyKind::DistanceHeight).find_fallen(&arena), None);
        assert_eq!(policy(FallPolicyKind::GroundContact).find_fallen(&arena), None);
    }
}
