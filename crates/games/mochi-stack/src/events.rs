use serde::{Deserialize, Serialize};

use mochi_core::math::Vec3;

use crate::adhesion::BreakReason;
use crate::body::{BodyId, MochiKind};
use crate::scoring::ScoreResult;

/// A collision-begin report from the rigid-body world.
///
/// `other` is `None` when the body hit static geometry (pedestal or ground).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub body: BodyId,
    pub other: Option<BodyId>,
    /// Contact normal, in either orientation.
    pub normal: Vec3,
}

/// Events emitted by a session during `launch` and `update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PieceLaunched {
        body: BodyId,
        kind: MochiKind,
    },
    AdhesionFormed {
        lower: BodyId,
        upper: BodyId,
    },
    AdhesionBroken {
        lower: BodyId,
        upper: BodyId,
        reason: BreakReason,
    },
    PieceFell {
        body: BodyId,
    },
    /// Every body has come to rest (or the turn timed out).
    TurnSettled {
        pieces: usize,
    },
    ScoreUpdate(ScoreResult),
    RoundComplete,
}

impl GameEvent {
    pub fn is_round_complete(&self) -> bool {
        matches!(self, GameEvent::RoundComplete)
    }
}
