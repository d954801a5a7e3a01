pub mod adhesion;
pub mod aim;
pub mod body;
pub mod config;
pub mod events;
pub mod scoring;
pub mod stacking;
pub mod trajectory;

use serde::{Deserialize, Serialize};

use mochi_core::math::Vec3;
use mochi_core::mode::GameMode;
use mochi_core::progress::{ProgressStore, ScoreRecord, StorageBackend};

use adhesion::AdhesionManager;
use aim::AimController;
use body::{BodyArena, BodyId, MochiKind, StackState, TrackedBody};
use config::MochiConfig;
use events::{CollisionEvent, GameEvent};
use scoring::{ScoreResult, ScoreSystem};
use stacking::{FallPolicy, StackingInference};
use trajectory::LaunchParameters;

/// Serializable session state, the part that travels in snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MochiState {
    pub mode: GameMode,
    pub arena: BodyArena,
    pub adhesion: AdhesionManager,
    /// Simulation clock in seconds.
    pub clock: f64,
    /// Piece the next launch will spawn; `None` once the sequence is exhausted.
    pub next_kind: Option<MochiKind>,
    /// Clock at the last launch, while that turn has not settled yet.
    pub turn_started_at: Option<f64>,
    /// How long every body has been continuously at rest this turn.
    pub rest_time: f64,
    /// An endless run was ended with a mikan.
    pub finishing: bool,
    /// The mikan ended up on the topmost body.
    pub special_top: bool,
    pub fallen: Option<BodyId>,
    pub round_complete: bool,
}

impl MochiState {
    fn new(mode: GameMode) -> Self {
        Self {
            mode,
            arena: BodyArena::new(),
            adhesion: AdhesionManager::default(),
            clock: 0.0,
            next_kind: Some(MochiKind::first()),
            turn_started_at: None,
            rest_time: 0.0,
            finishing: false,
            special_top: false,
            fallen: None,
            round_complete: false,
        }
    }
}

/// What the rigid-body world needs to create a launched piece.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnOrder {
    pub id: BodyId,
    pub kind: MochiKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
    pub height: f32,
    pub mass: f32,
}

/// One mochi-stacking session in either mode.
///
/// The session never integrates motion itself. Each tick the caller mirrors
/// body state in with [`MochiGame::sync_body`], reports contacts with
/// [`MochiGame::handle_collision`], calls [`MochiGame::update`], and writes
/// [`MochiGame::body_velocity`] back so adhesion forces take effect.
pub struct MochiGame {
    config: MochiConfig,
    state: MochiState,
    stacking: StackingInference,
    fall_policy: FallPolicy,
    scoring: ScoreSystem,
    aim: AimController,
    pending: Vec<GameEvent>,
}

impl MochiGame {
    pub fn new(mode: GameMode, config: MochiConfig) -> Self {
        let mut state = MochiState::new(mode);
        state.adhesion = AdhesionManager::new(config.adhesion.clone());
        Self {
            stacking: StackingInference::new(config.stacking.clone()),
            fall_policy: fall_policy_for(mode, &config),
            scoring: ScoreSystem::for_mode(mode, config.scoring.clone()),
            aim: AimController::new(config.launch.clone()),
            config,
            state,
            pending: Vec::new(),
        }
    }

    pub fn mode(&self) -> GameMode {
        self.state.mode
    }

    pub fn config(&self) -> &MochiConfig {
        &self.config
    }

    pub fn state(&self) -> &MochiState {
        &self.state
    }

    pub fn arena(&self) -> &BodyArena {
        &self.state.arena
    }

    pub fn aim(&self) -> &AimController {
        &self.aim
    }

    pub fn aim_mut(&mut self) -> &mut AimController {
        &mut self.aim
    }

    pub fn next_kind(&self) -> Option<MochiKind> {
        self.state.next_kind
    }

    pub fn is_round_complete(&self) -> bool {
        self.state.round_complete
    }

    /// A launch is possible between turns while pieces remain.
    pub fn can_launch(&self) -> bool {
        !self.state.round_complete
            && self.state.turn_started_at.is_none()
            && self.state.next_kind.is_some()
    }

    /// In endless mode, make the next piece a mikan that ends the run once it
    /// settles. Needs at least one piece already launched.
    pub fn choose_finishing_mikan(&mut self) -> bool {
        if !self.state.mode.is_endless() || !self.can_launch() || self.state.arena.is_empty() {
            return false;
        }
        self.state.next_kind = Some(MochiKind::Mikan);
        true
    }

    /// Spawn the next piece as flying and start its turn.
    pub fn launch(&mut self, params: &LaunchParameters) -> Option<SpawnOrder> {
        if !self.can_launch() {
            return None;
        }
        let kind = self.state.next_kind?;
        let velocity = params.initial_velocity();
        let position = params.launch_position;
        let id = self
            .state
            .arena
            .insert(kind, position, velocity, self.state.clock);

        self.state.next_kind = match (self.state.mode, kind) {
            (_, MochiKind::Mikan) => None,
            (GameMode::Normal, _) => kind.next_classic(),
            (GameMode::Endless, _) => Some(MochiKind::Top),
        };
        if kind == MochiKind::Mikan && self.state.mode.is_endless() {
            self.state.finishing = true;
        }
        self.state.turn_started_at = Some(self.state.clock);
        self.state.rest_time = 0.0;
        self.aim.reset();

        tracing::info!(body = %id, kind = kind.label(), power = params.power, "Piece launched");
        self.pending.push(GameEvent::PieceLaunched { body: id, kind });
        Some(SpawnOrder {
            id,
            kind,
            position,
            velocity,
            radius: kind.radius(),
            height: kind.height(),
            mass: kind.mass(),
        })
    }

    /// Launch with the aim controller's locked parameters, if it is ready.
    pub fn launch_aimed(&mut self) -> Option<SpawnOrder> {
        let params = self.aim.launch_parameters()?;
        self.launch(&params)
    }

    /// Mirror one body's state from the physics world. Returns false for
    /// unknown ids.
    pub fn sync_body(
        &mut self,
        id: BodyId,
        position: Vec3,
        velocity: Vec3,
        angular_velocity: Vec3,
    ) -> bool {
        let Some(body) = self.state.arena.get_mut(id) else {
            return false;
        };
        body.position = position;
        body.velocity = velocity;
        body.angular_velocity = angular_velocity;
        true
    }

    /// Velocity after this tick's adhesion forces, to write back to physics.
    pub fn body_velocity(&self, id: BodyId) -> Option<Vec3> {
        self.state.arena.get(id).map(|b| b.velocity)
    }

    pub fn handle_collision(&mut self, event: CollisionEvent) {
        let participants = [Some(event.body), event.other];
        for id in participants.into_iter().flatten() {
            if let Some(body) = self.state.arena.get_mut(id)
                && body.is_flying()
            {
                body.state = StackState::Landing;
                tracing::debug!(body = %id, "Piece touched down");
            }
        }

        if let Some(other) = event.other
            && let Some((lower, upper)) = self.state.adhesion.on_collision(
                &self.state.arena,
                event.body,
                other,
                event.normal,
                self.state.clock,
            )
        {
            self.pending.push(GameEvent::AdhesionFormed { lower, upper });
        }
    }

    /// Advance the session by `dt` seconds.
    pub fn update(&mut self, dt: f32) -> Vec<GameEvent> {
        let mut events = std::mem::take(&mut self.pending);
        if self.state.round_complete {
            return events;
        }
        self.state.clock += f64::from(dt);

        self.promote_slow_flyers();

        for broken in self
            .state
            .adhesion
            .update(&mut self.state.arena, self.state.clock, dt)
        {
            events.push(GameEvent::AdhesionBroken {
                lower: broken.lower,
                upper: broken.upper,
                reason: broken.reason,
            });
        }

        self.stacking.update(&mut self.state.arena);

        if let Some(id) = self.fall_policy.find_fallen(&self.state.arena) {
            tracing::info!(body = %id, policy = ?self.fall_policy.kind(), "Piece fell");
            self.state.fallen = Some(id);
            events.push(GameEvent::PieceFell { body: id });
            self.finish_round(&mut events);
            return events;
        }

        if self.turn_settled(dt) {
            self.state.turn_started_at = None;
            self.state.rest_time = 0.0;
            events.push(GameEvent::TurnSettled {
                pieces: self.state.arena.len(),
            });

            let last_kind = self.state.arena.iter().last().map(|b| b.kind);
            if last_kind == Some(MochiKind::Mikan) {
                self.state.special_top = mikan_crowns_stack(&self.state.arena);
            }

            let round_over = match self.state.mode {
                GameMode::Normal => self.state.next_kind.is_none(),
                GameMode::Endless => self.state.finishing,
            };
            if round_over {
                self.finish_round(&mut events);
            } else {
                events.push(GameEvent::ScoreUpdate(self.score()));
            }
        }

        events
    }

    /// Flying bodies that have slowed to a crawl without reporting a contact.
    fn promote_slow_flyers(&mut self) {
        let cfg = &self.config.session;
        let clock = self.state.clock;
        for body in self.state.arena.iter_mut() {
            if body.is_flying()
                && clock - body.created_at >= cfg.min_flight_time
                && body.speed() < cfg.settle_speed
            {
                body.state = StackState::Landing;
                tracing::debug!(body = %body.id, "Piece came to rest in flight");
            }
        }
    }

    fn turn_settled(&mut self, dt: f32) -> bool {
        let Some(started) = self.state.turn_started_at else {
            return false;
        };
        let cfg = &self.config.session;
        let at_rest = self
            .state
            .arena
            .iter()
            .all(|b| !b.is_flying() && b.speed() < cfg.settle_speed);
        if at_rest {
            self.state.rest_time += f64::from(dt);
        } else {
            self.state.rest_time = 0.0;
        }
        self.state.rest_time >= cfg.settle_duration
            || self.state.clock - started >= cfg.max_turn_duration
    }

    fn finish_round(&mut self, events: &mut Vec<GameEvent>) {
        self.state.round_complete = true;
        self.state.turn_started_at = None;
        let score = self.score();
        tracing::info!(
            mode = self.state.mode.label(),
            total = score.total,
            perfect = score.is_perfect,
            fallen = self.state.fallen.is_some(),
            "Round complete"
        );
        events.push(GameEvent::ScoreUpdate(score));
        events.push(GameEvent::RoundComplete);
    }

    pub fn score(&self) -> ScoreResult {
        self.scoring
            .calculate(&self.state.arena, self.state.special_top)
    }

    pub fn current_height(&self) -> f32 {
        self.scoring.current_height(&self.state.arena)
    }

    /// Persist a finished classic round. Endless runs and unfinished rounds
    /// are not recorded.
    pub fn record_progress<B: StorageBackend>(
        &self,
        store: &mut ProgressStore<B>,
    ) -> Option<ScoreRecord> {
        if self.state.mode.is_endless() || !self.state.round_complete {
            return None;
        }
        let score = self.score();
        Some(store.record_normal_score(score.total.round() as u32, score.is_perfect))
    }

    /// Stop tracking a body and drop its connections.
    pub fn remove_body(&mut self, id: BodyId) -> Option<TrackedBody> {
        let dropped = self.state.adhesion.remove_body(id);
        let removed = self.state.arena.remove(id);
        if removed.is_some() {
            tracing::debug!(body = %id, connections = dropped, "Body removed");
        }
        removed
    }

    /// Release every body and connection. The session cannot be played
    /// further until a snapshot is applied.
    pub fn dispose(&mut self) {
        self.state.adhesion.dispose();
        self.state.arena.clear();
        self.state.turn_started_at = None;
        self.state.round_complete = true;
        self.pending.clear();
    }

    pub fn serialize_state(&self) -> Vec<u8> {
        rmp_serde::to_vec(&self.state).unwrap_or_default()
    }

    /// Replace the session state with a snapshot. Malformed input is ignored.
    pub fn apply_state(&mut self, state: &[u8]) {
        let Ok(s) = rmp_serde::from_slice::<MochiState>(state) else {
            tracing::warn!(len = state.len(), "Ignoring malformed session snapshot");
            return;
        };
        if s.mode != self.state.mode {
            self.fall_policy = fall_policy_for(s.mode, &self.config);
            self.scoring = ScoreSystem::for_mode(s.mode, self.config.scoring.clone());
        }
        self.state = s;
        self.pending.clear();
    }
}

impl Default for MochiGame {
    fn default() -> Self {
        Self::new(GameMode::Normal, MochiConfig::default())
    }
}

fn fall_policy_for(mode: GameMode, config: &MochiConfig) -> FallPolicy {
    let kind = match mode {
        GameMode::Normal => config.fall.normal_policy,
        GameMode::Endless => config.fall.endless_policy,
    };
    FallPolicy::new(kind, config.fall.clone(), config.scoring.target)
}

/// Whether the last mikan rests on the highest of the other bodies.
fn mikan_crowns_stack(arena: &BodyArena) -> bool {
    let Some(mikan) = arena.iter().filter(|b| b.kind == MochiKind::Mikan).last() else {
        return false;
    };
    let Some(support) = mikan.stacked_on() else {
        return false;
    };
    arena
        .iter()
        .filter(|b| b.id != mikan.id)
        .max_by(|a, b| a.top_y().total_cmp(&b.top_y()))
        .is_some_and(|top| top.id == support)
}
