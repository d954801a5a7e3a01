use serde::{Deserialize, Serialize};

use mochi_core::mode::GameMode;

use crate::body::{BodyArena, BodyId, MochiKind, StackState, TrackedBody};
use crate::config::ScoringConfig;

/// Points for a base dead on target and resting on the pedestal.
pub const BASE_ON_TARGET_POINTS: f64 = 30.0;
/// Points for a piece resting on the piece below it.
pub const STACKED_POINTS: f64 = 35.0;
/// Points for any piece that landed close but not on its mark.
pub const NEAR_POINTS: f64 = 15.0;
/// Classic-mode ceiling.
pub const CLASSIC_MAX_SCORE: f64 = 100.0;

/// Base within this horizontal distance of the target can score full points.
const BASE_ON_TARGET_DISTANCE: f32 = 1.5;
const BASE_NEAR_DISTANCE: f32 = 3.0;
/// Vertical band (exclusive) the base's bottom must lie in to count as on the pedestal.
const PEDESTAL_BAND: (f32, f32) = (-2.0, 0.0);

/// Position fallback used when the physics link between two pieces is missing.
struct PlacementRule {
    on_distance: f32,
    height_window: f32,
    near_distance: f32,
}

const TOP_ON_BASE: PlacementRule = PlacementRule {
    on_distance: 1.2,
    height_window: 2.0,
    near_distance: 2.0,
};

const MIKAN_ON_TOP: PlacementRule = PlacementRule {
    on_distance: 0.8,
    height_window: 1.5,
    near_distance: 1.5,
};

/// Points awarded to one body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub body: BodyId,
    pub kind: MochiKind,
    pub points: f64,
    pub reason: String,
    pub height: f32,
}

/// Result of one scoring request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total: f64,
    pub breakdown: Vec<BreakdownEntry>,
    pub max_height: f32,
    pub stack_count: usize,
    pub is_perfect: bool,
    /// Human-readable total.
    pub display: String,
    /// Strength of score effects in [0, 1]; endless mode only.
    pub effect_intensity: Option<f64>,
}

/// Fixed three-piece round, scored on placement accuracy out of 100.
#[derive(Debug, Clone)]
pub struct ClassicScorer {
    config: ScoringConfig,
}

impl ClassicScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn calculate(&self, arena: &BodyArena) -> ScoreResult {
        let base = arena.first_of_kind(MochiKind::Base);
        let top = arena.first_of_kind(MochiKind::Top);
        let mikan = arena.first_of_kind(MochiKind::Mikan);

        let mut breakdown = Vec::new();
        if let Some(base) = base {
            let (points, reason) = self.score_base(base);
            breakdown.push(entry(base, points, reason));
        }
        if let Some(top) = top {
            let (points, reason) = score_on(top, base, &TOP_ON_BASE, "base");
            breakdown.push(entry(top, points, reason));
        }
        if let Some(mikan) = mikan {
            let (points, reason) = score_on(mikan, top, &MIKAN_ON_TOP, "top");
            breakdown.push(entry(mikan, points, reason));
        }

        let uncapped: f64 = breakdown.iter().map(|e| e.points).sum();
        let total = uncapped.min(CLASSIC_MAX_SCORE);
        ScoreResult {
            total,
            breakdown,
            max_height: arena
                .iter()
                .map(TrackedBody::top_y)
                .reduce(f32::max)
                .unwrap_or(0.0),
            stack_count: stack_count(arena),
            is_perfect: uncapped >= CLASSIC_MAX_SCORE,
            display: format_big_score(total),
            effect_intensity: None,
        }
    }

    fn score_base(&self, base: &TrackedBody) -> (f64, String) {
        let distance = base.position.distance_xz(self.config.target);
        let bottom = base.bottom_y();
        let on_pedestal = bottom > PEDESTAL_BAND.0 && bottom < PEDESTAL_BAND.1;
        if distance < BASE_ON_TARGET_DISTANCE && on_pedestal {
            (BASE_ON_TARGET_POINTS, "On target".to_string())
        } else if distance < BASE_NEAR_DISTANCE {
            (NEAR_POINTS, format!("Near target ({distance:.2} off)"))
        } else {
            (0.0, "Missed the pedestal".to_string())
        }
    }
}

/// Score `piece` against the piece it should rest on. The physics link wins;
/// positions are only consulted when it is absent.
fn score_on(
    piece: &TrackedBody,
    below: Option<&TrackedBody>,
    rule: &PlacementRule,
    below_label: &str,
) -> (f64, String) {
    let Some(below) = below else {
        return (0.0, format!("No {below_label} to rest on"));
    };
    if piece.stacked_on() == Some(below.id) {
        return (STACKED_POINTS, format!("Stacked on {below_label}"));
    }
    let distance = piece.position.distance_xz(below.position);
    let in_window =
        piece.height() >= below.height() && piece.height() <= below.height() + rule.height_window;
    if distance < rule.on_distance && in_window {
        (STACKED_POINTS, format!("Resting on {below_label}"))
    } else if distance < rule.near_distance {
        (NEAR_POINTS, format!("Near {below_label} ({distance:.2} off)"))
    } else {
        (0.0, format!("Missed {below_label}"))
    }
}

/// Open-ended height run with a super-linear height reward.
#[derive(Debug, Clone)]
pub struct EndlessScorer {
    config: ScoringConfig,
}

impl EndlessScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// `special_top` is set when the mikan crowned the stack.
    pub fn calculate(&self, arena: &BodyArena, special_top: bool) -> ScoreResult {
        let cfg = &self.config;
        let max_height = current_height(arena, cfg.pedestal_surface_y);
        let height_points = height_score(max_height, cfg);

        let mut breakdown = Vec::new();
        for body in arena.iter().filter(|b| b.state == StackState::Stacked) {
            let center = body
                .stacked_on()
                .and_then(|s| arena.get(s))
                .map_or(cfg.target, |s| s.position);
            let offset = body.position.distance_xz(center);
            let (points, reason) = if offset < cfg.centered_offset {
                (cfg.stack_bonus * cfg.centered_multiplier, "Centered stack")
            } else {
                (cfg.stack_bonus, "Stacked")
            };
            breakdown.push(entry(body, points, reason.to_string()));
        }
        let stack_bonus: f64 = breakdown.iter().map(|e| e.points).sum();

        let mut total = height_points + stack_bonus;
        if special_top {
            total *= cfg.special_top_multiplier;
        }

        ScoreResult {
            total,
            breakdown,
            max_height,
            stack_count: stack_count(arena),
            is_perfect: false,
            display: format_big_score(total),
            effect_intensity: Some(effect_intensity(
                total,
                cfg.intensity_min_score,
                cfg.intensity_max_score,
            )),
        }
    }
}

/// Scoring strategy for a session, selected by game mode.
#[derive(Debug, Clone)]
pub enum ScoreSystem {
    Classic(ClassicScorer),
    Endless(EndlessScorer),
}

impl ScoreSystem {
    pub fn for_mode(mode: GameMode, config: ScoringConfig) -> Self {
        match mode {
            GameMode::Normal => ScoreSystem::Classic(ClassicScorer::new(config)),
            GameMode::Endless => ScoreSystem::Endless(EndlessScorer::new(config)),
        }
    }

    /// `special_top` only affects endless mode.
    pub fn calculate(&self, arena: &BodyArena, special_top: bool) -> ScoreResult {
        match self {
            ScoreSystem::Classic(s) => s.calculate(arena),
            ScoreSystem::Endless(s) => s.calculate(arena, special_top),
        }
    }

    /// Height of the stack above the pedestal surface, usable mid-game.
    pub fn current_height(&self, arena: &BodyArena) -> f32 {
        let surface = match self {
            ScoreSystem::Classic(s) => s.config.pedestal_surface_y,
            ScoreSystem::Endless(s) => s.config.pedestal_surface_y,
        };
        current_height(arena, surface)
    }
}

/// Highest top surface above `surface_y`, floored at 0.
pub fn current_height(arena: &BodyArena, surface_y: f32) -> f32 {
    arena
        .iter()
        .map(|b| b.top_y() - surface_y)
        .fold(0.0, f32::max)
}

fn height_score(max_height: f32, cfg: &ScoringConfig) -> f64 {
    f64::from(max_height).powf(cfg.height_exponent) * cfg.height_multiplier
}

fn stack_count(arena: &BodyArena) -> usize {
    arena
        .iter()
        .filter(|b| b.state == StackState::Stacked)
        .count()
}

fn entry(body: &TrackedBody, points: f64, reason: String) -> BreakdownEntry {
    BreakdownEntry {
        body: body.id,
        kind: body.kind,
        points,
        reason,
        height: body.height(),
    }
}

/// Format a score for display: grouped digits below a million, then
/// `M`/`B` suffixes with two decimals, then exponential notation.
pub fn format_big_score(score: f64) -> String {
    let score = score.max(0.0);
    if score < 1e6 {
        group_thousands(score.floor() as u64)
    } else if score < 1e9 {
        format!("{:.2}M", score / 1e6)
    } else if score < 1e12 {
        format!("{:.2}B", score / 1e9)
    } else {
        let formatted = format!("{score:.2e}");
        match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        }
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Log-scale compression of a score into [0, 1] between `min` and `max`.
pub fn effect_intensity(score: f64, min: f64, max: f64) -> f64 {
    if score <= min {
        0.0
    } else if score >= max {
        1.0
    } else {
        (score.log10() - min.log10()) / (max.log10() - min.log10())
    }
}
