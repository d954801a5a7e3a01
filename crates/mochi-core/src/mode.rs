use serde::{Deserialize, Serialize};

/// Session mode, chosen by the caller before a game starts.
///
/// `Normal` is the fixed three-piece classic round scored out of 100;
/// `Endless` keeps stacking until something falls and scores by height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Normal,
    Endless,
}

impl GameMode {
    pub fn is_endless(self) -> bool {
        matches!(self, GameMode::Endless)
    }

    pub fn label(self) -> &'static str {
        match self {
            GameMode::Normal => "normal",
            GameMode::Endless => "endless",
        }
    }
}
