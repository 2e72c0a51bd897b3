use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a tracked game, e.g. `valorant`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub const VALORANT: &'static str = "valorant";
    pub const KOVAAKS: &'static str = "kovaaks";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_ascii_lowercase())
    }

    pub fn valorant() -> Self {
        Self(Self::VALORANT.to_string())
    }

    pub fn kovaaks() -> Self {
        Self(Self::KOVAAKS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> GameKind {
        match self.0.as_str() {
            Self::VALORANT => GameKind::TacticalShooter,
            Self::KOVAAKS => GameKind::AimTrainer,
            _ => GameKind::Other,
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(value: &str) -> Self {
        GameId::new(value)
    }
}

/// Selects which metadata schema applies to a game's sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameKind {
    TacticalShooter,
    AimTrainer,
    Other,
}

/// The closed set of games the tracker knows about. Fixed-domain breakdowns are
/// zero-filled over exactly these ids, in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameRegistry {
    games: Vec<GameId>,
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self {
            games: vec![GameId::valorant(), GameId::kovaaks()],
        }
    }
}

impl GameRegistry {
    /// Builds a registry, dropping blanks and duplicates while keeping first-seen order.
    pub fn new(games: impl IntoIterator<Item = GameId>) -> Self {
        let mut unique: Vec<GameId> = Vec::new();
        for game in games {
            if !game.as_str().is_empty() && !unique.contains(&game) {
                unique.push(game);
            }
        }
        Self { games: unique }
    }

    pub fn contains(&self, game: &GameId) -> bool {
        self.games.contains(game)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameId> {
        self.games.iter()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}
