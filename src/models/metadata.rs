use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::game::{GameId, GameKind};

/// Match queue types tracked for the tactical shooter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    Deathmatch,
    Competitive,
    Unrated,
    SpikeRush,
}

impl MatchType {
    pub const ALL: [MatchType; 4] = [
        MatchType::Deathmatch,
        MatchType::Competitive,
        MatchType::Unrated,
        MatchType::SpikeRush,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Deathmatch => "deathmatch",
            MatchType::Competitive => "competitive",
            MatchType::Unrated => "unrated",
            MatchType::SpikeRush => "spike-rush",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == label)
    }
}

/// Training scenario families for the aim trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AimType {
    StaticClicking,
    DynamicClicking,
    Tracking,
    TargetSwitching,
}

impl AimType {
    pub const ALL: [AimType; 4] = [
        AimType::StaticClicking,
        AimType::DynamicClicking,
        AimType::Tracking,
        AimType::TargetSwitching,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AimType::StaticClicking => "static-clicking",
            AimType::DynamicClicking => "dynamic-clicking",
            AimType::Tracking => "tracking",
            AimType::TargetSwitching => "target-switching",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValorantMetadata {
    pub match_types: BTreeMap<MatchType, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KovaaksMetadata {
    pub aim_type: AimType,
}

/// Game-specific attributes of a session. Which variant applies is decided by the
/// session's game, so the wire form is an untagged object:
/// `{"matchTypes": {"competitive": 2}}`, `{"aimType": "tracking"}` or `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionMetadata {
    Valorant(ValorantMetadata),
    Kovaaks(KovaaksMetadata),
    #[default]
    None,
}

impl SessionMetadata {
    /// Reads the bag for `game` from a JSON value. Anything unusable degrades to
    /// [`SessionMetadata::None`]; unknown labels and invalid counts are dropped.
    pub fn from_value(game: &GameId, value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            if !value.is_null() {
                debug!("ignoring non-object metadata for {game}: {value}");
            }
            return SessionMetadata::None;
        };

        match game.kind() {
            GameKind::TacticalShooter => parse_match_types(object)
                .map(|match_types| SessionMetadata::Valorant(ValorantMetadata { match_types }))
                .unwrap_or_default(),
            GameKind::AimTrainer => object
                .get("aimType")
                .and_then(Value::as_str)
                .and_then(AimType::parse)
                .map(|aim_type| SessionMetadata::Kovaaks(KovaaksMetadata { aim_type }))
                .unwrap_or_default(),
            GameKind::Other => SessionMetadata::None,
        }
    }

    /// Same as [`from_value`](Self::from_value) for the persisted TEXT column.
    /// A missing or unparseable string yields [`SessionMetadata::None`].
    pub fn from_stored(game: &GameId, raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return SessionMetadata::None;
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(game, &value),
            Err(err) => {
                debug!("stored metadata for {game} is not JSON ({err}); using empty metadata");
                SessionMetadata::None
            }
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            SessionMetadata::Valorant(meta) => {
                let counts: Map<String, Value> = meta
                    .match_types
                    .iter()
                    .map(|(kind, count)| (kind.as_str().to_string(), json!(count)))
                    .collect();
                json!({ "matchTypes": counts })
            }
            SessionMetadata::Kovaaks(meta) => json!({ "aimType": meta.aim_type.as_str() }),
            SessionMetadata::None => json!({}),
        }
    }

    /// JSON text for the store, or `None` when there is nothing to keep.
    pub fn to_stored(&self) -> Option<String> {
        match self {
            SessionMetadata::None => None,
            other => Some(other.to_value().to_string()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, SessionMetadata::None)
    }
}

fn parse_match_types(object: &Map<String, Value>) -> Option<BTreeMap<MatchType, u64>> {
    let counts = object.get("matchTypes")?.as_object()?;
    let mut match_types: BTreeMap<MatchType, u64> = BTreeMap::new();
    for (label, count) in counts {
        let Some(kind) = MatchType::parse(label) else {
            debug!("dropping unknown match type '{label}'");
            continue;
        };
        match count_from_value(count) {
            Some(count) => {
                let total = match_types.entry(kind).or_insert(0);
                *total = total.saturating_add(count);
            }
            None => debug!("dropping invalid count for match type '{label}': {count}"),
        }
    }
    Some(match_types)
}

fn count_from_value(value: &Value) -> Option<u64> {
    if let Some(count) = value.as_u64() {
        return Some(count);
    }
    let count = value.as_f64()?;
    (count.is_finite() && count >= 0.0).then(|| count.round() as u64)
}
