use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{AimType, GameId, GameRegistry, MatchType, SessionMetadata, SessionRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_sessions: usize,
    pub total_time_minutes: u64,
    pub avg_session_minutes: f64,
    /// Every registered game, zero when unplayed.
    pub game_breakdown: BTreeMap<GameId, u64>,
    /// Summed match counts; only match types that were recorded.
    pub match_type_breakdown: BTreeMap<MatchType, u64>,
    /// Summed minutes per aim type; only aim types that were recorded.
    pub aim_type_breakdown: BTreeMap<AimType, u64>,
}

pub fn summarize(sessions: &[SessionRecord], registry: &GameRegistry) -> SessionStats {
    let mut game_breakdown: BTreeMap<GameId, u64> =
        registry.iter().map(|game| (game.clone(), 0)).collect();
    let mut match_type_breakdown = BTreeMap::new();
    let mut aim_type_breakdown = BTreeMap::new();
    let mut total_time_minutes = 0u64;

    for session in sessions {
        let minutes = session.minutes();
        total_time_minutes = total_time_minutes.saturating_add(minutes);

        if let Some(total) = game_breakdown.get_mut(&session.game) {
            *total = total.saturating_add(minutes);
        }

        match &session.metadata {
            SessionMetadata::Valorant(meta) => {
                for (kind, count) in &meta.match_types {
                    let total = match_type_breakdown.entry(*kind).or_insert(0u64);
                    *total = total.saturating_add(*count);
                }
            }
            SessionMetadata::Kovaaks(meta) => {
                let total = aim_type_breakdown.entry(meta.aim_type).or_insert(0u64);
                *total = total.saturating_add(minutes);
            }
            SessionMetadata::None => {}
        }
    }

    let total_sessions = sessions.len();
    let avg_session_minutes = if total_sessions == 0 {
        0.0
    } else {
        total_time_minutes as f64 / total_sessions as f64
    };

    SessionStats {
        total_sessions,
        total_time_minutes,
        avg_session_minutes,
        game_breakdown,
        match_type_breakdown,
        aim_type_breakdown,
    }
}
