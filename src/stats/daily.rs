use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{GameId, GameRegistry, SessionRecord};

/// Minutes played per game on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub minutes: BTreeMap<GameId, u64>,
}

impl DailyTotals {
    pub fn total(&self) -> u64 {
        self.minutes.values().fold(0, |acc, minutes| acc.saturating_add(*minutes))
    }
}

/// Buckets sessions by date, then game, summing minutes. Dates come out ascending and
/// every registered game is present in every bucket. Undated sessions are skipped.
pub fn group_by_date_and_game(
    sessions: &[SessionRecord],
    registry: &GameRegistry,
) -> Vec<DailyTotals> {
    let mut by_date: BTreeMap<NaiveDate, BTreeMap<GameId, u64>> = BTreeMap::new();

    for session in sessions {
        let Some(date) = session.date else {
            continue;
        };
        let bucket = by_date.entry(date).or_insert_with(|| {
            registry.iter().map(|game| (game.clone(), 0)).collect()
        });
        let total = bucket.entry(session.game.clone()).or_insert(0);
        *total = total.saturating_add(session.minutes());
    }

    by_date
        .into_iter()
        .map(|(date, minutes)| DailyTotals { date, minutes })
        .collect()
}

/// Total minutes recorded for `game` on `date`. Sums saturate rather than wrap.
pub fn minutes_for_game_on(sessions: &[SessionRecord], game: &GameId, date: NaiveDate) -> u64 {
    sessions
        .iter()
        .filter(|session| session.game == *game && session.date == Some(date))
        .map(SessionRecord::minutes)
        .fold(0, u64::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionMetadata;

    fn session(game: &str, date: Option<&str>, minutes: Option<u64>) -> SessionRecord {
        SessionRecord {
            id: format!("{game}-{date:?}-{minutes:?}"),
            game: GameId::new(game),
            date: date.map(|d| d.parse().unwrap()),
            start_time: None,
            end_time: None,
            duration_minutes: minutes,
            metadata: SessionMetadata::None,
        }
    }

    fn day(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[test]
    fn empty_input_has_no_buckets() {
        assert!(group_by_date_and_game(&[], &GameRegistry::default()).is_empty());
    }

    #[test]
    fn buckets_are_sorted_and_zero_filled() {
        let sessions = vec![
            session("valorant", Some("2024-01-03"), Some(20)),
            session("kovaaks", Some("2024-01-01"), Some(15)),
            session("valorant", Some("2024-01-01"), Some(30)),
            session("kovaaks", Some("2024-01-01"), Some(10)),
        ];

        let days = group_by_date_and_game(&sessions, &GameRegistry::default());

        let dates: Vec<NaiveDate> = days.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![day("2024-01-01"), day("2024-01-03")]);
        assert_eq!(days[0].minutes[&GameId::valorant()], 30);
        assert_eq!(days[0].minutes[&GameId::kovaaks()], 25);
        assert_eq!(days[1].minutes[&GameId::valorant()], 20);
        assert_eq!(days[1].minutes[&GameId::kovaaks()], 0);
    }

    #[test]
    fn bucket_totals_match_sessions_on_that_date() {
        let sessions = vec![
            session("valorant", Some("2024-02-01"), Some(12)),
            session("osu", Some("2024-02-01"), Some(8)),
            session("kovaaks", Some("2024-02-01"), None),
            session("kovaaks", Some("2024-02-02"), Some(5)),
            session("valorant", None, Some(99)),
        ];

        let days = group_by_date_and_game(&sessions, &GameRegistry::default());

        for bucket in &days {
            let expected: u64 = sessions
                .iter()
                .filter(|s| s.date == Some(bucket.date))
                .map(SessionRecord::minutes)
                .sum();
            assert_eq!(bucket.total(), expected);
        }
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].minutes[&GameId::new("osu")], 8);
    }

    #[test]
    fn serializes_as_date_and_minutes() {
        let days = group_by_date_and_game(
            &[session("valorant", Some("2024-01-01"), Some(30))],
            &GameRegistry::default(),
        );
        let value = serde_json::to_value(&days).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"date": "2024-01-01", "minutes": {"kovaaks": 0, "valorant": 30}}])
        );
    }

    #[test]
    fn huge_durations_saturate() {
        let sessions = vec![
            session("valorant", Some("2024-01-01"), Some(u64::MAX - 1)),
            session("valorant", Some("2024-01-01"), Some(10)),
            session("kovaaks", Some("2024-01-01"), Some(10)),
        ];

        let days = group_by_date_and_game(&sessions, &GameRegistry::default());
        assert_eq!(days[0].minutes[&GameId::valorant()], u64::MAX);
        assert_eq!(days[0].total(), u64::MAX);
        assert_eq!(
            minutes_for_game_on(&sessions, &GameId::valorant(), day("2024-01-01")),
            u64::MAX
        );
    }

    #[test]
    fn counts_one_game_on_one_day() {
        let sessions = vec![
            session("kovaaks", Some("2024-01-01"), Some(25)),
            session("kovaaks", Some("2024-01-01"), Some(20)),
            session("kovaaks", Some("2024-01-02"), Some(60)),
            session("valorant", Some("2024-01-01"), Some(60)),
        ];
        assert_eq!(
            minutes_for_game_on(&sessions, &GameId::kovaaks(), day("2024-01-01")),
            45
        );
        assert_eq!(
            minutes_for_game_on(&sessions, &GameId::kovaaks(), day("2024-01-05")),
            0
        );
    }
}
