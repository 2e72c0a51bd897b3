use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_optional_date, parse_optional_timestamp, to_i64, to_u64},
};
use crate::models::{format_date, GameId, SessionMetadata, SessionRecord};

fn row_to_session(row: &Row) -> Result<SessionRecord> {
    let game = GameId::new(row.get::<_, String>("game")?);
    let start_time = parse_optional_timestamp(row.get("start_time")?, "start_time");
    let end_time = parse_optional_timestamp(row.get("end_time")?, "end_time");
    let date = parse_optional_date(row.get("date")?, start_time);
    let duration_minutes = row
        .get::<_, Option<i64>>("duration_minutes")?
        .map(|minutes| to_u64(minutes, "duration_minutes"))
        .transpose()?;
    let metadata: Option<String> = row.get("metadata")?;

    Ok(SessionRecord {
        id: row.get("id")?,
        metadata: SessionMetadata::from_stored(&game, metadata.as_deref()),
        game,
        date,
        start_time,
        end_time,
        duration_minutes,
    })
}

impl Database {
    /// Replaces the whole stored collection with `sessions`, keeping their order.
    /// Ids must be unique; a duplicate aborts the whole replacement.
    pub async fn replace_sessions(&self, sessions: &[SessionRecord]) -> Result<()> {
        let records = sessions.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM sessions", [])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO sessions (id, game, date, start_time, end_time, duration_minutes, metadata, position)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for (position, record) in records.iter().enumerate() {
                    stmt.execute(params![
                        record.id,
                        record.game.as_str(),
                        record.date.map(format_date),
                        record.start_time.as_ref().map(|dt| dt.to_rfc3339()),
                        record.end_time.as_ref().map(|dt| dt.to_rfc3339()),
                        record.duration_minutes.map(to_i64).transpose()?,
                        record.metadata.to_stored(),
                        to_i64(position as u64)?,
                    ])
                    .with_context(|| format!("failed to insert session {}", record.id))?;
                }
            }
            tx.commit().context("failed to commit session replacement")?;
            Ok(())
        })
        .await
    }

    pub async fn load_sessions(&self) -> Result<Vec<SessionRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, game, date, start_time, end_time, duration_minutes, metadata
                 FROM sessions
                 ORDER BY position ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }
}
