use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use mojung_types::error::{BoardError, BoardResult, ConflictError, ValidationError};
use mojung_types::models::{OptionCount, Tally};

use crate::models::format_ts;
use crate::posts::query_vote_options;
use crate::{Database, StorageResultExt};

impl Database {
    /// Records one ballot. The `(voter_id, vote_id)` primary key decides
    /// whether the voter already has a ballot; the insert is conditional, so
    /// two racing requests cannot both succeed.
    pub fn cast_ballot(
        &self,
        voter_id: Uuid,
        vote_id: Uuid,
        option_id: &str,
        cast_at: DateTime<Utc>,
    ) -> BoardResult<()> {
        let vote_key = vote_id.to_string();
        self.with_conn_mut(|conn| {
            let exists = conn
                .query_row("SELECT 1 FROM votes WHERE id = ?1", [&vote_key], |_| Ok(()))
                .optional()
                .storage()?
                .is_some();
            if !exists {
                return Err(BoardError::NotFound("poll"));
            }

            let declared = query_vote_options(conn, &vote_key)?;
            if !declared.iter().any(|o| o.option_id == option_id) {
                return Err(ValidationError::InvalidOption.into());
            }

            let inserted = conn
                .execute(
                    "INSERT INTO ballots (voter_id, vote_id, option_id, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (voter_id, vote_id) DO NOTHING",
                    rusqlite::params![voter_id.to_string(), vote_key, option_id, format_ts(cast_at)],
                )
                .storage()?;
            if inserted == 0 {
                return Err(ConflictError::AlreadyVoted.into());
            }
            Ok(())
        })
    }

    /// Counts per declared option, in declared order. Driven by the option
    /// list rather than the ballots so that unpicked options report zero.
    pub fn tally(&self, vote_id: Uuid) -> Result<Tally> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT o.option_id, COUNT(b.voter_id)
                 FROM vote_options o
                 LEFT JOIN ballots b ON b.vote_id = o.vote_id AND b.option_id = o.option_id
                 WHERE o.vote_id = ?1
                 GROUP BY o.option_id, o.position
                 ORDER BY o.position",
            )?;
            let counts = stmt
                .query_map([vote_id.to_string()], |row| {
                    Ok(OptionCount {
                        option_id: row.get(0)?,
                        count: row.get::<_, i64>(1)? as u64,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(Tally { counts })
        })
    }

    pub fn ballot_of(&self, voter_id: Uuid, vote_id: Uuid) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let option = conn
                .query_row(
                    "SELECT option_id FROM ballots WHERE voter_id = ?1 AND vote_id = ?2",
                    [voter_id.to_string(), vote_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(option)
        })
    }
}
