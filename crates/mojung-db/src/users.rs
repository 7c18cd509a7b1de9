use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension};
use uuid::Uuid;

use mojung_types::error::{BoardResult, ConflictError};
use mojung_types::models::{Account, AccountStatus};

use crate::models::{UserRow, format_ts};
use crate::{Database, StorageResultExt};

impl Database {
    /// Inserts an active user. The UNIQUE constraint on `user_id` is the
    /// authority on duplicates, not a prior lookup.
    pub fn create_user(
        &self,
        id: Uuid,
        user_id: &str,
        display_name: &str,
        password_hash: &str,
        created_at: DateTime<Utc>,
    ) -> BoardResult<()> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, user_id, display_name, password, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'active', ?5)",
                rusqlite::params![
                    id.to_string(),
                    user_id,
                    display_name,
                    password_hash,
                    format_ts(created_at)
                ],
            );
            match inserted {
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Err(ConflictError::UserIdTaken.into())
                }
                other => other.map(|_| ()).storage(),
            }
        })
    }

    /// Only active accounts can log in; disabled ones are reported as absent.
    pub fn find_active_user(&self, user_id: &str) -> Result<Option<Account>> {
        let row = self.with_conn(|conn| query_user(conn, user_id))?;
        match row {
            Some(row) if row.status == AccountStatus::Active.as_str() => Ok(Some(Account::try_from(row)?)),
            _ => Ok(None),
        }
    }

    pub fn user_id_exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.with_conn(|conn| query_user(conn, user_id))?.is_some())
    }

    pub fn set_user_status(&self, id: Uuid, status: AccountStatus) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET status = ?2 WHERE id = ?1",
                rusqlite::params![id.to_string(), status.as_str()],
            )?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, user_id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, display_name, password, status, created_at FROM users WHERE user_id = ?1",
    )?;

    let row = stmt
        .query_row([user_id], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                display_name: row.get(2)?,
                password: row.get(3)?,
                status: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}
