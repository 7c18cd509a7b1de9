use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{error, warn};
use uuid::Uuid;

use mojung_types::error::{BoardError, BoardResult, IntegrityError, ValidationError};
use mojung_types::models::{MessagePost, Post, PostIndexEntry, PostKind, VoteOption};

use crate::models::{IndexRow, MessageRow, VoteOptionRow, VoteRow, format_ts};
use crate::{Database, StorageResultExt};

pub fn validate_message<'a>(
    recipient: &'a str,
    content: &'a str,
) -> Result<(&'a str, &'a str), ValidationError> {
    Ok((
        ValidationError::require("recipient", recipient)?,
        ValidationError::require("content", content)?,
    ))
}

/// A poll needs a title and at least one option; option ids must be
/// non-empty and unique within the poll, and every option needs content.
pub fn validate_vote(title: &str, options: &[VoteOption]) -> Result<Vec<VoteOption>, ValidationError> {
    ValidationError::require("title", title)?;
    if options.is_empty() {
        return Err(ValidationError::EmptyField("options"));
    }

    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(options.len());
    for option in options {
        let option_id = ValidationError::require("optionId", &option.option_id)?;
        let content = ValidationError::require("option content", &option.content)?;
        if !seen.insert(option_id) {
            return Err(ValidationError::DuplicateOption(option_id.to_string()));
        }
        cleaned.push(VoteOption {
            option_id: option_id.to_string(),
            content: content.to_string(),
        });
    }
    Ok(cleaned)
}

impl Database {
    // -- Writes --

    pub fn create_message(
        &self,
        generator_id: Uuid,
        recipient: &str,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> BoardResult<Uuid> {
        let (recipient, content) = validate_message(recipient, content)?;
        self.insert_message(Uuid::new_v4(), generator_id, recipient, content, created_at)
    }

    pub fn create_vote(
        &self,
        generator_id: Uuid,
        title: &str,
        options: &[VoteOption],
        created_at: DateTime<Utc>,
    ) -> BoardResult<Uuid> {
        let options = validate_vote(title, options)?;
        let post_id = Uuid::new_v4();
        let title = title.trim();

        self.write_indexed(post_id, PostKind::Vote, created_at, |conn| {
            conn.execute(
                "INSERT INTO votes (id, generator_id, title, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    post_id.to_string(),
                    generator_id.to_string(),
                    title,
                    format_ts(created_at)
                ],
            )?;
            let mut stmt = conn.prepare(
                "INSERT INTO vote_options (vote_id, option_id, position, content) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, option) in options.iter().enumerate() {
                stmt.execute(rusqlite::params![
                    post_id.to_string(),
                    option.option_id,
                    position as i64,
                    option.content
                ])?;
            }
            Ok(())
        })
    }

    pub(crate) fn insert_message(
        &self,
        post_id: Uuid,
        generator_id: Uuid,
        recipient: &str,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> BoardResult<Uuid> {
        self.write_indexed(post_id, PostKind::Message, created_at, |conn| {
            conn.execute(
                "INSERT INTO messages (id, generator_id, recipient, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    post_id.to_string(),
                    generator_id.to_string(),
                    recipient,
                    content,
                    format_ts(created_at)
                ],
            )?;
            Ok(())
        })
    }

    /// Writes a post and its feed index entry in one transaction.
    ///
    /// A failed index insert rolls the post back and is reported as a storage
    /// failure. If the rollback itself fails the post may be left without an
    /// index entry, which is reported as `PartialWrite` so it is never
    /// mistaken for a clean failure.
    fn write_indexed<F>(
        &self,
        post_id: Uuid,
        kind: PostKind,
        created_at: DateTime<Utc>,
        insert_post: F,
    ) -> BoardResult<Uuid>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<()>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction().storage()?;
            insert_post(&*tx).storage()?;

            let indexed = tx.execute(
                "INSERT INTO post_index (post_id, kind, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![post_id.to_string(), kind.as_str(), format_ts(created_at)],
            );
            if let Err(e) = indexed {
                return match tx.rollback() {
                    Ok(()) => {
                        warn!("Index insert for {} failed, post rolled back: {}", post_id, e);
                        Err(BoardError::from(anyhow::Error::from(e)))
                    }
                    Err(rollback) => {
                        error!(
                            "Post {} may be stored without an index entry: insert failed ({}), rollback failed ({})",
                            post_id, e, rollback
                        );
                        Err(IntegrityError::PartialWrite { post_id }.into())
                    }
                };
            }

            tx.commit().storage()?;
            Ok(post_id)
        })
    }

    // -- Reads --

    pub fn get_post(&self, post_id: Uuid, kind: PostKind) -> BoardResult<Post> {
        self.find_post(post_id, kind)?.ok_or(BoardError::NotFound("post"))
    }

    pub fn find_post(&self, post_id: Uuid, kind: PostKind) -> Result<Option<Post>> {
        let id = post_id.to_string();
        self.with_conn(|conn| match kind {
            PostKind::Message => {
                let Some(row) = query_message(conn, &id)? else {
                    return Ok(None);
                };
                Ok(Some(Post::Message(MessagePost::try_from(row)?)))
            }
            PostKind::Vote => {
                let Some(row) = query_vote(conn, &id)? else {
                    return Ok(None);
                };
                let options = query_vote_options(conn, &id)?;
                Ok(Some(Post::Vote(row.into_post(options)?)))
            }
        })
    }

    pub fn index_len(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM post_index", [], |r| r.get(0))?;
            Ok(n as u64)
        })
    }

    /// Newest first. Rows that cannot be decoded are logged and skipped.
    pub fn index_page(&self, offset: u64, limit: u64) -> Result<Vec<PostIndexEntry>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, post_id, kind, created_at FROM post_index
                 ORDER BY created_at DESC, seq DESC
                 LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![limit as i64, offset as i64], |row| {
                    Ok(IndexRow {
                        seq: row.get(0)?,
                        post_id: row.get(1)?,
                        kind: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok::<_, anyhow::Error>(rows)
        })?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match PostIndexEntry::try_from(row) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping corrupt feed index row: {}", e);
                    None
                }
            })
            .collect())
    }
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<MessageRow>> {
    let row = conn
        .query_row(
            "SELECT id, generator_id, recipient, content, created_at FROM messages WHERE id = ?1",
            [id],
            |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    generator_id: row.get(1)?,
                    recipient: row.get(2)?,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

fn query_vote(conn: &Connection, id: &str) -> Result<Option<VoteRow>> {
    let row = conn
        .query_row(
            "SELECT id, generator_id, title, created_at FROM votes WHERE id = ?1",
            [id],
            |row| {
                Ok(VoteRow {
                    id: row.get(0)?,
                    generator_id: row.get(1)?,
                    title: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub(crate) fn query_vote_options(conn: &Connection, vote_id: &str) -> Result<Vec<VoteOptionRow>> {
    let mut stmt = conn.prepare(
        "SELECT option_id, content FROM vote_options WHERE vote_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map([vote_id], |row| {
            Ok(VoteOptionRow {
                option_id: row.get(0)?,
                content: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
