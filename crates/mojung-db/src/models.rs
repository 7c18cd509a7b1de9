//! Row types mapping one-to-one onto SQLite rows, plus their conversion
//! into the domain models of mojung-types.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use mojung_types::models::{
    Account, AccountStatus, MessagePost, PostIndexEntry, PostKind, VoteOption, VotePost,
};

pub struct UserRow {
    pub id: String,
    pub user_id: String,
    pub display_name: String,
    pub password: String,
    pub status: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub generator_id: String,
    pub recipient: String,
    pub content: String,
    pub created_at: String,
}

pub struct VoteRow {
    pub id: String,
    pub generator_id: String,
    pub title: String,
    pub created_at: String,
}

pub struct VoteOptionRow {
    pub option_id: String,
    pub content: String,
}

pub struct IndexRow {
    pub seq: i64,
    pub post_id: String,
    pub kind: String,
    pub created_at: String,
}

/// Timestamps are stored with fixed microsecond precision and a `Z` suffix
/// so that string order matches chronological order.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("corrupt timestamp '{}'", raw))?
        .with_timezone(&Utc))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt id '{}'", raw))
}

impl TryFrom<UserRow> for Account {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Account {
            id: parse_id(&row.id)?,
            status: AccountStatus::parse(&row.status)
                .with_context(|| format!("unknown status '{}' on user {}", row.status, row.id))?,
            created_at: parse_ts(&row.created_at)?,
            user_id: row.user_id,
            display_name: row.display_name,
            credential_hash: row.password,
        })
    }
}

impl TryFrom<MessageRow> for MessagePost {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(MessagePost {
            id: parse_id(&row.id)?,
            generator_id: parse_id(&row.generator_id)?,
            created_at: parse_ts(&row.created_at)?,
            recipient: row.recipient,
            content: row.content,
        })
    }
}

impl VoteRow {
    pub fn into_post(self, options: Vec<VoteOptionRow>) -> Result<VotePost> {
        Ok(VotePost {
            id: parse_id(&self.id)?,
            generator_id: parse_id(&self.generator_id)?,
            created_at: parse_ts(&self.created_at)?,
            title: self.title,
            options: options
                .into_iter()
                .map(|o| VoteOption {
                    option_id: o.option_id,
                    content: o.content,
                })
                .collect(),
        })
    }
}

impl TryFrom<IndexRow> for PostIndexEntry {
    type Error = anyhow::Error;

    fn try_from(row: IndexRow) -> Result<Self> {
        Ok(PostIndexEntry {
            seq: row.seq,
            post_id: parse_id(&row.post_id)?,
            kind: PostKind::parse(&row.kind)
                .with_context(|| format!("unknown post kind '{}' at seq {}", row.kind, row.seq))?,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}
