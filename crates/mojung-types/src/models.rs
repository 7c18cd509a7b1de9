use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Users --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Disabled,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// A registered account. `user_id` is the login handle, `id` the stable
/// identifier that tokens and posts refer to.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub user_id: String,
    pub display_name: String,
    pub credential_hash: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

/// Who is making a request, as proven by a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
}

// -- Posts --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostKind {
    Message,
    Vote,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "MESSAGE",
            Self::Vote => "VOTE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MESSAGE" => Some(Self::Message),
            "VOTE" => Some(Self::Vote),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOption {
    pub option_id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePost {
    pub id: Uuid,
    pub generator_id: Uuid,
    pub recipient: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotePost {
    pub id: Uuid,
    pub generator_id: Uuid,
    pub title: String,
    pub options: Vec<VoteOption>,
    pub created_at: DateTime<Utc>,
}

/// Posts are immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Post {
    Message(MessagePost),
    Vote(VotePost),
}

/// One row of the unified feed index. `seq` is the insertion order and
/// breaks ties between posts created in the same instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostIndexEntry {
    pub seq: i64,
    pub post_id: Uuid,
    pub kind: PostKind,
    pub created_at: DateTime<Utc>,
}

// -- Ballots --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionCount {
    pub option_id: String,
    pub count: u64,
}

/// Per-option ballot counts for one poll, in the poll's declared option order.
/// Every declared option is present, including those nobody picked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub counts: Vec<OptionCount>,
}

impl Tally {
    pub fn get(&self, option_id: &str) -> Option<u64> {
        self.counts
            .iter()
            .find(|c| c.option_id == option_id)
            .map(|c| c.count)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| c.count).sum()
    }
}
