use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{OptionCount, VoteOption};

// -- Envelope --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Fail,
}

/// Every route answers with this shape. `code` is a stable identifier for
/// failures so clients never have to match on `message` text.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub result: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            result: Outcome::Success,
            data: Some(data),
            message: None,
            code: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl Envelope<()> {
    pub fn fail(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            result: Outcome::Fail,
            data: None,
            message: Some(message.into()),
            code: Some(code.into()),
        }
    }

    pub fn done(message: impl Into<String>) -> Self {
        Self {
            result: Outcome::Success,
            data: None,
            message: Some(message.into()),
            code: None,
        }
    }
}

// -- Users / auth --

// Request bodies default missing fields to empty values, so an absent field
// is reported the same way as a blank one.

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_id: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct CheckIdRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckIdResponse {
    pub available: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id: Uuid,
    pub name: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: Uuid,
    pub name: String,
}

// -- Posts --

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub recipient: String,
    pub content: String,
}

/// An option as submitted by a client. Without an explicit id the option is
/// numbered by its 1-based position.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct VoteOptionInput {
    pub option_id: Option<String>,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateVoteRequest {
    pub title: String,
    #[serde(alias = "option")]
    pub options: Vec<VoteOptionInput>,
}

impl CreateVoteRequest {
    pub fn into_options(self) -> (String, Vec<VoteOption>) {
        let options = self
            .options
            .into_iter()
            .enumerate()
            .map(|(i, o)| VoteOption {
                option_id: o.option_id.unwrap_or_else(|| (i + 1).to_string()),
                content: o.content,
            })
            .collect();
        (self.title, options)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotResponse {
    pub vote_id: Uuid,
    pub option_id: String,
}

// -- Feed --

#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub generator_id: Uuid,
    pub recipient: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// `option_counts` is aligned positionally with `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteView {
    pub id: Uuid,
    pub generator_id: Uuid,
    pub title: String,
    pub options: Vec<VoteOption>,
    pub option_counts: Vec<OptionCount>,
    pub total_ballots: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One hydrated feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "UPPERCASE")]
pub enum PostView {
    Message(MessageView),
    Vote(VoteView),
}
