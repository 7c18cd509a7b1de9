use thiserror::Error;
use uuid::Uuid;

/// Session and login failures. All of these are user-facing; the client
/// either re-authenticates or, for `AccessExpired`, calls the refresh route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("login required")]
    MissingCredentials,
    #[error("session credentials are invalid, please log in again")]
    InvalidToken,
    #[error("access token expired, refresh to continue")]
    AccessExpired,
    #[error("session expired, please log in again")]
    SessionExpired,
    // Unknown user and wrong password share one message so that login
    // responses do not reveal which ids exist.
    #[error("invalid id or password")]
    BadPassword,
    #[error("invalid id or password")]
    NotFound,
}

impl AuthError {
    /// Terminal errors force a logout on the client; retrying is pointless.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::InvalidToken)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("duplicate option id '{0}'")]
    DuplicateOption(String),
    #[error("option is not part of this poll")]
    InvalidOption,
    #[error("page numbers start at 1")]
    InvalidPage,
    #[error("malformed request: {0}")]
    MalformedBody(String),
}

impl ValidationError {
    /// Returns the trimmed value, or `EmptyField` when nothing is left.
    pub fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Self::EmptyField(field));
        }
        Ok(trimmed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("you have already voted on this poll")]
    AlreadyVoted,
    #[error("this id is already taken")]
    UserIdTaken,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("feed entry references missing post {post_id}")]
    DanglingReference { post_id: Uuid },
    #[error("post {post_id} was stored but could not be indexed")]
    PartialWrite { post_id: Uuid },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<anyhow::Error> for BoardError {
    fn from(e: anyhow::Error) -> Self {
        Self::Storage(StorageError::Unavailable(e))
    }
}

pub type BoardResult<T> = Result<T, BoardError>;
