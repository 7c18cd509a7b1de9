use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, warn};

use mojung_types::error::{AuthError, BoardError, BoardResult};
use mojung_types::models::{Account, AccountStatus, Identity};

use crate::password::{verify_against_dummy, verify_password};
use crate::token::{Claims, IssuedToken, TokenCodec, TokenError, TokenKind};

/// Auth slice of the process configuration.
#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl SessionConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: Duration::hours(1),
            refresh_ttl: Duration::days(30),
        }
    }
}

/// A freshly minted access token and the end of the session it belongs to.
#[derive(Debug, Clone)]
pub struct Renewal {
    pub access: IssuedToken,
    pub session_end: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// What a request's cookies amount to. Re-derived on every call; there is
/// no server-side session object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoCredentials,
    AccessValid(Identity),
    AccessExpiredRefreshValid(Identity),
    /// The refresh token is expired, whatever the access token says.
    BothExpired,
    /// Forged, corrupt, swapped or mismatched tokens.
    Invalid,
}

impl SessionState {
    pub fn into_result(self) -> Result<Identity, AuthError> {
        match self {
            Self::AccessValid(identity) => Ok(identity),
            Self::NoCredentials => Err(AuthError::MissingCredentials),
            Self::AccessExpiredRefreshValid(_) => Err(AuthError::AccessExpired),
            Self::BothExpired => Err(AuthError::SessionExpired),
            Self::Invalid => Err(AuthError::InvalidToken),
        }
    }
}

#[derive(Clone)]
pub struct SessionManager {
    codec: TokenCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionManager {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            codec: TokenCodec::new(config.secret.as_bytes()),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// `account` is the lookup result for the submitted login handle.
    pub fn login(&self, account: Option<&Account>, password: &str) -> BoardResult<TokenPair> {
        self.login_at(account, password, Utc::now())
    }

    pub fn login_at(
        &self,
        account: Option<&Account>,
        password: &str,
        now: DateTime<Utc>,
    ) -> BoardResult<TokenPair> {
        let Some(account) = account.filter(|a| a.status == AccountStatus::Active) else {
            verify_against_dummy(password);
            return Err(AuthError::NotFound.into());
        };

        let matches = verify_password(password, &account.credential_hash).map_err(|e| {
            error!("Unreadable credential hash for user {}: {}", account.id, e);
            BoardError::from(e)
        })?;
        if !matches {
            debug!("Wrong password for user {}", account.id);
            return Err(AuthError::BadPassword.into());
        }

        let identity = Identity {
            id: account.id,
            name: account.display_name.clone(),
        };
        Ok(TokenPair {
            access: self.codec.issue_at(TokenKind::Access, &identity, self.access_ttl, now)?,
            refresh: self.codec.issue_at(TokenKind::Refresh, &identity, self.refresh_ttl, now)?,
        })
    }

    pub fn assess(&self, access: Option<&str>, refresh: Option<&str>) -> SessionState {
        self.assess_at(access, refresh, Utc::now())
    }

    /// The refresh token is judged first: once it has expired the session is
    /// over, and an access token is never accepted without a live refresh
    /// token bound to the same subject. A live refresh token without any
    /// access token counts as an expired access token.
    pub fn assess_at(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
        now: DateTime<Utc>,
    ) -> SessionState {
        let Some(refresh) = refresh else {
            return SessionState::NoCredentials;
        };

        let refresh = match self.verify_kind(refresh, TokenKind::Refresh, now) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => return SessionState::BothExpired,
            Err(e) => {
                warn!("Rejected refresh token: {}", e);
                return SessionState::Invalid;
            }
        };

        let Some(access) = access else {
            return SessionState::AccessExpiredRefreshValid(refresh.identity());
        };
        let access = match self.codec.decode(access) {
            Ok(claims) if claims.kind == TokenKind::Access => claims,
            Ok(_) => return SessionState::Invalid,
            Err(e) => {
                warn!("Rejected access token: {}", e);
                return SessionState::Invalid;
            }
        };
        if access.sub != refresh.sub {
            warn!("Access token for {} presented with refresh token for {}", access.sub, refresh.sub);
            return SessionState::Invalid;
        }

        if access.is_expired_at(now) {
            SessionState::AccessExpiredRefreshValid(refresh.identity())
        } else {
            SessionState::AccessValid(access.identity())
        }
    }

    pub fn validate(&self, access: Option<&str>, refresh: Option<&str>) -> Result<Identity, AuthError> {
        self.assess(access, refresh).into_result()
    }

    pub fn validate_at(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Identity, AuthError> {
        self.assess_at(access, refresh, now).into_result()
    }

    pub fn refresh(&self, refresh: Option<&str>) -> BoardResult<Renewal> {
        self.refresh_at(refresh, Utc::now())
    }

    /// Mints a new access token from a live refresh token. The refresh token
    /// itself is never renewed, and the new access token never outlives it.
    pub fn refresh_at(&self, refresh: Option<&str>, now: DateTime<Utc>) -> BoardResult<Renewal> {
        let refresh = refresh.ok_or(AuthError::MissingCredentials)?;
        let claims = match self.verify_kind(refresh, TokenKind::Refresh, now) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => return Err(AuthError::SessionExpired.into()),
            Err(_) => return Err(AuthError::InvalidToken.into()),
        };

        let session_end = claims.expires_at();
        let ttl = self.access_ttl.min(session_end - now);
        Ok(Renewal {
            access: self
                .codec
                .issue_at(TokenKind::Access, &claims.identity(), ttl, now)?,
            session_end,
        })
    }

    /// Both tokens are dropped by the cookie layer; there is nothing to
    /// revoke server-side, so this always succeeds.
    pub fn logout(&self) -> SessionState {
        SessionState::NoCredentials
    }

    fn verify_kind(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = self.codec.verify_at(token, now)?;
        if claims.kind != kind {
            return Err(TokenError::Malformed);
        }
        Ok(claims)
    }
}
