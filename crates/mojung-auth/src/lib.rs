/// Mojung Auth Library
///
/// Stateless sessions: an access/refresh pair of HS256 tokens carried in
/// cookies. Nothing is stored server-side; validity is signature + expiry.
/// Passwords are stored as Argon2id PHC strings.

pub mod password;
pub mod session;
pub mod token;

pub use session::{Renewal, SessionConfig, SessionManager, SessionState, TokenPair};
pub use token::{Claims, IssuedToken, TokenCodec, TokenError, TokenKind};
