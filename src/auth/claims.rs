use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of JWT issued by the service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
    #[serde(alias = "Confirm")]
    Confirm,
}

/// JWT payload used for authenticated API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,       // user ID
    pub iat: usize,      // issued at (unix timestamp)
    pub exp: usize,      // expires at (unix timestamp)
    pub iss: String,     // issuer
    pub aud: String,     // audience
    pub kind: TokenKind, // token type
}

/// JWT payload for email confirmation links. The subject is the address
/// being proven, not a user ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}
