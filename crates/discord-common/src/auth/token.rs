//! Authentication token
//!
//! Wraps the raw token so it never shows up in `Debug` output or logs.

use std::fmt;

/// Kind of account the token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenKind {
    /// Bot account, sent as `Bot <token>`
    #[default]
    Bot,
    /// OAuth2 bearer / user token, sent as `Bearer <token>`
    Bearer,
}

impl TokenKind {
    /// Authorization scheme prefix
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Bot => "Bot",
            Self::Bearer => "Bearer",
        }
    }
}

/// Discord authentication token
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    secret: String,
    kind: TokenKind,
}

impl Token {
    /// Create a token of the given kind
    ///
    /// A scheme prefix already present in `secret` ("Bot ", "Bearer ") is stripped.
    #[must_use]
    pub fn new(secret: impl Into<String>, kind: TokenKind) -> Self {
        let secret = secret.into();
        let trimmed = secret.trim();
        let bare = trimmed
            .strip_prefix("Bot ")
            .or_else(|| trimmed.strip_prefix("Bearer "))
            .unwrap_or(trimmed)
            .trim()
            .to_string();

        Self { secret: bare, kind }
    }

    /// Create a bot token
    #[must_use]
    pub fn bot(secret: impl Into<String>) -> Self {
        Self::new(secret, TokenKind::Bot)
    }

    /// Create a bearer token
    #[must_use]
    pub fn bearer(secret: impl Into<String>) -> Self {
        Self::new(secret, TokenKind::Bearer)
    }

    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.kind == TokenKind::Bot
    }

    /// The bare token as sent in Identify and Resume payloads
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.secret
    }

    /// Value for the HTTP `Authorization` header
    #[must_use]
    pub fn auth_header(&self) -> String {
        format!("{} {}", self.kind.scheme(), self.secret)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("kind", &self.kind)
            .field("secret", &"<redacted>")
            .finish()
    }
}
