//! Authentication

mod token;

pub use token::{Token, TokenKind};
