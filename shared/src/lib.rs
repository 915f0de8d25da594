//! Protocol vocabulary shared by the MUD server and the line client.
//!
//! Everything in here is pure: command parsing, player name validation and
//! the byte-to-line framing used on every connection. No sockets.

mod command;
mod line_buffer;

pub use command::{expand_direction, Command, ParseError, DIRECTIONS};
pub use line_buffer::LineBuffer;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 1234;
pub const MAX_LINE_LENGTH: usize = 512;
pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 20;
pub const MAX_HEALTH: u32 = 100;
pub const ATTACK_DAMAGE_MIN: u32 = 5;
pub const ATTACK_DAMAGE_MAX: u32 = 15;

pub const NAME_PROMPT: &str = "What is your name?";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("Names must be at least 2 letters long.")]
    TooShort,
    #[error("Names can be at most 20 letters long.")]
    TooLong,
    #[error("Names may only contain the letters A-Z.")]
    InvalidCharacters,
}

/// Validates a requested character name and returns it with the first
/// letter capitalised. Uniqueness is checked by the world, not here.
pub fn validate_name(raw: &str) -> Result<String, NameError> {
    let name = raw.trim();
    let len = name.chars().count();

    if len < MIN_NAME_LENGTH {
        return Err(NameError::TooShort);
    }
    if len > MAX_NAME_LENGTH {
        return Err(NameError::TooLong);
    }
    if !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(NameError::InvalidCharacters);
    }

    let mut chars = name.chars();
    Ok(match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    })
}

/// Joins display names as "a, b, c", or returns `empty` for no names.
pub fn join_or<S: AsRef<str>>(names: &[S], empty: &str) -> String {
    if names.is_empty() {
        return empty.to_string();
    }
    names
        .iter()
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}
