//! Error types for the MUD server.
//!
//! `GameError` and `LoginError` are per-session and always end up as a text
//! line sent back to the player who caused them. `ServerError` and
//! `WorldError` are process-level: they abort startup or tear down a single
//! connection.

use crate::ids::RoomId;
use shared::{NameError, ParseError};
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Room,
    Player,
    Item,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Room => "room",
            EntityKind::Player => "player",
            EntityKind::Item => "item",
        })
    }
}

/// Failure of a single command. Never fatal to the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Unknown exit '{0}'")]
    InvalidDirection(String),

    #[error("There is no {kind} called '{name}' here.")]
    NotFound { kind: EntityKind, name: String },

    #[error("Unknown command '{0}'. Type 'help' for a list of commands.")]
    UnknownCommand(String),

    #[error("Usage: {usage}")]
    MissingArgument { usage: &'static str },

    #[error("{0}")]
    Refused(String),
}

impl GameError {
    pub fn not_found(kind: EntityKind, name: impl ToString) -> Self {
        GameError::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}

impl From<ParseError> for GameError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Empty => GameError::UnknownCommand(String::new()),
            ParseError::UnknownCommand(verb) => GameError::UnknownCommand(verb),
            ParseError::MissingArgument { usage } => GameError::MissingArgument { usage },
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error("That name is already taken.")]
    NameTaken,
}

/// Problems with the world data, detected while loading.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("failed to read world file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed world data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("world has no rooms")]
    Empty,

    #[error("room '{0}' is defined more than once")]
    DuplicateRoom(RoomId),

    #[error("start room '{0}' does not exist")]
    MissingStartRoom(RoomId),

    #[error("exit '{exit}' in room '{room}' leads to unknown room '{target}'")]
    DanglingExit {
        room: RoomId,
        exit: String,
        target: RoomId,
    },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    #[error(transparent)]
    World(#[from] WorldError),
}
